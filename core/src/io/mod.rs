//! Reading and writing of conformer record files.

pub mod sdf;
