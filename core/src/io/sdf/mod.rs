pub mod reader;
pub mod writer;

use crate::{atom::Atom, molecule::Bond, record::SdTags};

/// One connection-table record of an SD file, with its data tags.
#[derive(Clone, Debug)]
pub struct SdRecord {
    pub title: String,
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    pub tags: SdTags,
}
