//! Reductions of the matched cubes to per-molecule summaries.

pub mod energy;
mod stats;
pub mod time;

pub use energy::{EnergyReport, MoleculeEnergies, HARTREE_TO_KCAL};
pub use stats::{nan_mean, nan_std};
pub use time::{FileTimes, MoleculeTimes, TimeReport};
