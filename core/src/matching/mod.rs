//! Matching the conformers of query calculations to those of a reference
//! calculation, and arranging the matched results per molecule.

pub mod checkpoint;
pub mod cube;
mod matcher;
mod reconcile;

pub use cube::{reshape, Cube, EnergyCube, MissingCause, TimeCube};
pub use matcher::{MinimaMatcher, RMSD_THRESHOLD};
pub use reconcile::{CrossFileReconciler, RawReconciliation};

use serde::{Deserialize, Serialize};

/// What a reference conformer corresponds to in one query file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchSlot {
    /// index of the matching query conformer
    Matched(usize),
    /// the closest query conformer is beyond the acceptance threshold
    NoMatch,
    /// the query file has no molecule with this title
    Absent,
    /// the query file is the reference file
    Identity,
}

impl MatchSlot {
    pub fn matched(self) -> Option<usize> {
        match self {
            MatchSlot::Matched(index) => Some(index),
            _ => None,
        }
    }
}

/// One slot per reference conformer, in reference order.
pub type MatchResult = Vec<MatchSlot>;
