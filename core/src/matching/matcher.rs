use nalgebra::DMatrix;

use super::{MatchResult, MatchSlot};
use crate::{molecule::Molecule, rmsd::ConformerDistance};

/// Largest RMSD, in Å, at which two conformers are considered the same minimum.
pub const RMSD_THRESHOLD: f64 = 0.5;

/// Pairs every reference conformer with its closest query conformer.
///
/// The assignment is greedy per reference conformer, so two reference
/// conformers may be matched to the same query conformer.
#[derive(Clone, Debug)]
pub struct MinimaMatcher {
    pub threshold: f64,
}

impl Default for MinimaMatcher {
    fn default() -> Self {
        Self {
            threshold: RMSD_THRESHOLD,
        }
    }
}

impl MinimaMatcher {
    pub fn match_molecules(
        &self,
        reference: &Molecule,
        query: &Molecule,
        metric: &impl ConformerDistance,
    ) -> MatchResult {
        if reference.n_conformers() == 0 {
            return MatchResult::new();
        }
        let distances = metric.distance_matrix(reference, query);
        assert_eq!(
            distances.shape(),
            (reference.n_conformers(), query.n_conformers()),
            "distance matrix shape for {} does not match conformer counts",
            reference.title()
        );
        self.match_distances(reference.title(), &distances)
    }

    /// Apply the matching rule to a precomputed (reference x query) distance matrix.
    pub fn match_distances(&self, title: &str, distances: &DMatrix<f64>) -> MatchResult {
        distances
            .row_iter()
            .enumerate()
            .map(|(r, row)| {
                log::debug!(
                    "{title}: matching query conformers to reference minimum {}",
                    r + 1
                );

                // first index wins ties; NaN distances are never selected
                let closest = row
                    .iter()
                    .copied()
                    .enumerate()
                    .filter(|(_, distance)| !distance.is_nan())
                    .fold(None, |best: Option<(usize, f64)>, (q, distance)| match best {
                        Some((_, best_distance)) if best_distance <= distance => best,
                        _ => Some((q, distance)),
                    });

                match closest {
                    Some((q, distance)) if distance <= self.threshold => MatchSlot::Matched(q),
                    Some((_, distance)) => {
                        log::warn!(
                            "{title}: no match for reference conformer {r}, closest RMSD is {distance:.4} Å"
                        );
                        MatchSlot::NoMatch
                    }
                    None => {
                        log::warn!("{title}: no query conformers to match reference conformer {r}");
                        MatchSlot::NoMatch
                    }
                }
            })
            .collect()
    }
}
