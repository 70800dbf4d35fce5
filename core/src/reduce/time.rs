use itertools::izip;
use serde::Serialize;

use super::stats::{nan_mean, nan_std};
use crate::matching::TimeCube;

/// Runtime statistics of one file for one molecule, over its matched conformers.
#[derive(Clone, Debug, Serialize)]
pub struct FileTimes {
    /// mean runtime, in seconds
    pub mean: f64,
    pub std: f64,
    /// mean of the per-conformer ratio to the reference file's runtime
    pub mean_ratio: f64,
    pub std_ratio: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MoleculeTimes {
    pub title: String,
    pub files: Vec<FileTimes>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TimeReport {
    pub files: Vec<String>,
    pub molecules: Vec<MoleculeTimes>,
}

/// Summarize runtimes per molecule and file.
///
/// The zero conformers play no part in the ratios; they are taken so the call
/// mirrors the energy reduction and must have one entry per molecule.
pub fn reduce(cube: &TimeCube, zero_indices: &[Option<usize>]) -> TimeReport {
    assert_eq!(
        zero_indices.len(),
        cube.n_molecules(),
        "one zero conformer entry is needed per molecule"
    );

    let molecules = cube
        .molecule_names
        .iter()
        .enumerate()
        .map(|(m, title)| {
            let times = cube.molecule(m);
            let files = times
                .iter()
                .map(|row| {
                    let ratios = ratios(&times[0], row);
                    FileTimes {
                        mean: nan_mean(row.iter().copied()),
                        std: nan_std(row.iter().copied()),
                        mean_ratio: nan_mean(ratios.iter().copied()),
                        std_ratio: nan_std(ratios),
                    }
                })
                .collect();

            MoleculeTimes {
                title: title.clone(),
                files,
            }
        })
        .collect();

    TimeReport {
        files: cube.files.clone(),
        molecules,
    }
}

/// Per-conformer `time / reference`, dropping NaN ratios. A zero reference
/// runtime gives an infinite ratio, which is kept.
fn ratios(reference: &[f64], times: &[f64]) -> Vec<f64> {
    izip!(reference, times)
        .map(|(reference, time)| time / reference)
        .filter(|ratio| !ratio.is_nan())
        .collect()
}
