//! Per-molecule tables of matched values, aligned to the reference conformers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{MatchSlot, RawReconciliation};

/// Why a cube entry holds NaN.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MissingCause {
    /// no query conformer was within the RMSD threshold
    NoMatch,
    /// the file has no molecule with this title
    AbsentMolecule,
    /// the matched conformer has no value, usually an unfinished job
    IncompleteJob,
    /// the file recorded no values at all for this molecule
    NoValues,
}

impl fmt::Display for MissingCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            MissingCause::NoMatch => "no structural match",
            MissingCause::AbsentMolecule => "molecule absent",
            MissingCause::IncompleteJob => "incomplete job",
            MissingCause::NoValues => "no values",
        };
        f.write_str(text)
    }
}

/// `values[m][f][k]` is the value of file `f` for reference conformer `k` of
/// molecule `m`, or NaN with `causes[m][f][k]` telling why.
#[derive(Clone, Debug)]
pub struct Cube {
    pub molecule_names: Vec<String>,
    pub ref_conformer_counts: Vec<usize>,
    pub files: Vec<String>,
    pub values: Vec<Vec<Vec<f64>>>,
    pub causes: Vec<Vec<Vec<Option<MissingCause>>>>,
}

/// Energies in Hartree.
pub type EnergyCube = Cube;
/// Runtimes in seconds.
pub type TimeCube = Cube;

impl Cube {
    fn with_axes(raw: &RawReconciliation) -> Self {
        Self {
            molecule_names: raw.molecule_names.clone(),
            ref_conformer_counts: raw.ref_conformer_counts.clone(),
            files: raw.files.clone(),
            values: Vec::with_capacity(raw.n_molecules()),
            causes: Vec::with_capacity(raw.n_molecules()),
        }
    }

    pub fn n_molecules(&self) -> usize {
        self.molecule_names.len()
    }

    pub fn n_files(&self) -> usize {
        self.files.len()
    }

    /// The (file x reference conformer) table of one molecule.
    pub fn molecule(&self, m: usize) -> &[Vec<f64>] {
        &self.values[m]
    }

    pub fn cause(&self, m: usize, f: usize, k: usize) -> Option<MissingCause> {
        self.causes[m][f][k]
    }

    /// Number of missing entries in each file for molecule `m`.
    pub fn missing_per_file(&self, m: usize) -> Vec<usize> {
        self.causes[m]
            .iter()
            .map(|slots| slots.iter().filter(|cause| cause.is_some()).count())
            .collect()
    }
}

/// Reindex the raw energy and time lists to reference-conformer order.
///
/// Panics if a matched index lies outside its value list or a resolved row does
/// not have one entry per reference conformer.
pub fn reshape(raw: &RawReconciliation) -> (EnergyCube, TimeCube) {
    let mut energies = Cube::with_axes(raw);
    let mut times = Cube::with_axes(raw);

    for (m, title) in raw.molecule_names.iter().enumerate() {
        let ref_count = raw.ref_conformer_counts[m];
        let mut energy_rows = (Vec::new(), Vec::new());
        let mut time_rows = (Vec::new(), Vec::new());

        for (f, slots) in raw.indices[m].iter().enumerate() {
            let file = &raw.files[f];
            let (energy, energy_causes) = resolve(title, slots, &raw.energies[m][f]);
            let (time, time_causes) = resolve(title, slots, &raw.times[m][f]);

            for row in [&energy, &time] {
                assert_eq!(
                    row.len(),
                    ref_count,
                    "{title}: row for {file} does not have one entry per reference conformer"
                );
            }

            report_missing(title, file, "energies", &energy_causes, true);
            report_missing(title, file, "runtimes", &time_causes, false);

            energy_rows.0.push(energy);
            energy_rows.1.push(energy_causes);
            time_rows.0.push(time);
            time_rows.1.push(time_causes);
        }

        energies.values.push(energy_rows.0);
        energies.causes.push(energy_rows.1);
        times.values.push(time_rows.0);
        times.causes.push(time_rows.1);
    }

    (energies, times)
}

fn resolve(
    title: &str,
    slots: &[MatchSlot],
    values: &[Option<f64>],
) -> (Vec<f64>, Vec<Option<MissingCause>>) {
    slots
        .iter()
        .enumerate()
        .map(|(k, slot)| {
            let position = match *slot {
                MatchSlot::NoMatch => return (f64::NAN, Some(MissingCause::NoMatch)),
                MatchSlot::Absent => return (f64::NAN, Some(MissingCause::AbsentMolecule)),
                _ if values.is_empty() => return (f64::NAN, Some(MissingCause::NoValues)),
                MatchSlot::Identity => k,
                MatchSlot::Matched(q) => q,
            };
            assert!(
                position < values.len(),
                "{title}: conformer {position} is out of range for {} values",
                values.len()
            );

            match values[position] {
                Some(value) => (value, None),
                None => (f64::NAN, Some(MissingCause::IncompleteJob)),
            }
        })
        .unzip()
}

/// Structural gaps are shared by every quantity, so only one table reports them.
fn report_missing(
    title: &str,
    file: &str,
    quantity: &str,
    causes: &[Option<MissingCause>],
    structural: bool,
) {
    if causes.contains(&Some(MissingCause::NoValues)) {
        log::warn!("{title}: no {quantity} recorded in {file}");
    }
    if !structural {
        return;
    }
    if causes.contains(&Some(MissingCause::AbsentMolecule)) {
        log::info!("{title}: molecule absent from {file}");
    }

    for (k, cause) in causes.iter().enumerate() {
        match cause {
            Some(MissingCause::NoMatch) => {
                log::info!("{title}: reference conformer {k} has no match in {file}")
            }
            Some(MissingCause::IncompleteJob) => {
                log::debug!("{title}: conformer matched to reference {k} in {file} has no energy")
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::MatchSlot::{Absent, Identity, Matched, NoMatch};

    fn scenario() -> RawReconciliation {
        RawReconciliation {
            molecule_names: vec!["A".into(), "B".into()],
            ref_conformer_counts: vec![3, 1],
            files: vec!["file0".into(), "file1".into()],
            indices: vec![
                vec![vec![Identity; 3], vec![Matched(2), Matched(0), NoMatch]],
                vec![vec![Identity], vec![Absent]],
            ],
            energies: vec![
                vec![
                    vec![Some(-1.0), Some(-1.1), None],
                    vec![Some(-3.0), Some(-3.1), Some(-3.2)],
                ],
                vec![vec![Some(-2.0)], vec![None]],
            ],
            times: vec![
                vec![vec![Some(10.0), Some(11.0), Some(12.0)], vec![]],
                vec![vec![Some(5.0)], vec![None]],
            ],
        }
    }

    #[test]
    fn reference_conformer_order() {
        let (energies, times) = reshape(&scenario());

        assert_eq!(energies.molecule(0)[1][..2], [-3.2, -3.0]);
        assert!(energies.molecule(0)[1][2].is_nan());
        assert_eq!(energies.cause(0, 1, 2), Some(MissingCause::NoMatch));

        assert_eq!(energies.molecule(0)[0][..2], [-1.0, -1.1]);
        assert_eq!(energies.cause(0, 0, 2), Some(MissingCause::IncompleteJob));

        assert!(energies.molecule(1)[1][0].is_nan());
        assert_eq!(energies.cause(1, 1, 0), Some(MissingCause::AbsentMolecule));

        assert_eq!(times.molecule(0)[0], vec![10.0, 11.0, 12.0]);
        assert_eq!(times.cause(0, 1, 0), Some(MissingCause::NoValues));
        assert_eq!(times.cause(0, 1, 2), Some(MissingCause::NoMatch));
    }

    #[test]
    fn every_row_has_one_entry_per_reference_conformer() {
        let raw = scenario();
        let (energies, times) = reshape(&raw);

        for cube in [&energies, &times] {
            assert_eq!(cube.n_molecules(), 2);
            for (m, &count) in raw.ref_conformer_counts.iter().enumerate() {
                assert_eq!(cube.molecule(m).len(), cube.n_files());
                assert!(cube.molecule(m).iter().all(|row| row.len() == count));
            }
        }
        assert_eq!(energies.missing_per_file(0), vec![1, 1]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn out_of_range_match_panics() {
        let mut raw = scenario();
        raw.indices[0][1][0] = Matched(7);
        reshape(&raw);
    }
}
