#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MatchResult, MatchSlot, MinimaMatcher};
use crate::{
    error::{Error, Result},
    molecule::Molecule,
    record::TagKind,
    rmsd::ConformerDistance,
    store::CalculationFile,
};

/// Matching output before any reindexing, keyed by molecule and then by file.
///
/// `indices[m][f]` has one slot per reference conformer of molecule `m`, while
/// `energies[m][f]` and `times[m][f]` are in the conformer order of file `f`'s
/// own copy of the molecule. Missing values are `None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawReconciliation {
    pub molecule_names: Vec<String>,
    pub ref_conformer_counts: Vec<usize>,
    pub files: Vec<String>,
    pub indices: Vec<Vec<MatchResult>>,
    pub energies: Vec<Vec<Vec<Option<f64>>>>,
    pub times: Vec<Vec<Vec<Option<f64>>>>,
}

impl RawReconciliation {
    pub fn n_molecules(&self) -> usize {
        self.molecule_names.len()
    }

    pub fn n_files(&self) -> usize {
        self.files.len()
    }

    /// Rebuild from flat tables emitted file by file, with the molecules of
    /// each file contiguous and in reference order.
    pub fn from_file_major(
        molecule_names: Vec<String>,
        ref_conformer_counts: Vec<usize>,
        files: Vec<String>,
        flat_indices: Vec<MatchResult>,
        flat_energies: Vec<Vec<Option<f64>>>,
        flat_times: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        let n_molecules = molecule_names.len();
        let expected = n_molecules * files.len();
        for (name, len) in [
            ("index", flat_indices.len()),
            ("energy", flat_energies.len()),
            ("time", flat_times.len()),
        ] {
            if len != expected {
                return Err(Error::shape(format!(
                    "flat {name} table has {len} entries, expected {n_molecules} molecules x {} files",
                    files.len()
                )));
            }
        }

        let raw = Self {
            molecule_names,
            ref_conformer_counts,
            files,
            indices: deinterleave(flat_indices, n_molecules),
            energies: deinterleave(flat_energies, n_molecules),
            times: deinterleave(flat_times, n_molecules),
        };
        raw.validate()?;
        Ok(raw)
    }

    /// Check every table against the declared molecule, file and conformer counts.
    pub fn validate(&self) -> Result<()> {
        let n_molecules = self.n_molecules();
        let n_files = self.n_files();

        if self.ref_conformer_counts.len() != n_molecules {
            return Err(Error::shape(format!(
                "{} conformer counts for {n_molecules} molecules",
                self.ref_conformer_counts.len()
            )));
        }
        for (table, len) in [
            ("index", self.indices.len()),
            ("energy", self.energies.len()),
            ("time", self.times.len()),
        ] {
            if len != n_molecules {
                return Err(Error::shape(format!(
                    "{table} table covers {len} molecules, expected {n_molecules}"
                )));
            }
        }

        for (m, title) in self.molecule_names.iter().enumerate() {
            let ref_count = self.ref_conformer_counts[m];
            if self.indices[m].len() != n_files
                || self.energies[m].len() != n_files
                || self.times[m].len() != n_files
            {
                return Err(Error::shape(format!(
                    "{title}: tables do not cover all {n_files} files"
                )));
            }

            for f in 0..n_files {
                let slots = &self.indices[m][f];
                if slots.len() != ref_count {
                    return Err(Error::shape(format!(
                        "{title}: file {f} has {} match slots for {ref_count} reference conformers",
                        slots.len()
                    )));
                }

                for values in [&self.energies[m][f], &self.times[m][f]] {
                    if let Some(slot) = slots
                        .iter()
                        .enumerate()
                        .find(|&(k, slot)| !slot_in_range(k, *slot, values.len()))
                    {
                        return Err(Error::shape(format!(
                            "{title}: file {f} slot {slot:?} points outside its {} values",
                            values.len()
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

fn slot_in_range(position: usize, slot: MatchSlot, n_values: usize) -> bool {
    match slot {
        // an empty list means the values are unavailable for this file
        _ if n_values == 0 => true,
        MatchSlot::Matched(q) => q < n_values,
        MatchSlot::Identity => position < n_values,
        MatchSlot::NoMatch | MatchSlot::Absent => true,
    }
}

/// Entry `i` of a file-major list belongs to molecule `i % n_molecules`.
fn deinterleave<T>(flat: Vec<T>, n_molecules: usize) -> Vec<Vec<T>> {
    let mut per_molecule = (0..n_molecules).map(|_| Vec::new()).collect::<Vec<_>>();
    for (i, item) in flat.into_iter().enumerate() {
        per_molecule[i % n_molecules].push(item);
    }
    per_molecule
}

/// The tables of one reference molecule across all files.
struct MoleculeRow {
    indices: Vec<MatchResult>,
    energies: Vec<Vec<Option<f64>>>,
    times: Vec<Vec<Option<f64>>>,
}

/// Runs the minima matcher for every reference molecule against every file.
#[derive(Clone, Debug)]
pub struct CrossFileReconciler {
    pub matcher: MinimaMatcher,
    /// which recorded energy is compared
    pub energy: TagKind,
    /// which recorded runtime is compared
    pub time: TagKind,
}

impl Default for CrossFileReconciler {
    fn default() -> Self {
        Self {
            matcher: MinimaMatcher::default(),
            energy: TagKind::FinalOptEnergy,
            time: TagKind::OptRuntime,
        }
    }
}

impl CrossFileReconciler {
    /// Reconcile a list of files whose first entry is the reference.
    pub fn reconcile_all(
        &self,
        files: &[CalculationFile],
        metric: &impl ConformerDistance,
    ) -> Result<RawReconciliation> {
        let reference = files
            .first()
            .ok_or_else(|| Error::InvalidInput("no calculation files given".to_owned()))?;
        self.reconcile(reference, files, metric)
    }

    /// Match every molecule of `reference` in each of `queries`. The output has
    /// one column per query file, in the given order; a query that is the
    /// reference file itself gets identity slots.
    ///
    /// Column 0 is always the reference. When `queries` does not start with
    /// it, the reference is put in front of them.
    pub fn reconcile(
        &self,
        reference: &CalculationFile,
        queries: &[CalculationFile],
        metric: &impl ConformerDistance,
    ) -> Result<RawReconciliation> {
        if reference.molecules().is_empty() {
            return Err(Error::EmptyReference(reference.label().to_owned()));
        }

        let mut columns = Vec::with_capacity(queries.len() + 1);
        if !queries.first().is_some_and(|first| first.is_same_source(reference)) {
            log::info!(
                "{} is not the first query, comparing it against itself first",
                reference.label()
            );
            columns.push(reference);
        }
        columns.extend(queries);

        let per_molecule =
            |molecule: &Molecule| self.reconcile_molecule(molecule, reference, &columns, metric);

        #[cfg(feature = "rayon")]
        let rows = reference
            .molecules()
            .par_iter()
            .map(per_molecule)
            .collect::<Vec<_>>();
        #[cfg(not(feature = "rayon"))]
        let rows = reference
            .molecules()
            .iter()
            .map(per_molecule)
            .collect::<Vec<_>>();

        let mut raw = RawReconciliation {
            molecule_names: reference
                .molecules()
                .iter()
                .map(|molecule| molecule.title().to_owned())
                .collect(),
            ref_conformer_counts: reference
                .molecules()
                .iter()
                .map(Molecule::n_conformers)
                .collect(),
            files: columns.iter().map(|query| query.label().to_owned()).collect(),
            indices: Vec::with_capacity(rows.len()),
            energies: Vec::with_capacity(rows.len()),
            times: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            raw.indices.push(row.indices);
            raw.energies.push(row.energies);
            raw.times.push(row.times);
        }

        log::debug!(
            "reconciled {} molecules across {} files",
            raw.n_molecules(),
            raw.n_files()
        );
        Ok(raw)
    }

    fn reconcile_molecule(
        &self,
        molecule: &Molecule,
        reference: &CalculationFile,
        queries: &[&CalculationFile],
        metric: &impl ConformerDistance,
    ) -> MoleculeRow {
        let title = molecule.title();
        let ref_count = molecule.n_conformers();
        let mut row = MoleculeRow {
            indices: Vec::with_capacity(queries.len()),
            energies: Vec::with_capacity(queries.len()),
            times: Vec::with_capacity(queries.len()),
        };

        for query in queries {
            let Some(query_molecule) = query.molecule(title) else {
                log::warn!("{title}: no molecule with this title in {}", query.label());
                row.indices.push(vec![MatchSlot::Absent; ref_count]);
                row.energies.push(vec![None; ref_count]);
                row.times.push(vec![None; ref_count]);
                continue;
            };

            // same structures, but the values are read at the query's theory
            if query.is_same_source(reference) {
                log::info!(
                    "{title}: skipping comparison of {} against itself",
                    query.label()
                );
                row.indices.push(vec![MatchSlot::Identity; ref_count]);
                row.energies.push(self.values(query_molecule, self.energy));
                row.times.push(self.values(query_molecule, self.time));
                continue;
            }

            log::info!(
                "{title}: matching {} reference conformers to {} conformers of {}",
                ref_count,
                query_molecule.n_conformers(),
                query.label()
            );
            let matches = self.matcher.match_molecules(molecule, query_molecule, metric);
            for (conformer, slot) in molecule.conformers().iter().zip(&matches) {
                log::debug!(
                    "{title}: reference conformer {} (original {}) -> {slot:?}",
                    conformer.index(),
                    conformer.original_index()
                );
            }

            row.indices.push(matches);
            row.energies.push(self.values(query_molecule, self.energy));
            row.times.push(self.values(query_molecule, self.time));
        }

        row
    }

    fn values(&self, molecule: &Molecule, kind: TagKind) -> Vec<Option<f64>> {
        molecule
            .conformers()
            .iter()
            .map(|conformer| conformer.record().value(kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, Vector3};

    use super::*;
    use crate::{
        atom::Atom, periodic_table::ElementType, record::ConformerRecord, record::LevelOfTheory,
    };

    fn helium(title: &str, energies: &[Option<f64>]) -> Molecule {
        let mut molecule = Molecule::new(title, vec![ElementType::He], Vec::new());
        for (i, &energy) in energies.iter().enumerate() {
            molecule.push_conformer(
                vec![Atom::new(ElementType::He, Vector3::new(i as f64, 0.0, 0.0))],
                ConformerRecord {
                    final_energy: energy,
                    runtime: energy.map(|_| 10.0 * (i + 1) as f64),
                    ..Default::default()
                },
            );
        }
        molecule
    }

    fn file(label: &str, molecules: Vec<Molecule>) -> CalculationFile {
        let theory: LevelOfTheory = "HF/STO-3G".parse().unwrap();
        CalculationFile::new(label, theory, molecules)
    }

    /// Reference conformer `r` is 0.1 Å from query conformer `lookup[r]`, all
    /// other pairs are 2 Å apart.
    fn lookup(
        table: &'static [(&'static str, &'static [Option<usize>])],
    ) -> impl ConformerDistance {
        move |reference: &Molecule, query: &Molecule| -> DMatrix<f64> {
            let (_, matches) = table
                .iter()
                .find(|(title, _)| *title == reference.title())
                .expect("title in lookup table");
            DMatrix::from_fn(reference.n_conformers(), query.n_conformers(), |r, q| {
                if matches[r] == Some(q) {
                    0.1
                } else {
                    2.0
                }
            })
        }
    }

    #[test]
    fn absent_molecules_and_matches() {
        let reference = file(
            "file0",
            vec![
                helium("A", &[Some(-1.0), Some(-1.1), Some(-1.2)]),
                helium("B", &[Some(-2.0)]),
            ],
        );
        let query = file("file1", vec![helium("A", &[Some(-3.0), Some(-3.1), Some(-3.2)])]);
        let files = [reference, query];

        let metric = lookup(&[("A", &[Some(2), Some(0), None]), ("B", &[Some(0)])]);
        let raw = CrossFileReconciler::default()
            .reconcile_all(&files, &metric)
            .unwrap();

        assert_eq!(raw.molecule_names, vec!["A", "B"]);
        assert_eq!(raw.ref_conformer_counts, vec![3, 1]);
        assert_eq!(raw.files, vec!["file0", "file1"]);

        assert_eq!(raw.indices[0][0], vec![MatchSlot::Identity; 3]);
        assert_eq!(raw.indices[1][0], vec![MatchSlot::Identity]);
        assert_eq!(
            raw.indices[0][1],
            vec![MatchSlot::Matched(2), MatchSlot::Matched(0), MatchSlot::NoMatch]
        );
        assert_eq!(raw.energies[0][1], vec![Some(-3.0), Some(-3.1), Some(-3.2)]);

        assert_eq!(raw.indices[1][1], vec![MatchSlot::Absent]);
        assert_eq!(raw.energies[1][1], vec![None]);
        assert_eq!(raw.times[1][1], vec![None]);

        raw.validate().unwrap();
    }

    #[test]
    fn reference_against_itself_is_identity() {
        let reference = file(
            "file0",
            vec![helium("A", &[Some(-1.0), None]), helium("B", &[Some(-2.0)])],
        );

        let metric = |_: &Molecule, _: &Molecule| -> DMatrix<f64> {
            panic!("self comparison must not compute distances")
        };
        let raw = CrossFileReconciler::default()
            .reconcile(&reference, std::slice::from_ref(&reference), &metric)
            .unwrap();

        assert_eq!(raw.indices[0][0], vec![MatchSlot::Identity; 2]);
        assert_eq!(raw.indices[1][0], vec![MatchSlot::Identity]);
        assert_eq!(raw.energies[0][0], vec![Some(-1.0), None]);
        assert_eq!(raw.times[0][0], vec![Some(10.0), None]);
    }

    const HELIUM_TWO_THEORIES: &str = "\
He
  confmatch

  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 He  0  0  0  0  0  0  0  0  0  0  0  0
M  END
> <QM Psi4 Final Opt. Energy (Har) HF/STO-3G>
-2.80

> <QM Psi4 Final Opt. Energy (Har) MP2/STO-3G>
-2.90

$$$$
";

    #[test]
    fn one_file_under_two_theories_keeps_each_theorys_values() {
        let path = std::env::temp_dir().join(format!(
            "confmatch-{}-helium-two-theories.sdf",
            std::process::id()
        ));
        std::fs::write(&path, HELIUM_TWO_THEORIES).unwrap();

        let files = [
            CalculationFile::load(&path, "HF/STO-3G".parse().unwrap()).unwrap(),
            CalculationFile::load(&path, "MP2/STO-3G".parse().unwrap()).unwrap(),
        ];
        std::fs::remove_file(&path).unwrap();

        let metric = |_: &Molecule, _: &Molecule| -> DMatrix<f64> {
            panic!("self comparison must not compute distances")
        };
        let raw = CrossFileReconciler::default()
            .reconcile_all(&files, &metric)
            .unwrap();

        assert_eq!(raw.n_files(), 2);
        assert_eq!(
            raw.indices[0],
            vec![vec![MatchSlot::Identity], vec![MatchSlot::Identity]]
        );
        assert_eq!(raw.energies[0], vec![vec![Some(-2.80)], vec![Some(-2.90)]]);
    }

    #[test]
    fn reference_missing_from_queries_becomes_column_zero() {
        let reference = file("file0", vec![helium("A", &[Some(-1.0), Some(-1.1)])]);
        let query = file("file1", vec![helium("A", &[Some(-3.1), Some(-3.0)])]);

        let metric = lookup(&[("A", &[Some(1), Some(0)])]);
        let raw = CrossFileReconciler::default()
            .reconcile(&reference, std::slice::from_ref(&query), &metric)
            .unwrap();

        assert_eq!(raw.files, vec!["file0", "file1"]);
        assert_eq!(raw.indices[0][0], vec![MatchSlot::Identity; 2]);
        assert_eq!(raw.energies[0][0], vec![Some(-1.0), Some(-1.1)]);
        assert_eq!(
            raw.indices[0][1],
            vec![MatchSlot::Matched(1), MatchSlot::Matched(0)]
        );
        raw.validate().unwrap();
    }

    #[test]
    fn empty_reference_is_an_error() {
        let reference = file("empty", Vec::new());
        let metric = |_: &Molecule, _: &Molecule| -> DMatrix<f64> { DMatrix::zeros(0, 0) };
        let err = CrossFileReconciler::default()
            .reconcile_all(std::slice::from_ref(&reference), &metric)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyReference(_)));
    }

    #[test]
    fn file_major_tables_are_regrouped_by_molecule() {
        let raw = RawReconciliation::from_file_major(
            vec!["A".into(), "B".into()],
            vec![2, 1],
            vec!["file0".into(), "file1".into()],
            vec![
                vec![MatchSlot::Identity; 2],
                vec![MatchSlot::Identity],
                vec![MatchSlot::Matched(1), MatchSlot::NoMatch],
                vec![MatchSlot::Absent],
            ],
            vec![
                vec![Some(-1.0), Some(-0.9)],
                vec![Some(-5.0)],
                vec![Some(-1.5), Some(-1.4)],
                vec![None],
            ],
            vec![vec![None; 2], vec![None], vec![None; 2], vec![None]],
        )
        .unwrap();

        assert_eq!(
            raw.indices[0],
            vec![
                vec![MatchSlot::Identity; 2],
                vec![MatchSlot::Matched(1), MatchSlot::NoMatch]
            ]
        );
        assert_eq!(raw.energies[1], vec![vec![Some(-5.0)], vec![None]]);
    }

    #[test]
    fn file_major_tables_with_wrong_stride_are_rejected() {
        let err = RawReconciliation::from_file_major(
            vec!["A".into(), "B".into()],
            vec![1, 1],
            vec!["file0".into(), "file1".into()],
            vec![vec![MatchSlot::Identity]; 3],
            vec![vec![None]; 3],
            vec![vec![None]; 3],
        )
        .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch(_)));
    }

    #[test]
    fn out_of_range_match_is_rejected() {
        let raw = RawReconciliation {
            molecule_names: vec!["A".into()],
            ref_conformer_counts: vec![1],
            files: vec!["file0".into()],
            indices: vec![vec![vec![MatchSlot::Matched(3)]]],
            energies: vec![vec![vec![Some(-1.0)]]],
            times: vec![vec![vec![]]],
        };
        assert!(matches!(raw.validate(), Err(Error::ShapeMismatch(_))));
    }
}
