//! Calculation files: the molecules of one SD file, with their conformers'
//! results at a single level of theory.

use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    io::sdf::{reader, writer, SdRecord},
    molecule::Molecule,
    periodic_table::ElementType,
    record::{ConformerRecord, LevelOfTheory},
};

#[derive(Clone, Debug)]
pub struct CalculationFile {
    pub(crate) label: String,
    pub(crate) path: Option<PathBuf>,
    pub(crate) theory: LevelOfTheory,
    pub(crate) molecules: Vec<Molecule>,
}

impl CalculationFile {
    pub fn new(label: impl Into<String>, theory: LevelOfTheory, molecules: Vec<Molecule>) -> Self {
        Self {
            label: label.into(),
            path: None,
            theory,
            molecules,
        }
    }

    /// Load a multi-conformer SD file whose tags hold results at `theory`.
    pub fn load(path: impl AsRef<Path>, theory: LevelOfTheory) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }

        let file = File::open(path).map_err(|e| Error::from(e).in_file(path))?;
        let mut calculation = Self::from_reader(BufReader::new(file), theory)
            .map_err(|e| e.in_file(path))?;
        calculation.path = Some(path.to_path_buf());
        calculation.label = path.display().to_string();

        log::info!(
            "loaded {} molecules from {} using [ {} ] results",
            calculation.molecules.len(),
            path.display(),
            calculation.theory
        );
        Ok(calculation)
    }

    pub fn from_reader<R: BufRead>(reader: R, theory: LevelOfTheory) -> Result<Self> {
        let records = reader::read(reader)?;
        let molecules = group_conformers(records, &theory);
        Ok(Self::new(theory.to_string(), theory, molecules))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn theory(&self) -> &LevelOfTheory {
        &self.theory
    }

    pub fn molecules(&self) -> &[Molecule] {
        &self.molecules
    }

    /// The first molecule with the given title.
    pub fn molecule(&self, title: &str) -> Option<&Molecule> {
        self.molecules.iter().find(|molecule| molecule.title() == title)
    }

    /// A copy of molecule `title` holding either all of its conformers or only
    /// the one with the given original index.
    pub fn extract(&self, title: &str, original_index: Option<usize>) -> Result<Molecule> {
        let molecule = self.molecule(title).ok_or_else(|| {
            Error::InvalidInput(format!("{} has no molecule {title}", self.label))
        })?;

        let mut extracted = Molecule::new(
            title,
            molecule.elements().to_vec(),
            molecule.bonds().to_vec(),
        );
        for conformer in molecule.conformers() {
            if original_index.is_some_and(|index| conformer.original_index() != index) {
                continue;
            }
            extracted.push_conformer(conformer.atoms().to_vec(), conformer.record().clone());
        }

        if extracted.n_conformers() == 0 {
            return Err(Error::InvalidInput(format!(
                "{title} in {} has no conformer with original index {}",
                self.label,
                original_index.unwrap_or_default()
            )));
        }
        Ok(extracted)
    }

    /// Write the conformers picked by [`Self::extract`] as SD records tagged
    /// with this file's level of theory. Returns the number of records.
    pub fn export<W: Write>(
        &self,
        sink: W,
        title: &str,
        original_index: Option<usize>,
    ) -> Result<usize> {
        let molecule = self.extract(title, original_index)?;
        writer::write_molecule(sink, &molecule, &self.theory)?;
        Ok(molecule.n_conformers())
    }

    /// Whether both handles refer to the same calculation, either the same
    /// value or the same file on disk.
    pub fn is_same_source(&self, other: &CalculationFile) -> bool {
        std::ptr::eq(self, other)
            || matches!((&self.path, &other.path), (Some(a), Some(b)) if a == b)
    }
}

/// Consecutive records with the same title and the same atoms and bonds are
/// conformers of one molecule.
fn group_conformers(records: Vec<SdRecord>, theory: &LevelOfTheory) -> Vec<Molecule> {
    let mut molecules: Vec<Molecule> = Vec::new();

    for SdRecord {
        title,
        atoms,
        bonds,
        tags,
    } in records
    {
        let elements = atoms
            .iter()
            .map(|atom| atom.element_type())
            .collect::<Vec<ElementType>>();
        let record = ConformerRecord::from_tags(&tags, theory);

        let continues_last = molecules.last().is_some_and(|molecule| {
            molecule.title() == title && molecule.same_topology(&elements, &bonds)
        });

        if continues_last {
            if let Some(molecule) = molecules.last_mut() {
                molecule.push_conformer(atoms, record);
            }
            continue;
        }

        if molecules.iter().any(|molecule| molecule.title() == title) {
            log::warn!(
                "molecule {title} appears more than once; only the first block is used for matching"
            );
        }
        let mut molecule = Molecule::new(title, elements, bonds);
        molecule.push_conformer(atoms, record);
        molecules.push(molecule);
    }

    molecules
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const TWO_MOLECULES: &str = "\
H2
  confmatch

  2  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
    0.7400    0.0000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
M  END
> <QM Psi4 Final Opt. Energy (Har) HF/STO-3G>
-1.117

$$$$
H2
  confmatch

  2  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
    0.7500    0.0000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
M  END
> <Note on opt. HF/STO-3G>
JOB DID NOT FINISH

$$$$
HF
  confmatch

  2  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 F   0  0  0  0  0  0  0  0  0  0  0  0
    0.9200    0.0000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
M  END
$$$$
";

    #[test]
    fn groups_consecutive_records_into_conformers() {
        let theory: LevelOfTheory = "HF/STO-3G".parse().unwrap();
        let file = CalculationFile::from_reader(Cursor::new(TWO_MOLECULES), theory).unwrap();

        assert_eq!(file.molecules().len(), 2);

        let hydrogen = file.molecule("H2").unwrap();
        assert_eq!(hydrogen.n_conformers(), 2);
        assert_eq!(hydrogen.conformers()[0].record().final_energy, Some(-1.117));
        assert_eq!(hydrogen.conformers()[1].record().final_energy, None);
        assert_eq!(hydrogen.conformers()[1].index(), 1);

        assert_eq!(file.molecule("HF").unwrap().n_conformers(), 1);
        assert!(file.molecule("H2O").is_none());
    }

    #[test]
    fn one_conformer_is_exported_with_its_tags() {
        let theory: LevelOfTheory = "HF/STO-3G".parse().unwrap();
        let file = CalculationFile::from_reader(Cursor::new(TWO_MOLECULES), theory).unwrap();

        let mut buf = Vec::new();
        assert_eq!(file.export(&mut buf, "H2", Some(0)).unwrap(), 1);

        let exported =
            CalculationFile::from_reader(Cursor::new(buf), file.theory().clone()).unwrap();
        let hydrogen = exported.molecule("H2").unwrap();
        assert_eq!(hydrogen.n_conformers(), 1);
        assert_eq!(hydrogen.conformers()[0].record().final_energy, Some(-1.117));
        assert!((hydrogen.conformers()[0].atoms()[1].position().x - 0.74).abs() < 1e-4);
    }

    #[test]
    fn export_without_a_match_is_an_error() {
        let theory: LevelOfTheory = "HF/STO-3G".parse().unwrap();
        let file = CalculationFile::from_reader(Cursor::new(TWO_MOLECULES), theory).unwrap();

        assert_eq!(file.extract("H2", None).unwrap().n_conformers(), 2);
        assert!(matches!(
            file.export(Vec::new(), "H2O", None),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            file.extract("HF", Some(3)),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let theory: LevelOfTheory = "HF/STO-3G".parse().unwrap();
        let err = CalculationFile::load("does/not/exist.sdf", theory).unwrap_err();
        assert!(matches!(err, Error::MissingFile(_)));
    }
}
