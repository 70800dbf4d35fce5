use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use crate::{
    error::{Error, Result},
    record::LevelOfTheory,
    store::CalculationFile,
};

/// One calculation file and the level of theory whose results it holds.
#[derive(Clone, Debug, PartialEq)]
pub struct InputEntry {
    pub theory: LevelOfTheory,
    pub path: PathBuf,
}

/// The calculation files to compare, read from lines of `THEORY, PATH`.
/// The first entry is the reference.
#[derive(Clone, Debug, PartialEq)]
pub struct InputList {
    entries: Vec<InputEntry>,
}

impl InputList {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::MissingFile(path.to_path_buf()));
        }

        fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|text| text.parse())
            .map_err(|e| e.in_file(path))
    }

    pub fn entries(&self) -> &[InputEntry] {
        &self.entries
    }

    pub fn theories(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.theory.to_string())
            .collect()
    }

    /// Fail on the first listed file that does not exist.
    pub fn check_files(&self) -> Result<()> {
        match self.entries.iter().find(|entry| !entry.path.is_file()) {
            Some(entry) => Err(Error::MissingFile(entry.path.clone())),
            None => Ok(()),
        }
    }

    /// Load every listed file, in order.
    pub fn load_files(&self) -> Result<Vec<CalculationFile>> {
        self.check_files()?;
        self.entries
            .iter()
            .map(|entry| CalculationFile::load(&entry.path, entry.theory.clone()))
            .collect()
    }
}

impl FromStr for InputList {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
            let &[theory, path] = fields.as_slice() else {
                return Err(Error::parse(
                    number + 1,
                    format!("expected `THEORY, PATH`, found {line:?}"),
                ));
            };
            if path.is_empty() {
                return Err(Error::parse(number + 1, "missing file path"));
            }

            let theory = theory
                .parse()
                .map_err(|e: Error| Error::parse(number + 1, e.to_string()))?;
            entries.push(InputEntry {
                theory,
                path: PathBuf::from(path),
            });
        }

        if entries.is_empty() {
            return Err(Error::InvalidInput(
                "input list names no calculation files".to_owned(),
            ));
        }

        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_comments() {
        let list: InputList = "\
# reference first
MP2/def2-TZVP, mp2/tzvp.sdf

B3LYP-D3MBJ/def2-TZVP , b3lyp/tzvp.sdf
"
        .parse()
        .unwrap();

        assert_eq!(list.entries().len(), 2);
        assert_eq!(list.entries()[0].path, PathBuf::from("mp2/tzvp.sdf"));
        assert_eq!(list.entries()[1].theory.method, "B3LYP-D3MBJ");
        assert_eq!(
            list.theories(),
            vec!["MP2/def2-TZVP", "B3LYP-D3MBJ/def2-TZVP"]
        );
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let err = "MP2/def2-TZVP, a.sdf\nHF-3c b.sdf\n"
            .parse::<InputList>()
            .unwrap_err();
        assert!(matches!(err, Error::Parse { line: 2, .. }));

        let err = "# nothing\n".parse::<InputList>().unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn missing_files_are_reported() {
        let list: InputList = "HF/STO-3G, definitely/not/here.sdf".parse().unwrap();
        match list.check_files() {
            Err(Error::MissingFile(path)) => {
                assert_eq!(path, PathBuf::from("definitely/not/here.sdf"))
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
