//! JSON checkpoints of the matching step, so that reduction can be rerun
//! without recomputing RMSDs. Missing energies and times are stored as `null`.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use super::RawReconciliation;
use crate::error::{Error, Result};

pub fn save(path: impl AsRef<Path>, raw: &RawReconciliation) -> Result<()> {
    let path = path.as_ref();
    let write = || -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, raw)?;
        writer.flush()?;
        Ok(())
    };
    write().map_err(|e| e.in_file(path))?;

    log::info!(
        "wrote matching checkpoint for {} molecules to {}",
        raw.n_molecules(),
        path.display()
    );
    Ok(())
}

/// Read a checkpoint written by [`save`], checking that its tables agree in shape.
pub fn load(path: impl AsRef<Path>) -> Result<RawReconciliation> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::MissingFile(path.to_path_buf()));
    }

    let read = || -> Result<RawReconciliation> {
        let raw: RawReconciliation = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        raw.validate()?;
        Ok(raw)
    };
    let raw = read().map_err(|e| e.in_file(path))?;

    log::info!(
        "read matching checkpoint for {} molecules across {} files from {}",
        raw.n_molecules(),
        raw.n_files(),
        path.display()
    );
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use super::*;
    use crate::matching::MatchSlot;

    fn scratch(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(format!("confmatch-{}-{name}", process::id()))
    }

    fn sample() -> RawReconciliation {
        RawReconciliation {
            molecule_names: vec!["A".into()],
            ref_conformer_counts: vec![2],
            files: vec!["file0".into(), "file1".into()],
            indices: vec![vec![
                vec![MatchSlot::Identity; 2],
                vec![MatchSlot::NoMatch, MatchSlot::Matched(0)],
            ]],
            energies: vec![vec![vec![Some(-1.0), None], vec![Some(-2.5)]]],
            times: vec![vec![vec![Some(3.0), Some(4.0)], vec![None]]],
        }
    }

    #[test]
    fn missing_values_survive_a_checkpoint() {
        let path = scratch("roundtrip.json");
        save(&path, &sample()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("null"));

        let loaded = load(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(loaded, sample());
    }

    #[test]
    fn malformed_checkpoint_is_rejected() {
        let path = scratch("malformed.json");
        let mut raw = sample();
        raw.ref_conformer_counts = vec![3];
        fs::write(&path, serde_json::to_string(&raw).unwrap()).unwrap();

        let err = load(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        match err {
            Error::File { source, .. } => assert!(matches!(*source, Error::ShapeMismatch(_))),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
