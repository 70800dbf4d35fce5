//! Plain-text reports of relative energies and runtimes, one file per molecule.

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    reduce::{FileTimes, MoleculeEnergies, MoleculeTimes},
};

/// Path of the report for `title` in `dir`.
pub fn report_path(dir: impl AsRef<Path>, title: &str) -> PathBuf {
    dir.as_ref().join(format!("relene_{title}.dat"))
}

/// Write `relene_{title}.dat`: a legend of the levels of theory, the RMS
/// errors, and one row of relative energies per reference conformer.
pub fn write_relative_energies(
    dir: impl AsRef<Path>,
    molecule: &MoleculeEnergies,
    theories: &[String],
) -> Result<PathBuf> {
    let path = report_path(dir, &molecule.title);
    let write = || -> Result<()> {
        let mut writer = BufWriter::new(File::create(&path)?);
        format_relative_energies(&mut writer, molecule, theories)?;
        writer.flush()?;
        Ok(())
    };
    write().map_err(|e| e.in_file(&path))?;

    log::info!("wrote relative energies of {} to {}", molecule.title, path.display());
    Ok(path)
}

/// Append the runtime rows to a report written by [`write_relative_energies`].
pub fn append_times(dir: impl AsRef<Path>, times: &MoleculeTimes) -> Result<()> {
    let path = report_path(dir, &times.title);
    if !path.is_file() {
        return Err(Error::MissingFile(path));
    }

    let append = || -> Result<()> {
        let mut writer = BufWriter::new(OpenOptions::new().append(true).open(&path)?);
        format_times(&mut writer, times)?;
        writer.flush()?;
        Ok(())
    };
    append().map_err(|e| e.in_file(&path))
}

pub fn format_relative_energies(
    writer: &mut impl Write,
    molecule: &MoleculeEnergies,
    theories: &[String],
) -> std::io::Result<()> {
    let zero = molecule
        .zero_index
        .map_or_else(|| "none".to_owned(), |zero| zero.to_string());

    writeln!(writer, "# Molecule {}", molecule.title)?;
    writeln!(
        writer,
        "# Energies (kcal/mol) for each matched conformer relative to conformer {zero} across each column."
    )?;
    writeln!(
        writer,
        "# Rows represent conformers of this molecule; columns represent some calculations from a particular file."
    )?;
    write!(
        writer,
        "# Columns are ordered by conformer index, then the following levels of theory:"
    )?;
    for (i, theory) in theories.iter().enumerate() {
        write!(writer, "\n# {} {theory}", i + 1)?;
    }

    write!(
        writer,
        "\n\n# RMS errors by level of theory, with respect to the first level of theory listed:\n# "
    )?;
    for &rms in &molecule.rms_errors {
        write!(writer, "\t{}", fixed(rms))?;
    }
    write!(writer, "\n\n# ")?;
    for i in 0..theories.len() {
        write!(writer, "\t{}", i + 1)?;
    }

    let n_conformers = molecule.relative.first().map_or(0, Vec::len);
    for k in 0..n_conformers {
        let row = molecule
            .relative
            .iter()
            .map(|file| fixed(file[k]))
            .collect::<Vec<_>>();
        write!(writer, "\n{k}\t{}", row.join("\t"))?;
    }

    Ok(())
}

pub fn format_times(writer: &mut impl Write, times: &MoleculeTimes) -> std::io::Result<()> {
    write!(
        writer,
        "\n\n# Four rows: (1) avg times, (2) time stdevs, (3) avg time ratios wrt ref method, (4) stdevs of time ratios:"
    )?;

    let rows: [fn(&FileTimes) -> f64; 4] = [
        |file| file.mean,
        |file| file.std,
        |file| file.mean_ratio,
        |file| file.std_ratio,
    ];
    for field in rows {
        write!(writer, "\n# ")?;
        for file in &times.files {
            write!(writer, " {}", fixed(field(file)))?;
        }
    }

    Ok(())
}

fn fixed(value: f64) -> String {
    if value.is_nan() {
        "nan".to_owned()
    } else {
        format!("{value:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn molecule() -> MoleculeEnergies {
        MoleculeEnergies {
            title: "A".into(),
            zero_index: Some(1),
            relative: vec![vec![1.25, 0.0, 3.5], vec![1.5, 0.0, f64::NAN]],
            rms_errors: vec![0.0, 0.25],
            missing: vec![0, 1],
        }
    }

    #[test]
    fn relative_energy_table() {
        let mut out = Vec::new();
        let theories = ["MP2/def2-SV(P)".to_owned(), "HF/STO-3G".to_owned()];
        format_relative_energies(&mut out, &molecule(), &theories).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();

        assert_eq!(lines[0], "# Molecule A");
        assert!(lines[1].contains("relative to conformer 1"));
        assert_eq!(lines[4], "# 1 MP2/def2-SV(P)");
        assert_eq!(lines[5], "# 2 HF/STO-3G");
        assert_eq!(lines[8], "# \t0.0000\t0.2500");
        assert_eq!(lines[10], "# \t1\t2");
        assert_eq!(lines[11], "0\t1.2500\t1.5000");
        assert_eq!(lines[13], "2\t3.5000\tnan");
        assert_eq!(lines.len(), 14);
    }

    #[test]
    fn time_rows() {
        let times = MoleculeTimes {
            title: "A".into(),
            files: vec![FileTimes {
                mean: 12.0,
                std: 1.5,
                mean_ratio: 1.0,
                std_ratio: f64::NAN,
            }],
        };

        let mut out = Vec::new();
        format_times(&mut out, &times).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().collect::<Vec<_>>();

        assert!(lines[2].starts_with("# Four rows"));
        assert_eq!(&lines[3..], ["#  12.0000", "#  1.5000", "#  1.0000", "#  nan"]);
    }
}
