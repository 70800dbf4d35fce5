use std::io::Write;

use super::SdRecord;
use crate::{error::Error, molecule::Molecule, record::LevelOfTheory};

pub fn write<W: Write>(mut writer: W, record: &SdRecord) -> Result<(), Error> {
    writeln!(writer, "{}", record.title)?;
    writeln!(writer, "  confmatch")?;
    writeln!(writer)?;
    writeln!(
        writer,
        "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
        record.atoms.len(),
        record.bonds.len()
    )?;

    for atom in &record.atoms {
        let position = atom.position();
        writeln!(
            writer,
            "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
            position.x,
            position.y,
            position.z,
            atom.element_type().symbol()
        )?;
    }

    for bond in &record.bonds {
        writeln!(
            writer,
            "{:>3}{:>3}{:>3}  0  0  0  0",
            bond.i + 1,
            bond.j + 1,
            bond.order
        )?;
    }

    writeln!(writer, "M  END")?;
    for tag in &record.tags {
        writeln!(writer, "> <{}>", tag.name)?;
        writeln!(writer, "{}", tag.value)?;
        writeln!(writer)?;
    }
    writeln!(writer, "$$$$")?;
    Ok(())
}

/// Write every conformer of a molecule as its own record, tagged with its
/// results at the given level of theory.
pub fn write_molecule<W: Write>(
    mut writer: W,
    molecule: &Molecule,
    theory: &LevelOfTheory,
) -> Result<(), Error> {
    for conformer in molecule.conformers() {
        let record = SdRecord {
            title: molecule.title().to_owned(),
            atoms: conformer.atoms().to_vec(),
            bonds: molecule.bonds().to_vec(),
            tags: conformer.record().to_tags(theory),
        };
        write(&mut writer, &record)?;
    }
    Ok(())
}
