use std::io::BufRead;

use nalgebra::Vector3;

use super::SdRecord;
use crate::{
    atom::Atom,
    error::Error,
    molecule::Bond,
    periodic_table::ElementType,
    record::{SdTag, SdTags},
};

type Line = (usize, String);

/// Read every record of a V2000 SD file, in file order.
pub fn read<R: BufRead>(reader: R) -> Result<Vec<SdRecord>, Error> {
    let mut records = Vec::new();
    let mut block: Vec<Line> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let content = line?;
        if content.trim() == "$$$$" {
            if !block.is_empty() {
                records.push(parse_record(&block)?);
                block.clear();
            }
            continue;
        }
        block.push((i + 1, content));
    }

    // a last record without a terminator
    if block.iter().any(|(_, line)| !line.trim().is_empty()) {
        records.push(parse_record(&block)?);
    }

    Ok(records)
}

fn parse_record(lines: &[Line]) -> Result<SdRecord, Error> {
    if lines.len() < 4 {
        return Err(Error::parse(
            lines.first().map(|(ln, _)| *ln).unwrap_or(1),
            "SD record must contain at least a header and counts line",
        ));
    }

    let title = lines[0].1.trim().to_owned();
    let (counts_line_no, counts_line) = (&lines[3].0, &lines[3].1);
    if counts_line.contains("V3000") {
        return Err(Error::parse(*counts_line_no, "V3000 is not supported"));
    }

    let (atom_count, bond_count) = parse_counts(counts_line, *counts_line_no)?;
    let atom_start = 4;
    let bond_start = atom_start + atom_count;
    let bond_end = bond_start + bond_count;

    if lines.len() < bond_end {
        return Err(Error::parse(
            lines.last().map(|(ln, _)| *ln).unwrap_or(*counts_line_no),
            "SD record ended before atoms/bonds were fully specified",
        ));
    }

    let atoms = parse_atoms(&lines[atom_start..bond_start])?;
    let bonds = parse_bonds(&lines[bond_start..bond_end], atom_count)?;
    let tags = parse_tags(&lines[bond_end..])?;

    Ok(SdRecord {
        title,
        atoms,
        bonds,
        tags,
    })
}

fn parse_counts(line: &str, line_no: usize) -> Result<(usize, usize), Error> {
    if !line.is_ascii() {
        return Err(Error::parse(line_no, "counts line contains non-ASCII data"));
    }
    let padded = format!("{line:<6}");
    let atoms = padded[0..3]
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::parse(line_no, "invalid atom count"))?;
    let bonds = padded[3..6]
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::parse(line_no, "invalid bond count"))?;
    Ok((atoms, bonds))
}

fn parse_atoms(lines: &[Line]) -> Result<Vec<Atom>, Error> {
    let mut atoms = Vec::with_capacity(lines.len());
    for (ln, raw) in lines {
        if !raw.is_ascii() {
            return Err(Error::parse(*ln, "atom line contains non-ASCII data"));
        }
        let padded = format!("{raw:<40}");
        let coordinate = |range: std::ops::Range<usize>, axis: &str| {
            padded[range]
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::parse(*ln, format!("invalid {axis} coordinate in atom line")))
        };
        let x = coordinate(0..10, "x")?;
        let y = coordinate(10..20, "y")?;
        let z = coordinate(20..30, "z")?;

        let element = ElementType::from_symbol(&padded[31..34])
            .ok_or_else(|| Error::parse(*ln, "unknown element symbol"))?;
        atoms.push(Atom::new(element, Vector3::new(x, y, z)));
    }
    Ok(atoms)
}

fn parse_bonds(lines: &[Line], atom_count: usize) -> Result<Vec<Bond>, Error> {
    let mut bonds = Vec::with_capacity(lines.len());
    for (ln, raw) in lines {
        let tokens: Vec<_> = raw.split_whitespace().collect();
        if tokens.len() < 3 {
            return Err(Error::parse(*ln, "invalid bond line"));
        }

        let a1 = tokens[0]
            .parse::<usize>()
            .map_err(|_| Error::parse(*ln, "invalid first atom index"))?;
        let a2 = tokens[1]
            .parse::<usize>()
            .map_err(|_| Error::parse(*ln, "invalid second atom index"))?;
        let order = tokens[2]
            .parse::<u8>()
            .map_err(|_| Error::parse(*ln, "invalid bond order value"))?;

        if a1 == 0 || a2 == 0 || a1 > atom_count || a2 > atom_count {
            return Err(Error::parse(
                *ln,
                "bond references atom outside declared range",
            ));
        }

        bonds.push(Bond::new(a1 - 1, a2 - 1, order));
    }
    Ok(bonds)
}

/// Parses the property block and the `> <name>` data items that follow it.
fn parse_tags(lines: &[Line]) -> Result<SdTags, Error> {
    let mut tags = SdTags::new();
    let mut remaining = lines
        .iter()
        .skip_while(|(_, line)| !line.starts_with('>') && line.trim() != "M  END")
        .skip_while(|(_, line)| line.trim() == "M  END")
        .peekable();

    while let Some((ln, header)) = remaining.next() {
        if header.trim().is_empty() {
            continue;
        }
        if !header.starts_with('>') {
            return Err(Error::parse(*ln, "expected a data header starting with '>'"));
        }

        let name = header
            .find('<')
            .zip(header.rfind('>'))
            .filter(|(open, close)| open < close)
            .map(|(open, close)| header[open + 1..close].to_owned())
            .ok_or_else(|| Error::parse(*ln, "data header has no <name>"))?;

        let mut value_lines = Vec::new();
        while let Some((_, line)) = remaining.next_if(|(_, line)| !line.trim().is_empty()) {
            value_lines.push(line.as_str());
        }

        tags.push(SdTag::new(name, value_lines.join("\n")));
    }

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const WATER: &str = "\
water
  confmatch

  3  2  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.1173 O   0  0  0  0  0  0  0  0  0  0  0  0
    0.0000    0.7572   -0.4692 H   0  0  0  0  0  0  0  0  0  0  0  0
    0.0000   -0.7572   -0.4692 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
  1  3  1  0  0  0  0
M  END
> <QM Psi4 Final Opt. Energy (Har) MP2/def2-SV(P)>
-76.0107

> <Original omega conformer number>
1

$$$$
water
  confmatch

  3  2  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.1180 O   0  0  0  0  0  0  0  0  0  0  0  0
    0.0000    0.7500   -0.4700 H   0  0  0  0  0  0  0  0  0  0  0  0
    0.0000   -0.7500   -0.4700 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
  1  3  1  0  0  0  0
M  END
$$$$
";

    #[test]
    fn reads_atoms_bonds_and_tags() {
        let records = read(Cursor::new(WATER)).unwrap();
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "water");
        assert_eq!(first.atoms.len(), 3);
        assert_eq!(first.atoms[0].element_type(), ElementType::O);
        assert!((first.atoms[1].position().y - 0.7572).abs() < 1e-9);
        assert_eq!(first.bonds, vec![Bond::new(0, 1, 1), Bond::new(0, 2, 1)]);

        assert_eq!(first.tags.len(), 2);
        assert_eq!(
            first.tags[0].name,
            "QM Psi4 Final Opt. Energy (Har) MP2/def2-SV(P)"
        );
        assert_eq!(first.tags[0].value, "-76.0107");
        assert_eq!(first.tags[1].value, "1");

        assert!(records[1].tags.is_empty());
    }

    #[test]
    fn rejects_bonds_to_missing_atoms() {
        let broken = WATER.replacen("  1  3  1", "  1  4  1", 1);
        let err = read(Cursor::new(broken)).unwrap_err();
        assert!(matches!(err, Error::Parse { line: 9, .. }), "{err}");
    }

    #[test]
    fn rejects_truncated_records() {
        let err = read(Cursor::new("water\n\n\n  3  2  0\n")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
