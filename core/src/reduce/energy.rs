use itertools::izip;
use serde::Serialize;

use super::stats::nan_mean;
use crate::matching::EnergyCube;

pub const HARTREE_TO_KCAL: f64 = 627.5095;

/// Relative conformer energies of one molecule at every level of theory.
#[derive(Clone, Debug, Serialize)]
pub struct MoleculeEnergies {
    pub title: String,
    /// reference conformer that every file's energies are taken relative to
    pub zero_index: Option<usize>,
    /// `relative[f][k]` in kcal/mol
    pub relative: Vec<Vec<f64>>,
    /// RMS deviation of each file's relative energies from the reference file's
    pub rms_errors: Vec<f64>,
    /// number of conformers without an energy, per file
    pub missing: Vec<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EnergyReport {
    pub files: Vec<String>,
    pub molecules: Vec<MoleculeEnergies>,
}

impl EnergyReport {
    pub fn zero_indices(&self) -> Vec<Option<usize>> {
        self.molecules
            .iter()
            .map(|molecule| molecule.zero_index)
            .collect()
    }
}

pub fn reduce(cube: &EnergyCube) -> EnergyReport {
    let molecules = cube
        .molecule_names
        .iter()
        .enumerate()
        .map(|(m, title)| {
            let energies = cube.molecule(m);
            let zero_index = zero_index(energies);
            let Some(zero) = zero_index else {
                log::warn!("{title}: no reference conformers, skipping relative energies");
                return MoleculeEnergies {
                    title: title.clone(),
                    zero_index,
                    relative: vec![Vec::new(); energies.len()],
                    rms_errors: vec![f64::NAN; energies.len()],
                    missing: cube.missing_per_file(m),
                };
            };

            let relative = relative_energies(energies, zero);
            let rms_errors = relative
                .iter()
                .map(|row| rms_error(&relative[0], row, zero))
                .collect();
            log::debug!("{title}: energies relative to reference conformer {zero}");

            MoleculeEnergies {
                title: title.clone(),
                zero_index,
                relative,
                rms_errors,
                missing: cube.missing_per_file(m),
            }
        })
        .collect();

    EnergyReport {
        files: cube.files.clone(),
        molecules,
    }
}

/// The reference conformer with the fewest missing energies across files.
/// Ties go to the lowest reference-file energy, or to the first tied conformer
/// when none of those energies is known.
///
/// When even the best conformer misses as many energies as there are
/// reference conformers, the first conformer with that count is taken as is.
pub fn zero_index(energies: &[Vec<f64>]) -> Option<usize> {
    let reference = energies.first()?;
    let nan_counts = (0..reference.len())
        .map(|k| energies.iter().filter(|row| row[k].is_nan()).count())
        .collect::<Vec<_>>();
    let fewest = *nan_counts.iter().min()?;
    if fewest >= reference.len() {
        return nan_counts.iter().position(|&count| count == fewest);
    }

    let tied = nan_counts
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count == fewest)
        .map(|(k, _)| k)
        .collect::<Vec<_>>();

    let lowest = tied
        .iter()
        .copied()
        .filter(|&k| !reference[k].is_nan())
        .fold(None, |best: Option<usize>, k| match best {
            Some(b) if reference[b] <= reference[k] => best,
            _ => Some(k),
        });

    lowest.or(tied.first().copied())
}

/// Energies of every file relative to its own energy at `zero`, in kcal/mol.
pub fn relative_energies(energies: &[Vec<f64>], zero: usize) -> Vec<Vec<f64>> {
    energies
        .iter()
        .map(|row| {
            row.iter()
                .map(|energy| HARTREE_TO_KCAL * (energy - row[zero]))
                .collect()
        })
        .collect()
}

/// Root mean square of `relative - reference` over all conformers except the
/// zero conformer, skipping NaN differences.
pub fn rms_error(reference: &[f64], relative: &[f64], zero: usize) -> f64 {
    let squares = izip!(0.., reference, relative)
        .filter(|&(k, _, _)| k != zero)
        .map(|(_, r, q)| (q - r).powi(2));
    nan_mean(squares).sqrt()
}
