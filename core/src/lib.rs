pub mod atom;
pub mod config;
pub mod error;
pub mod io;
pub mod matching;
pub mod molecule;
pub mod periodic_table;
pub mod record;
pub mod reduce;
pub mod report;
pub mod rmsd;
pub mod store;

pub use error::{Error, Result};

use matching::{reshape, CrossFileReconciler, EnergyCube, RawReconciliation, TimeCube};
use reduce::{EnergyReport, TimeReport};
use rmsd::ConformerDistance;
use store::CalculationFile;

/// Match every reference molecule in each query file with the default
/// settings, and arrange the matched energies and runtimes per molecule.
/// File 0 of the result is always `reference`, whether or not `queries`
/// starts with it.
pub fn reconcile_all(
    reference: &CalculationFile,
    queries: &[CalculationFile],
    metric: &impl ConformerDistance,
) -> Result<(EnergyCube, TimeCube, RawReconciliation)> {
    let raw = CrossFileReconciler::default().reconcile(reference, queries, metric)?;
    let (energies, times) = reshape(&raw);
    Ok((energies, times, raw))
}

pub fn reduce_energies(energies: &EnergyCube) -> EnergyReport {
    reduce::energy::reduce(energies)
}

pub fn reduce_times(times: &TimeCube, zero_indices: &[Option<usize>]) -> TimeReport {
    reduce::time::reduce(times, zero_indices)
}

pub mod testing {
    //! Synthetic molecules for tests and benchmarks.

    use nalgebra::{Rotation3, Vector3};

    use crate::{
        atom::Atom,
        molecule::{Bond, Molecule},
        periodic_table::ElementType,
        record::ConformerRecord,
    };

    const CC_BOND: f64 = 1.54;
    const CH_BOND: f64 = 1.09;
    const CH_OFFSETS: [[f64; 3]; 2] = [[0.0, 0.89, 0.63], [0.0, -0.89, 0.63]];

    /// A straight-chain alkane with one conformer per entry of `stretches`. Each
    /// conformer has its carbon-carbon distances scaled by its stretch factor.
    pub fn alkane(title: &str, n_carbons: usize, stretches: &[f64]) -> Molecule {
        assert!(n_carbons > 0, "an alkane needs at least one carbon");

        // two hydrogens per carbon, plus one on either end of the chain
        let mut hydrogens = (0..n_carbons)
            .flat_map(|carbon| CH_OFFSETS.map(|offset| (carbon, Vector3::from(offset))))
            .collect::<Vec<_>>();
        hydrogens.push((0, Vector3::new(-CH_BOND, 0.0, 0.0)));
        hydrogens.push((n_carbons - 1, Vector3::new(CH_BOND, 0.0, 0.0)));

        let elements = std::iter::repeat(ElementType::C)
            .take(n_carbons)
            .chain(std::iter::repeat(ElementType::H).take(hydrogens.len()))
            .collect::<Vec<_>>();
        let bonds = (1..n_carbons)
            .map(|i| Bond::new(i - 1, i, 1))
            .chain(
                hydrogens
                    .iter()
                    .enumerate()
                    .map(|(h, &(carbon, _))| Bond::new(carbon, n_carbons + h, 1)),
            )
            .collect();

        let mut molecule = Molecule::new(title, elements.clone(), bonds);
        for (c, &stretch) in stretches.iter().enumerate() {
            let carbons = (0..n_carbons)
                .map(|i| Vector3::new(i as f64 * CC_BOND * stretch, 0.0, 0.0))
                .collect::<Vec<_>>();
            let positions = carbons
                .iter()
                .copied()
                .chain(hydrogens.iter().map(|&(carbon, offset)| carbons[carbon] + offset));
            let atoms = elements
                .iter()
                .zip(positions)
                .map(|(&element, position)| Atom::new(element, position))
                .collect();

            molecule.push_conformer(
                atoms,
                ConformerRecord {
                    final_energy: Some(-39.5 * n_carbons as f64 + 0.01 * c as f64),
                    runtime: Some(60.0 * n_carbons as f64 * stretch),
                    original_index: Some(c),
                    ..Default::default()
                },
            );
        }

        molecule
    }

    /// The conformers of `molecule` listed in `order`, rigidly moved.
    pub fn transformed(
        molecule: &Molecule,
        order: &[usize],
        rotation: Rotation3<f64>,
        shift: Vector3<f64>,
    ) -> Molecule {
        let mut moved = Molecule::new(
            molecule.title(),
            molecule.elements().to_vec(),
            molecule.bonds().to_vec(),
        );

        for &c in order {
            let conformer = &molecule.conformers()[c];
            let atoms = conformer
                .atoms()
                .iter()
                .map(|atom| Atom::new(atom.element_type(), rotation * atom.position() + shift))
                .collect();
            moved.push_conformer(atoms, conformer.record().clone());
        }

        moved
    }
}
