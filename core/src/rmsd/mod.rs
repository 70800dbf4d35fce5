//! Structural distance between conformers.

mod kabsch;
mod mapping;

pub use kabsch::{in_place_rmsd, superposed_rmsd};

use nalgebra::{DMatrix, Vector3};

use crate::molecule::Molecule;
use mapping::Graph;

/// Pairwise structural distance between the conformers of two molecules.
pub trait ConformerDistance: Sync {
    /// Returns a (reference conformers x query conformers) matrix of distances in Å.
    fn distance_matrix(&self, reference: &Molecule, query: &Molecule) -> DMatrix<f64>;
}

impl<F> ConformerDistance for F
where
    F: Fn(&Molecule, &Molecule) -> DMatrix<f64> + Sync,
{
    fn distance_matrix(&self, reference: &Molecule, query: &Molecule) -> DMatrix<f64> {
        self(reference, query)
    }
}

/// Symmetry-aware RMSD between conformers of the same molecular graph.
#[derive(Clone, Debug)]
pub struct SymmetricRmsd {
    /// minimize over all element- and bond-preserving atom relabelings
    pub automorph: bool,
    /// ignore hydrogen atoms
    pub heavy_only: bool,
    /// superpose the conformers before measuring
    pub overlay: bool,
    /// upper bound on the number of relabelings tried
    pub max_mappings: usize,
}

impl Default for SymmetricRmsd {
    fn default() -> Self {
        Self {
            automorph: true,
            heavy_only: false,
            overlay: true,
            max_mappings: 10_000,
        }
    }
}

impl SymmetricRmsd {
    fn selected_atoms(&self, molecule: &Molecule) -> Vec<usize> {
        molecule
            .elements()
            .iter()
            .enumerate()
            .filter(|(_, element)| !(self.heavy_only && element.is_hydrogen()))
            .map(|(i, _)| i)
            .collect()
    }

    fn mappings(&self, reference: &Molecule, query: &Molecule) -> Vec<Vec<usize>> {
        let ref_atoms = self.selected_atoms(reference);
        let query_atoms = self.selected_atoms(query);

        let ref_elements = ref_atoms
            .iter()
            .map(|&i| reference.elements()[i])
            .collect::<Vec<_>>();
        let query_elements = query_atoms
            .iter()
            .map(|&i| query.elements()[i])
            .collect::<Vec<_>>();

        if !self.automorph {
            let same_bonds = reference.bonds() == query.bonds();
            return if ref_elements == query_elements && same_bonds {
                vec![(0..ref_atoms.len()).collect()]
            } else {
                Vec::new()
            };
        }

        let ref_graph = Graph {
            elements: &ref_elements,
            adjacency: induced_adjacency(reference, &ref_atoms),
        };
        let query_graph = Graph {
            elements: &query_elements,
            adjacency: induced_adjacency(query, &query_atoms),
        };

        mapping::isomorphisms(&ref_graph, &query_graph, self.max_mappings)
    }
}

impl ConformerDistance for SymmetricRmsd {
    fn distance_matrix(&self, reference: &Molecule, query: &Molecule) -> DMatrix<f64> {
        let mappings = self.mappings(reference, query);
        if mappings.is_empty() {
            log::warn!(
                "{}: reference and query structures have different connectivity",
                reference.title()
            );
            return DMatrix::from_element(
                reference.n_conformers(),
                query.n_conformers(),
                f64::INFINITY,
            );
        }

        let ref_atoms = self.selected_atoms(reference);
        let query_atoms = self.selected_atoms(query);
        let coordinates = |molecule: &Molecule, atoms: &[usize]| {
            molecule
                .conformers()
                .iter()
                .map(|conformer| {
                    atoms
                        .iter()
                        .map(|&i| *conformer.atoms()[i].position())
                        .collect::<Vec<Vector3<f64>>>()
                })
                .collect::<Vec<_>>()
        };
        let ref_coords = coordinates(reference, &ref_atoms);
        let query_coords = coordinates(query, &query_atoms);

        let mut mobile = vec![Vector3::zeros(); ref_atoms.len()];
        DMatrix::from_fn(reference.n_conformers(), query.n_conformers(), |r, q| {
            let mut best = f64::INFINITY;
            for mapping in &mappings {
                for (slot, &image) in mobile.iter_mut().zip(mapping) {
                    *slot = query_coords[q][image];
                }
                let rmsd = if self.overlay {
                    superposed_rmsd(&ref_coords[r], &mobile)
                } else {
                    in_place_rmsd(&ref_coords[r], &mobile)
                };
                best = best.min(rmsd);
            }
            best
        })
    }
}

/// Neighbour lists of the subgraph induced by `atoms`, in the subgraph's own indices.
fn induced_adjacency(molecule: &Molecule, atoms: &[usize]) -> Vec<Vec<usize>> {
    let mut position = vec![None; molecule.n_atoms()];
    for (new, &old) in atoms.iter().enumerate() {
        position[old] = Some(new);
    }

    let mut full = molecule.adjacency();
    atoms
        .iter()
        .map(|&old| {
            std::mem::take(&mut full[old])
                .into_iter()
                .filter_map(|neighbour| position[neighbour])
                .collect()
        })
        .collect()
}
