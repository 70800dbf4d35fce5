use serde::{Deserialize, Serialize};

use crate::{atom::Atom, periodic_table::ElementType, record::ConformerRecord};

/// A bond between two atoms, by 0-based atom index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bond {
    pub i: usize,
    pub j: usize,
    pub order: u8,
}

impl Bond {
    pub fn new(i: usize, j: usize, order: u8) -> Self {
        Self { i, j, order }
    }
}

/// One optimized geometry of a molecule, along with its recorded results.
#[derive(Clone, Debug)]
pub struct Conformer {
    pub(crate) index: usize,
    pub(crate) atoms: Vec<Atom>,
    pub(crate) record: ConformerRecord,
}

impl Conformer {
    pub fn new(index: usize, atoms: Vec<Atom>, record: ConformerRecord) -> Self {
        Self {
            index,
            atoms,
            record,
        }
    }

    /// Position of this conformer within its molecule.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The conformer's index in the geometry-generation step if it was recorded,
    /// otherwise its position.
    pub fn original_index(&self) -> usize {
        self.record.original_index.unwrap_or(self.index)
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn record(&self) -> &ConformerRecord {
        &self.record
    }
}

/// Represents a molecule and all of its conformers. Every conformer shares
/// the molecule's atom ordering and bonds.
#[derive(Clone, Debug)]
pub struct Molecule {
    pub(crate) title: String,
    pub(crate) elements: Vec<ElementType>,
    pub(crate) bonds: Vec<Bond>,
    pub(crate) conformers: Vec<Conformer>,
}

impl Molecule {
    pub fn new(title: impl Into<String>, elements: Vec<ElementType>, bonds: Vec<Bond>) -> Self {
        Self {
            title: title.into(),
            elements,
            bonds,
            conformers: Vec::new(),
        }
    }

    /// Append a conformer, taking the next position index.
    ///
    /// Panics if the conformer's elements differ from the molecule's.
    pub fn push_conformer(&mut self, atoms: Vec<Atom>, record: ConformerRecord) {
        assert!(
            atoms
                .iter()
                .map(Atom::element_type)
                .eq(self.elements.iter().copied()),
            "conformer atoms do not match the topology of {}",
            self.title
        );

        let index = self.conformers.len();
        self.conformers.push(Conformer::new(index, atoms, record));
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn elements(&self) -> &[ElementType] {
        &self.elements
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn conformers(&self) -> &[Conformer] {
        &self.conformers
    }

    pub fn n_conformers(&self) -> usize {
        self.conformers.len()
    }

    pub fn n_atoms(&self) -> usize {
        self.elements.len()
    }

    /// Neighbour lists, indexed by atom.
    pub fn adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.n_atoms()];
        for &Bond { i, j, .. } in &self.bonds {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
        adjacency
    }

    /// Whether two molecules have the same atoms and bonds, in the same order.
    pub fn same_topology(&self, elements: &[ElementType], bonds: &[Bond]) -> bool {
        self.elements == elements && self.bonds == bonds
    }
}
