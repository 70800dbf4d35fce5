//! Enumeration of the atom correspondences between two molecular graphs.
//!
//! For two copies of the same molecule these are its automorphisms: the
//! relabelings that leave elements and bonds intact, e.g. swapping the
//! hydrogens of a methyl group.

use std::collections::VecDeque;

use crate::periodic_table::ElementType;

/// Graph view of a molecule: atom labels and neighbour lists.
pub(crate) struct Graph<'a> {
    pub(crate) elements: &'a [ElementType],
    pub(crate) adjacency: Vec<Vec<usize>>,
}

impl Graph<'_> {
    fn n_atoms(&self) -> usize {
        self.elements.len()
    }

    fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    fn bonded(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].contains(&b)
    }

    /// Atoms in breadth-first order, so that every atom after the first of its
    /// component has an already visited neighbour.
    fn search_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.n_atoms());
        let mut visited = vec![false; self.n_atoms()];

        for root in 0..self.n_atoms() {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut queue = VecDeque::from([root]);
            while let Some(atom) = queue.pop_front() {
                order.push(atom);
                for &neighbour in &self.adjacency[atom] {
                    if !visited[neighbour] {
                        visited[neighbour] = true;
                        queue.push_back(neighbour);
                    }
                }
            }
        }

        order
    }
}

/// All bijections `mapping[reference atom] = query atom` that preserve elements
/// and bonds, up to `limit` of them.
pub(crate) fn isomorphisms(reference: &Graph, query: &Graph, limit: usize) -> Vec<Vec<usize>> {
    let mut found = Vec::new();
    if reference.n_atoms() != query.n_atoms() || limit == 0 {
        return found;
    }

    let mut sorted_ref = reference.elements.to_vec();
    let mut sorted_query = query.elements.to_vec();
    sorted_ref.sort_unstable();
    sorted_query.sort_unstable();
    if sorted_ref != sorted_query {
        return found;
    }

    let mut search = Search {
        reference,
        query,
        order: reference.search_order(),
        mapping: vec![usize::MAX; reference.n_atoms()],
        used: vec![false; query.n_atoms()],
        limit,
        found: &mut found,
    };
    search.extend(0);

    if found.len() == limit {
        log::debug!("stopped enumerating atom mappings after {limit}");
    }
    found
}

struct Search<'a, 'g> {
    reference: &'a Graph<'g>,
    query: &'a Graph<'g>,
    order: Vec<usize>,
    mapping: Vec<usize>,
    used: Vec<bool>,
    limit: usize,
    found: &'a mut Vec<Vec<usize>>,
}

impl Search<'_, '_> {
    fn extend(&mut self, depth: usize) {
        if self.found.len() >= self.limit {
            return;
        }
        if depth == self.order.len() {
            self.found.push(self.mapping.clone());
            return;
        }

        let atom = self.order[depth];
        for candidate in 0..self.query.n_atoms() {
            if self.used[candidate] || !self.compatible(atom, candidate) {
                continue;
            }

            self.mapping[atom] = candidate;
            self.used[candidate] = true;
            self.extend(depth + 1);
            self.used[candidate] = false;
            self.mapping[atom] = usize::MAX;

            if self.found.len() >= self.limit {
                return;
            }
        }
    }

    fn compatible(&self, atom: usize, candidate: usize) -> bool {
        if self.reference.elements[atom] != self.query.elements[candidate]
            || self.reference.degree(atom) != self.query.degree(candidate)
        {
            return false;
        }

        // every bond to an already placed atom must exist on both sides
        let mut mapped_neighbours = 0;
        for &neighbour in &self.reference.adjacency[atom] {
            let image = self.mapping[neighbour];
            if image == usize::MAX {
                continue;
            }
            if !self.query.bonded(candidate, image) {
                return false;
            }
            mapped_neighbours += 1;
        }

        let used_neighbours = self.query.adjacency[candidate]
            .iter()
            .filter(|&&neighbour| self.used[neighbour])
            .count();

        mapped_neighbours == used_neighbours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::periodic_table::ElementType::{C, H, O};

    fn graph<'a>(elements: &'a [ElementType], bonds: &[(usize, usize)]) -> Graph<'a> {
        let mut adjacency = vec![Vec::new(); elements.len()];
        for &(i, j) in bonds {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
        Graph {
            elements,
            adjacency,
        }
    }

    #[test]
    fn methanol_has_six_automorphisms() {
        // C, O, H(O), and three methyl hydrogens
        let elements = [C, O, H, H, H, H];
        let bonds = [(0, 1), (1, 2), (0, 3), (0, 4), (0, 5)];
        let methanol = graph(&elements, &bonds);

        let mappings = isomorphisms(&methanol, &methanol, 100);
        assert_eq!(mappings.len(), 6);
        for mapping in &mappings {
            assert_eq!(&mapping[..3], &[0, 1, 2]);
        }
    }

    #[test]
    fn relabeled_graph_is_matched() {
        let water = [O, H, H];
        let reordered = [H, O, H];
        let mappings = isomorphisms(
            &graph(&water, &[(0, 1), (0, 2)]),
            &graph(&reordered, &[(1, 0), (1, 2)]),
            10,
        );

        assert_eq!(mappings.len(), 2);
        assert!(mappings.iter().all(|mapping| mapping[0] == 1));
    }

    #[test]
    fn different_connectivity_has_no_mapping() {
        // ethanol vs. dimethyl ether heavy-atom skeletons
        let elements = [C, C, O];
        let ethanol = graph(&elements, &[(0, 1), (1, 2)]);
        let ether = graph(&elements, &[(0, 2), (1, 2)]);
        assert!(isomorphisms(&ethanol, &ether, 10).is_empty());
    }

    #[test]
    fn enumeration_respects_limit() {
        let elements = [C, H, H, H, H];
        let methane = graph(&elements, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
        assert_eq!(isomorphisms(&methane, &methane, 5).len(), 5);
        assert_eq!(isomorphisms(&methane, &methane, 100).len(), 24);
    }
}
