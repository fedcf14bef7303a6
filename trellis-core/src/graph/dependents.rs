//! Dependents Table
//!
//! The table records, for every registered cell, the reactive items that must
//! reevaluate when that cell changes. It only stores ids; the registry owns
//! the cells and items themselves.
//!
//! # Ordering
//!
//! Dependents of a cell are kept in the order they were registered, and so
//! is the list of all items. Both use insertion-ordered sets so that dispatch
//! and `reevaluate_all` are deterministic.

use std::collections::HashMap;

use indexmap::IndexSet;

use super::node::{CellId, ItemId};

/// Id-level dependency graph: cell names, items and cell -> item edges.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Name index used to enforce name uniqueness.
    names: HashMap<String, CellId>,

    /// Reactive items depending on each cell, in registration order.
    dependents: HashMap<CellId, IndexSet<ItemId>>,

    /// Every registered item, in registration order.
    items: IndexSet<ItemId>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell under a name.
    ///
    /// Returns `false` and leaves the graph untouched if the name is taken.
    pub fn add_cell(&mut self, id: CellId, name: &str) -> bool {
        if self.names.contains_key(name) {
            return false;
        }
        self.names.insert(name.to_owned(), id);
        self.dependents.insert(id, IndexSet::new());
        true
    }

    /// Check whether a cell is part of this graph.
    pub fn contains_cell(&self, id: CellId) -> bool {
        self.dependents.contains_key(&id)
    }

    /// Check whether a name is already taken.
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Look up a cell id by name.
    pub fn cell_named(&self, name: &str) -> Option<CellId> {
        self.names.get(name).copied()
    }

    /// Add a reactive item.
    pub fn add_item(&mut self, id: ItemId) {
        self.items.insert(id);
    }

    /// Add a dependency edge: `dependent` reevaluates when `dependency` changes.
    ///
    /// Returns `false` if `dependency` is not a cell of this graph.
    pub fn add_edge(&mut self, dependency: CellId, dependent: ItemId) -> bool {
        match self.dependents.get_mut(&dependency) {
            Some(dependents) => {
                dependents.insert(dependent);
                true
            }
            None => false,
        }
    }

    /// Items depending on a cell, in registration order.
    pub fn dependents_of(&self, cell: CellId) -> impl Iterator<Item = ItemId> + '_ {
        self.dependents
            .get(&cell)
            .into_iter()
            .flat_map(|dependents| dependents.iter().copied())
    }

    /// Add the dependents of `cell` to `into`, keeping first-seen order.
    pub fn collect_dependents(&self, cell: CellId, into: &mut IndexSet<ItemId>) {
        into.extend(self.dependents_of(cell));
    }

    /// All items, in registration order.
    pub fn items(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.items.iter().copied()
    }

    /// Number of dependents a cell has.
    pub fn dependent_count(&self, cell: CellId) -> usize {
        self.dependents.get(&cell).map_or(0, IndexSet::len)
    }

    /// Get the total number of cells in the graph.
    pub fn cell_count(&self) -> usize {
        self.names.len()
    }

    /// Get the total number of items in the graph.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_cells_enforces_unique_names() {
        let mut graph = DependencyGraph::new();

        let a = CellId::new();
        let b = CellId::new();

        assert!(graph.add_cell(a, "A"));
        assert!(!graph.add_cell(b, "A"));

        assert_eq!(graph.cell_count(), 1);
        assert_eq!(graph.cell_named("A"), Some(a));
        assert!(!graph.contains_cell(b));
    }

    #[test]
    fn edges_require_known_cells() {
        let mut graph = DependencyGraph::new();

        let known = CellId::new();
        let unknown = CellId::new();
        let item = ItemId::new();

        graph.add_cell(known, "Known");
        graph.add_item(item);

        assert!(graph.add_edge(known, item));
        assert!(!graph.add_edge(unknown, item));
        assert_eq!(graph.dependent_count(known), 1);
        assert_eq!(graph.dependent_count(unknown), 0);
    }

    #[test]
    fn dependents_keep_registration_order() {
        let mut graph = DependencyGraph::new();

        let cell = CellId::new();
        graph.add_cell(cell, "Cell");

        let items: Vec<_> = (0..5).map(|_| ItemId::new()).collect();
        for item in items.iter().rev() {
            graph.add_item(*item);
            graph.add_edge(cell, *item);
        }

        let expected: Vec<_> = items.iter().rev().copied().collect();
        assert_eq!(graph.dependents_of(cell).collect::<Vec<_>>(), expected);
        assert_eq!(graph.items().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn duplicate_edges_are_collapsed() {
        let mut graph = DependencyGraph::new();

        let cell = CellId::new();
        let item = ItemId::new();
        graph.add_cell(cell, "Cell");
        graph.add_item(item);

        graph.add_edge(cell, item);
        graph.add_edge(cell, item);

        assert_eq!(graph.dependent_count(cell), 1);
    }

    #[test]
    fn collected_dependents_are_deduplicated_in_first_seen_order() {
        let mut graph = DependencyGraph::new();

        let a = CellId::new();
        let b = CellId::new();
        graph.add_cell(a, "A");
        graph.add_cell(b, "B");

        let shared = ItemId::new();
        let only_b = ItemId::new();
        graph.add_item(shared);
        graph.add_item(only_b);

        graph.add_edge(a, shared);
        graph.add_edge(b, only_b);
        graph.add_edge(b, shared);

        let mut combined = IndexSet::new();
        graph.collect_dependents(a, &mut combined);
        graph.collect_dependents(b, &mut combined);

        assert_eq!(combined.into_iter().collect::<Vec<_>>(), vec![shared, only_b]);
    }
}
