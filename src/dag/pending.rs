// src/dag/pending.rs

use tracing::debug;

use crate::dag::readiness::ReadinessOracle;
use crate::dag::{Cell, DependencyGraph};
use crate::store::CompletionStore;

/// Cells known not to be done at startup and not yet dispatched, kept in
/// enumeration order.
///
/// Scans are linear. The grid holds a few thousand cells at most and a scan
/// only happens when a machine is free or while waiting, so an index would
/// buy little. Order matters: the first ready cell in enumeration order is
/// always the one handed out.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    cells: Vec<Cell>,
}

impl PendingSet {
    /// Enumerate the whole grid and keep every cell without a completion
    /// marker.
    pub fn from_grid<S: CompletionStore + ?Sized>(graph: &DependencyGraph, store: &S) -> Self {
        let cells: Vec<Cell> = graph.cells().filter(|c| !store.is_done(*c)).collect();
        debug!(
            total = graph.bounds().cell_count(),
            pending = cells.len(),
            "built pending set"
        );
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Remove and return the first ready cell, if any.
    pub fn take_ready<S: CompletionStore + ?Sized>(
        &mut self,
        oracle: &ReadinessOracle<'_, S>,
    ) -> Option<Cell> {
        let idx = self.cells.iter().position(|c| oracle.is_ready(*c))?;
        Some(self.cells.remove(idx))
    }

    /// Whether [`PendingSet::take_ready`] would return a cell right now.
    pub fn has_ready<S: CompletionStore + ?Sized>(&self, oracle: &ReadinessOracle<'_, S>) -> bool {
        self.cells.iter().any(|c| oracle.is_ready(*c))
    }

    /// Put a cell back at its enumeration position. No-op if it is already
    /// pending.
    pub fn restore(&mut self, cell: Cell) {
        match self
            .cells
            .binary_search_by_key(&cell.enumeration_key(), |c| c.enumeration_key())
        {
            Ok(_) => {}
            Err(idx) => self.cells.insert(idx, cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;
    use crate::dag::GridBounds;

    #[derive(Debug, Default)]
    struct SetStore(Mutex<HashSet<Cell>>);

    impl CompletionStore for SetStore {
        fn is_done(&self, cell: Cell) -> bool {
            self.0.lock().unwrap().contains(&cell)
        }
    }

    fn setup() -> (DependencyGraph, SetStore) {
        (DependencyGraph::new(GridBounds::new(1, 1)), SetStore::default())
    }

    #[test]
    fn from_grid_skips_done_cells() {
        let (graph, store) = setup();
        let done = graph.bounds().cell(1, 1, 0).unwrap();
        store.0.lock().unwrap().insert(done);

        let pending = PendingSet::from_grid(&graph, &store);
        assert_eq!(pending.len(), graph.bounds().cell_count() - 1);
        assert!(!pending.contains(done));
    }

    #[test]
    fn take_ready_returns_first_ready_and_removes_it() {
        let (graph, store) = setup();
        let mut pending = PendingSet::from_grid(&graph, &store);
        let oracle = ReadinessOracle::new(&graph, &store);

        let first = pending.take_ready(&oracle).unwrap();
        assert_eq!(first, graph.bounds().cell(1, 1, 0).unwrap());
        assert!(!pending.contains(first));

        // (1,1,1) waits on (1,1,0), which is dispatched but not done.
        assert!(!pending.has_ready(&oracle));
        assert_eq!(pending.take_ready(&oracle), None);

        store.0.lock().unwrap().insert(first);
        assert!(pending.has_ready(&oracle));
        assert_eq!(pending.take_ready(&oracle), graph.bounds().cell(1, 1, 1).ok());
    }

    #[test]
    fn restore_keeps_enumeration_order() {
        let (graph, store) = setup();
        let mut pending = PendingSet::from_grid(&graph, &store);
        let oracle = ReadinessOracle::new(&graph, &store);

        let first = pending.take_ready(&oracle).unwrap();
        pending.restore(first);
        pending.restore(first);

        let all: Vec<Cell> = graph.cells().collect();
        assert_eq!(pending.iter().copied().collect::<Vec<_>>(), all);
    }
}
