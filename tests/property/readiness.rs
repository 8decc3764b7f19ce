use std::collections::HashSet;

use proptest::prelude::*;

use cellfarm::dag::{Cell, DependencyGraph, GridBounds, PendingSet, ReadinessOracle};
use cellfarm::store::CompletionStore;

#[derive(Debug, Default)]
struct SetStore(HashSet<Cell>);

impl CompletionStore for SetStore {
    fn is_done(&self, cell: Cell) -> bool {
        self.0.contains(&cell)
    }
}

fn bounds_strategy() -> impl Strategy<Value = GridBounds> {
    (0u32..=3, 0u32..=3).prop_map(|(a, b)| GridBounds::new(a, b))
}

/// Dependencies written out from the coordinate rule, independent of
/// `DependencyGraph::dependencies_of`.
fn reference_deps(bounds: GridBounds, cell: Cell) -> Vec<Cell> {
    let (a, b, t) = (cell.a(), cell.b(), cell.t());
    let mut candidates = vec![(a + 1, b, t + 2), (a, b + 1, t + 2)];
    if t > 0 {
        candidates.push((a, b, t - 1));
    }
    candidates
        .into_iter()
        .filter_map(|(a, b, t)| bounds.checked_cell(a, b, t))
        .collect()
}

/// Done set reachable by solving cells in some valid order: at each step
/// one of the currently ready cells (picked by `choices`) becomes done.
fn reachable_done_set(graph: &DependencyGraph, choices: &[usize]) -> SetStore {
    let mut store = SetStore::default();
    for choice in choices {
        let ready: Vec<Cell> = {
            let oracle = ReadinessOracle::new(graph, &store);
            graph.cells().filter(|c| oracle.is_ready(*c)).collect()
        };
        if ready.is_empty() {
            break;
        }
        store.0.insert(ready[choice % ready.len()]);
    }
    store
}

proptest! {
    #[test]
    fn ready_iff_not_done_and_all_dependencies_done(
        bounds in bounds_strategy(),
        mask in proptest::collection::vec(any::<bool>(), 200),
    ) {
        let graph = DependencyGraph::new(bounds);
        let store = SetStore(
            graph
                .cells()
                .zip(mask.iter().cycle())
                .filter(|(_, done)| **done)
                .map(|(c, _)| c)
                .collect(),
        );
        let oracle = ReadinessOracle::new(&graph, &store);

        for cell in graph.cells() {
            let expected = !store.is_done(cell)
                && reference_deps(bounds, cell).iter().all(|d| store.is_done(*d));
            prop_assert_eq!(oracle.is_ready(cell), expected, "cell {}", cell);
        }
    }

    #[test]
    fn take_ready_returns_first_ready_in_enumeration_order(
        bounds in bounds_strategy(),
        choices in proptest::collection::vec(any::<usize>(), 0..40),
    ) {
        let graph = DependencyGraph::new(bounds);
        let store = reachable_done_set(&graph, &choices);
        let oracle = ReadinessOracle::new(&graph, &store);

        let mut pending = PendingSet::from_grid(&graph, &store);
        let expected = graph.cells().find(|c| oracle.is_ready(*c));
        prop_assert_eq!(pending.take_ready(&oracle), expected);
    }

    #[test]
    fn resumed_run_completes_and_never_redoes_finished_cells(
        bounds in bounds_strategy(),
        choices in proptest::collection::vec(any::<usize>(), 0..60),
    ) {
        let graph = DependencyGraph::new(bounds);
        let mut store = reachable_done_set(&graph, &choices);
        let already_done = store.0.clone();

        let mut pending = PendingSet::from_grid(&graph, &store);
        prop_assert_eq!(pending.len(), bounds.cell_count() - already_done.len());

        // One machine, each unit succeeding immediately.
        let mut dispatched = Vec::new();
        while !pending.is_empty() {
            let next = {
                let oracle = ReadinessOracle::new(&graph, &store);
                pending.take_ready(&oracle)
            };
            let Some(cell) = next else {
                return Err(TestCaseError::fail(format!("stuck with {} pending cells", pending.len())));
            };
            dispatched.push(cell);
            store.0.insert(cell);
        }

        prop_assert!(graph.cells().all(|c| store.is_done(c)));
        prop_assert!(dispatched.iter().all(|c| !already_done.contains(c)));
        let unique: HashSet<Cell> = dispatched.iter().copied().collect();
        prop_assert_eq!(unique.len(), dispatched.len());
    }
}
