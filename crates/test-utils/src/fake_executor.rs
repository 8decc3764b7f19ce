use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cellfarm::dag::{Cell, DependencyGraph};
use cellfarm::exec::{ExecutorBackend, UnitHandle, UnitOutcome, UnitStep};
use cellfarm::fs::mock::MockFileSystem;
use cellfarm::pool::Machine;
use cellfarm::store::{ArtifactStore, CompletionStore};

/// One `spawn_unit` call as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub cell: Cell,
    pub machine: Machine,
}

/// A fake executor that:
/// - records every dispatch in order
/// - sleeps for `delay`, then writes the cell's artifacts into the mock
///   store (or reports a failure for cells marked as failing)
/// - flags it if a machine is handed a second unit while its first is still
///   running, or (given a graph) if a cell is dispatched before all its
///   dependencies are done
///
/// Clones share all state, so a test can keep one clone for assertions and
/// move another into the runtime.
#[derive(Debug, Clone)]
pub struct FakeExecutor {
    fs: MockFileSystem,
    store: ArtifactStore,
    delay: Duration,
    failing: Arc<HashSet<Cell>>,
    graph: Option<DependencyGraph>,
    log: Arc<Mutex<Vec<Dispatched>>>,
    active: Arc<Mutex<HashSet<Machine>>>,
    double_booked: Arc<AtomicBool>,
    premature: Arc<AtomicBool>,
}

impl FakeExecutor {
    pub fn new(fs: MockFileSystem, store: ArtifactStore) -> Self {
        Self {
            fs,
            store,
            delay: Duration::from_millis(5),
            failing: Arc::new(HashSet::new()),
            graph: None,
            log: Arc::new(Mutex::new(Vec::new())),
            active: Arc::new(Mutex::new(HashSet::new())),
            double_booked: Arc::new(AtomicBool::new(false)),
            premature: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn failing(mut self, cells: impl IntoIterator<Item = Cell>) -> Self {
        self.failing = Arc::new(cells.into_iter().collect());
        self
    }

    pub fn dispatched(&self) -> Vec<Dispatched> {
        self.log.lock().unwrap().clone()
    }

    pub fn dispatched_cells(&self) -> Vec<Cell> {
        self.dispatched().into_iter().map(|d| d.cell).collect()
    }

    pub fn double_booked(&self) -> bool {
        self.double_booked.load(Ordering::SeqCst)
    }

    /// Whether any cell was dispatched with a dependency still missing.
    pub fn dispatched_early(&self) -> bool {
        self.premature.load(Ordering::SeqCst)
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_unit(&mut self, cell: Cell, machine: Machine) -> UnitHandle {
        self.log.lock().unwrap().push(Dispatched {
            cell,
            machine: machine.clone(),
        });
        if !self.active.lock().unwrap().insert(machine.clone()) {
            self.double_booked.store(true, Ordering::SeqCst);
        }
        if let Some(graph) = &self.graph {
            let ready = graph
                .dependencies_of(cell)
                .into_iter()
                .all(|dep| self.store.is_done(dep));
            if !ready || self.store.is_done(cell) {
                self.premature.store(true, Ordering::SeqCst);
            }
        }

        let fs = self.fs.clone();
        let scores = self.store.scores_path(cell);
        let strats = self.store.strats_path(cell);
        let delay = self.delay;
        let fails = self.failing.contains(&cell);
        let active = Arc::clone(&self.active);

        UnitHandle::spawn(async move {
            tokio::time::sleep(delay).await;
            let outcome = if fails {
                UnitOutcome::Failed {
                    step: UnitStep::LocalSolve,
                    code: Some(1),
                }
            } else {
                fs.add_file(strats, b"strats".to_vec());
                fs.add_file(scores, b"scores".to_vec());
                UnitOutcome::Success
            };
            active.lock().unwrap().remove(&machine);
            outcome
        })
    }
}
