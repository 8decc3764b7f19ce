use std::path::PathBuf;
use std::sync::Arc;

use cellfarm::config::model::{
    ControlSection, GridSection, MachinesSection, RemoteSection, SolverSection, StoreSection,
};
use cellfarm::config::{ConfigFile, RawConfigFile};
use cellfarm::dag::{Cell, DependencyGraph, GridBounds};
use cellfarm::engine::{CoreScheduler, RuntimeOptions, StopSignal};
use cellfarm::fs::mock::MockFileSystem;
use cellfarm::pool::{MachineListFile, MachinePool};
use cellfarm::store::{ArtifactStore, CompletionStore};
use cellfarm::types::FailurePolicy;

use crate::fake_executor::FakeExecutor;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the minimal valid config: store root `/cache`, solver
/// program `solver`, every other section at its defaults.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                grid: GridSection::default(),
                store: StoreSection {
                    root: PathBuf::from("/cache"),
                },
                solver: SolverSection {
                    program: "solver".to_string(),
                    subcommand: "compute-strat-6x".to_string(),
                    remote_program: None,
                },
                machines: MachinesSection::default(),
                control: ControlSection::default(),
                remote: RemoteSection::default(),
            },
        }
    }

    pub fn with_grid(mut self, a_max: u32, b_max: u32) -> Self {
        self.config.grid = GridSection { a_max, b_max };
        self
    }

    pub fn with_store_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.store.root = root.into();
        self
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.config.solver.program = program.to_string();
        self
    }

    pub fn with_poll_ms(mut self, ms: u64) -> Self {
        self.config.control.poll_interval_ms = ms;
        self
    }

    pub fn with_on_failure(mut self, policy: FailurePolicy) -> Self {
        self.config.control.on_failure = policy;
        self
    }

    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.config.control.max_attempts = n;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-memory farm: grid, mock filesystem, store, machine list and stop
/// sentinel wired together the way `cellfarm::run` wires the real ones.
#[derive(Debug, Clone)]
pub struct MockFarm {
    pub fs: MockFileSystem,
    pub store: ArtifactStore,
    pub graph: DependencyGraph,
    machines_file: PathBuf,
    stop_file: PathBuf,
}

impl MockFarm {
    pub fn new(a_max: u32, b_max: u32) -> Self {
        let fs = MockFileSystem::new();
        let store = ArtifactStore::new(Arc::new(fs.clone()), "/cache");
        Self {
            fs,
            store,
            graph: DependencyGraph::new(GridBounds::new(a_max, b_max)),
            machines_file: PathBuf::from("/farm/machines.txt"),
            stop_file: PathBuf::from("/farm/stop"),
        }
    }

    /// Replace the machine list file contents, one machine per line.
    pub fn set_machines(&self, machines: &[&str]) {
        let mut contents = machines.join("\n");
        contents.push('\n');
        self.fs.add_file(&self.machines_file, contents);
    }

    pub fn with_machines(self, machines: &[&str]) -> Self {
        self.set_machines(machines);
        self
    }

    pub fn cell(&self, a: u32, b: u32, t: u32) -> Cell {
        self.graph.bounds().cell(a, b, t).expect("cell inside the farm grid")
    }

    pub fn mark_done(&self, cell: Cell) {
        self.fs.add_file(self.store.scores_path(cell), b"scores".to_vec());
    }

    pub fn is_done(&self, cell: Cell) -> bool {
        self.store.is_done(cell)
    }

    pub fn all_done(&self) -> bool {
        self.graph.cells().all(|c| self.store.is_done(c))
    }

    pub fn request_stop(&self) {
        self.fs.add_file(&self.stop_file, Vec::new());
    }

    pub fn stop_signal(&self) -> StopSignal {
        StopSignal::new(Arc::new(self.fs.clone()), self.stop_file.clone())
    }

    pub fn pool(&self) -> MachinePool {
        MachinePool::new(Box::new(MachineListFile::new(
            Arc::new(self.fs.clone()),
            self.machines_file.clone(),
        )))
    }

    pub fn core(&self, options: RuntimeOptions) -> CoreScheduler {
        CoreScheduler::new(self.graph, Arc::new(self.store.clone()), self.pool(), options)
    }

    pub fn executor(&self) -> FakeExecutor {
        FakeExecutor::new(self.fs.clone(), self.store.clone()).with_graph(self.graph)
    }
}
