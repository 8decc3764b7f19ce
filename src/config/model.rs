// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::dag::GridBounds;
use crate::types::{FailurePolicy, OnExit};

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [grid]
/// a_max = 6
/// b_max = 14
///
/// [store]
/// root = "/scratch/me/cache/6x"
///
/// [solver]
/// program = "~/yatzy_solver/solver"
///
/// [machines]
/// file = "distributed/machines.txt"
/// ```
///
/// Only `[store]` and `[solver]` are required; every other section has
/// defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub grid: GridSection,

    pub store: StoreSection,

    pub solver: SolverSection,

    #[serde(default)]
    pub machines: MachinesSection,

    #[serde(default)]
    pub control: ControlSection,

    #[serde(default)]
    pub remote: RemoteSection,
}

/// `[grid]` section: upper bounds of the cell lattice.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridSection {
    #[serde(default = "default_a_max")]
    pub a_max: u32,
    #[serde(default = "default_b_max")]
    pub b_max: u32,
}

fn default_a_max() -> u32 {
    6
}

fn default_b_max() -> u32 {
    14
}

impl Default for GridSection {
    fn default() -> Self {
        Self {
            a_max: default_a_max(),
            b_max: default_b_max(),
        }
    }
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Local store root holding `scores/` and `strats/`.
    pub root: PathBuf,
}

/// `[solver]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverSection {
    pub program: String,

    #[serde(default = "default_subcommand")]
    pub subcommand: String,

    /// Solver path on remote machines; falls back to `program`.
    #[serde(default)]
    pub remote_program: Option<String>,
}

fn default_subcommand() -> String {
    "compute-strat-6x".to_string()
}

/// `[machines]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachinesSection {
    /// Machine list, re-read before every dispatch.
    #[serde(default = "default_machines_file")]
    pub file: PathBuf,
}

fn default_machines_file() -> PathBuf {
    PathBuf::from("distributed/machines.txt")
}

impl Default for MachinesSection {
    fn default() -> Self {
        Self {
            file: default_machines_file(),
        }
    }
}

/// `[control]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlSection {
    /// Creating this file stops further dispatches.
    #[serde(default = "default_stop_file")]
    pub stop_file: PathBuf,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default)]
    pub on_exit: OnExit,

    #[serde(default)]
    pub on_failure: FailurePolicy,

    /// Dispatches per cell per run under `on_failure = "requeue"`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_stop_file() -> PathBuf {
    PathBuf::from("distributed/stop")
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            stop_file: default_stop_file(),
            poll_interval_ms: default_poll_interval_ms(),
            on_exit: OnExit::default(),
            on_failure: FailurePolicy::default(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// `[remote]` section: how remote machines are reached.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    #[serde(default = "default_ssh")]
    pub ssh: String,

    #[serde(default = "default_scp")]
    pub scp: String,

    /// Extra options passed to both `ssh` and `scp`.
    #[serde(default = "default_remote_options")]
    pub options: Vec<String>,

    /// Store root on remote machines; falls back to `store.root`.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

fn default_ssh() -> String {
    "ssh".to_string()
}

fn default_scp() -> String {
    "scp".to_string()
}

fn default_remote_options() -> Vec<String> {
    vec!["-o".to_string(), "BatchMode=yes".to_string()]
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            ssh: default_ssh(),
            scp: default_scp(),
            options: default_remote_options(),
            root: None,
        }
    }
}

/// Validated configuration.
///
/// Construct via `ConfigFile::try_from(raw)` or
/// [`crate::config::load_and_validate`]; both run the checks in
/// `config::validate`. Relative paths are resolved by the loader, not here.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub grid: GridSection,
    pub store: StoreSection,
    pub solver: SolverSection,
    pub machines: MachinesSection,
    pub control: ControlSection,
    pub remote: RemoteSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            grid: raw.grid,
            store: raw.store,
            solver: raw.solver,
            machines: raw.machines,
            control: raw.control,
            remote: raw.remote,
        }
    }

    pub fn bounds(&self) -> GridBounds {
        GridBounds::new(self.grid.a_max, self.grid.b_max)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.control.poll_interval_ms)
    }

    pub fn remote_program(&self) -> &str {
        self.solver
            .remote_program
            .as_deref()
            .unwrap_or(&self.solver.program)
    }

    pub fn remote_root(&self) -> &PathBuf {
        self.remote.root.as_ref().unwrap_or(&self.store.root)
    }

    /// Resolve relative local paths against `base` (the config directory).
    pub(crate) fn resolve_paths(&mut self, base: &std::path::Path) {
        for path in [
            &mut self.store.root,
            &mut self.machines.file,
            &mut self.control.stop_file,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
