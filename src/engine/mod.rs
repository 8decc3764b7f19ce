// src/engine/mod.rs

//! Orchestration engine for cellfarm.
//!
//! The control loop alternates two phases until the grid is exhausted or an
//! operator asks it to stop:
//! - dispatch: bind ready cells to free machines and start units
//! - wait: poll until something can be dispatched or a unit has finished
//!
//! The pure, synchronous bookkeeping (pending set, busy machines, attempt
//! counts) lives in [`core`]; the async shell that spawns and polls units is
//! [`runtime`].

use std::fmt;
use std::time::{Duration, Instant};

use crate::dag::Cell;
use crate::exec::{UnitHandle, UnitOutcome};
use crate::pool::Machine;
use crate::types::FailurePolicy;

pub mod core;
pub mod runtime;
pub mod stop;

pub use self::core::{CoreScheduler, Dispatch};
pub use runtime::{Runtime, drain};
pub use stop::StopSignal;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Sleep between checks in the wait phase.
    pub poll_interval: Duration,
    pub on_failure: FailurePolicy,
    /// Upper bound on dispatches of one cell within a run. Only relevant
    /// with [`FailurePolicy::Requeue`].
    pub max_attempts: u32,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            on_failure: FailurePolicy::Skip,
            max_attempts: 3,
        }
    }
}

/// Why the control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Stop sentinel present or Ctrl-C received.
    StopRequested,
    /// Every pending cell has been dispatched.
    Exhausted,
    /// Nothing is running and no pending cell can ever become ready in this
    /// run (its dependencies failed).
    Stalled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::StopRequested => "stop requested",
            StopReason::Exhausted => "all cells dispatched",
            StopReason::Stalled => "remaining cells blocked by failed dependencies",
        };
        f.write_str(s)
    }
}

/// A unit the control loop has dispatched and not yet reaped.
#[derive(Debug)]
pub struct RunningTask {
    cell: Cell,
    machine: Machine,
    handle: UnitHandle,
    started: Instant,
}

impl RunningTask {
    pub fn new(cell: Cell, machine: Machine, handle: UnitHandle) -> Self {
        Self {
            cell,
            machine,
            handle,
            started: Instant::now(),
        }
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the unit; returns its outcome and wall time since dispatch.
    pub async fn wait(self) -> (Cell, Machine, UnitOutcome, Duration) {
        let outcome = self.handle.outcome().await;
        (self.cell, self.machine, outcome, self.started.elapsed())
    }
}

/// Summary returned when the control loop stops.
#[derive(Debug)]
pub struct RunReport {
    pub reason: StopReason,
    pub dispatched: usize,
    pub failed: usize,
    pub pending_left: usize,
    /// Units still in flight when the loop stopped. The loop does not wait
    /// for them; see [`drain`].
    pub outstanding: Vec<RunningTask>,
}
