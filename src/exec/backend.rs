// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The control loop asks an `ExecutorBackend` to start a unit and gets back
//! a [`UnitHandle`] it can poll. This makes it easy to swap in a fake
//! executor in tests while keeping the production implementation here.
//!
//! - `RealExecutorBackend` runs an [`ExecutionUnit`] in its own Tokio task.
//! - Tests can provide their own backend that, for example, writes the
//!   completion marker straight into a mock store.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::dag::Cell;
use crate::exec::unit::{ExecutionUnit, UnitContext, UnitOutcome, UnitStep};
use crate::pool::Machine;

/// Handle to a unit running in the background.
///
/// The only things the control loop can learn from it are "still running"
/// and, once finished, the outcome.
#[derive(Debug)]
pub struct UnitHandle {
    handle: JoinHandle<UnitOutcome>,
}

impl UnitHandle {
    /// Run `fut` as a detached Tokio task.
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = UnitOutcome> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(fut),
        }
    }

    /// `true` once the unit has exited for any reason, including a panic.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the unit and return its outcome. A panicked or cancelled
    /// unit is reported as a failure.
    pub async fn outcome(self) -> UnitOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "execution unit did not run to completion");
                UnitOutcome::Failed {
                    step: UnitStep::Aborted,
                    code: None,
                }
            }
        }
    }
}

/// Trait abstracting how units are started.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send {
    fn spawn_unit(&mut self, cell: Cell, machine: Machine) -> UnitHandle;
}

/// Real executor backend used in production.
#[derive(Debug, Clone)]
pub struct RealExecutorBackend {
    ctx: Arc<UnitContext>,
}

impl RealExecutorBackend {
    pub fn new(ctx: Arc<UnitContext>) -> Self {
        Self { ctx }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_unit(&mut self, cell: Cell, machine: Machine) -> UnitHandle {
        let unit = ExecutionUnit::new(cell, machine, Arc::clone(&self.ctx));
        UnitHandle::spawn(unit.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn panicking_unit_is_finished_and_failed() {
        let explode = true;
        let handle = UnitHandle::spawn(async move {
            if explode {
                panic!("solver wrapper exploded");
            }
            UnitOutcome::Success
        });
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }
        assert_eq!(
            handle.outcome().await,
            UnitOutcome::Failed {
                step: UnitStep::Aborted,
                code: None
            }
        );
    }

    #[tokio::test]
    async fn finished_unit_yields_its_outcome() {
        let handle = UnitHandle::spawn(async { UnitOutcome::Success });
        assert_eq!(handle.outcome().await, UnitOutcome::Success);
    }
}
