// src/engine/runtime.rs

use std::fmt;

use tracing::{debug, info, warn};

use crate::exec::ExecutorBackend;

use super::core::CoreScheduler;
use super::stop::StopSignal;
use super::{RunReport, RunningTask, StopReason};

/// Drives the control loop and delegates units to an `ExecutorBackend`.
///
/// This is a thin async shell around `CoreScheduler`, which holds all the
/// bookkeeping. The shell owns the running units, sleeps between polls and
/// observes the stop signal.
pub struct Runtime<E: ExecutorBackend> {
    core: CoreScheduler,
    executor: E,
    stop: StopSignal,
    running: Vec<RunningTask>,
}

impl<E: ExecutorBackend> fmt::Debug for Runtime<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("running", &self.running.len())
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend> Runtime<E> {
    pub fn new(core: CoreScheduler, executor: E, stop: StopSignal) -> Self {
        Self {
            core,
            executor,
            stop,
            running: Vec::new(),
        }
    }

    /// Main loop.
    ///
    /// - Terminal check: stop requested, or nothing left to dispatch.
    /// - Dispatch phase: start units until no ready cell or no free machine.
    /// - Wait phase: poll until a dispatch is possible or a unit finished.
    ///
    /// Units still running when the loop stops are handed back in the
    /// report; the loop never waits for them itself.
    pub async fn run(mut self) -> RunReport {
        info!(
            pending = self.core.pending().len(),
            sentinel = %self.stop.sentinel().display(),
            "cellfarm control loop started"
        );

        let reason = loop {
            if let Some(reason) = self.core.stop_reason(self.stop.is_set()) {
                break reason;
            }

            let started = self.dispatch_phase();
            if started > 0 {
                debug!(started, running = self.running.len(), "dispatch phase done");
            }

            if let Some(reason) = self.wait_phase().await {
                break reason;
            }
        };

        let report = RunReport {
            reason,
            dispatched: self.core.dispatched_count(),
            failed: self.core.failed_count(),
            pending_left: self.core.pending().len(),
            outstanding: self.running,
        };

        info!(
            reason = %report.reason,
            dispatched = report.dispatched,
            failed = report.failed,
            pending = report.pending_left,
            outstanding = report.outstanding.len(),
            "control loop stopped"
        );

        report
    }

    fn dispatch_phase(&mut self) -> usize {
        let mut started = 0;
        while let Some(dispatch) = self.core.next_dispatch() {
            let handle = self.executor.spawn_unit(dispatch.cell, dispatch.machine.clone());
            self.running
                .push(RunningTask::new(dispatch.cell, dispatch.machine, handle));
            started += 1;
        }
        started
    }

    /// Returns `Some` only when the loop can never make progress again.
    async fn wait_phase(&mut self) -> Option<StopReason> {
        loop {
            if self.stop.is_set() || self.core.can_dispatch() {
                return None;
            }

            if self.running.is_empty() {
                if self.core.pending().is_empty() {
                    return None;
                }
                if !self.core.has_ready() {
                    warn!(
                        pending = self.core.pending().len(),
                        "no unit running and no pending cell is ready"
                    );
                    return Some(StopReason::Stalled);
                }
                // Ready work but no free machine: keep polling so machines
                // added to the list are picked up.
            }

            tokio::time::sleep(self.core.options().poll_interval).await;

            if self.reap_finished().await > 0 {
                return None;
            }
        }
    }

    async fn reap_finished(&mut self) -> usize {
        let mut reaped = 0;
        let mut i = 0;
        while i < self.running.len() {
            if !self.running[i].is_finished() {
                i += 1;
                continue;
            }
            let task = self.running.remove(i);
            let (cell, machine, outcome, elapsed) = task.wait().await;
            self.core.finish(cell, &machine, outcome, elapsed);
            reaped += 1;
        }
        reaped
    }
}

/// Wait for units left over by a stopped control loop.
///
/// Returns the number of units that failed.
pub async fn drain(outstanding: Vec<RunningTask>) -> usize {
    if outstanding.is_empty() {
        return 0;
    }
    info!(count = outstanding.len(), "waiting for running units to exit");

    let mut failed = 0;
    for task in outstanding {
        let (cell, machine, outcome, elapsed) = task.wait().await;
        let secs = elapsed.as_secs_f64();
        info!(cell = %cell, machine = %machine, elapsed_s = secs, "Job on {} is done in {:.2} s!", machine, secs);
        if !outcome.is_success() {
            warn!(cell = %cell, machine = %machine, ?outcome, "unit failed during drain");
            failed += 1;
        }
    }
    failed
}
