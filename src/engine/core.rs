// src/engine/core.rs

//! Pure core of the control loop.
//!
//! `CoreScheduler` owns the pending set, the machine pool (with its busy
//! set) and per-cell attempt counts. It has no channels and no Tokio types;
//! the async shell in `engine::runtime` feeds it and executes its decisions.
//! All mutation happens from the single control task, so nothing here is
//! locked.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::{Cell, DependencyGraph, PendingSet, ReadinessOracle};
use crate::engine::{RuntimeOptions, StopReason};
use crate::exec::UnitOutcome;
use crate::pool::{Machine, MachinePool};
use crate::store::CompletionStore;
use crate::types::FailurePolicy;

/// A cell bound to the machine that should solve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub cell: Cell,
    pub machine: Machine,
}

#[derive(Debug)]
pub struct CoreScheduler {
    graph: DependencyGraph,
    store: Arc<dyn CompletionStore>,
    pending: PendingSet,
    pool: MachinePool,
    options: RuntimeOptions,
    attempts: HashMap<Cell, u32>,
    dispatched: usize,
    failed: usize,
}

impl CoreScheduler {
    /// Init: enumerate the grid and keep every cell that is not done yet.
    pub fn new(
        graph: DependencyGraph,
        store: Arc<dyn CompletionStore>,
        pool: MachinePool,
        options: RuntimeOptions,
    ) -> Self {
        let pending = PendingSet::from_grid(&graph, store.as_ref());
        info!(
            total = graph.bounds().cell_count(),
            pending = pending.len(),
            "initialised pending set"
        );
        Self {
            graph,
            store,
            pending,
            pool,
            options,
            attempts: HashMap::new(),
            dispatched: 0,
            failed: 0,
        }
    }

    pub fn pending(&self) -> &PendingSet {
        &self.pending
    }

    pub fn pool(&self) -> &MachinePool {
        &self.pool
    }

    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    /// Terminal check, run before every dispatch phase.
    pub fn stop_reason(&self, stop_requested: bool) -> Option<StopReason> {
        if stop_requested {
            Some(StopReason::StopRequested)
        } else if self.pending.is_empty() {
            Some(StopReason::Exhausted)
        } else {
            None
        }
    }

    pub fn has_ready(&self) -> bool {
        let oracle = ReadinessOracle::new(&self.graph, self.store.as_ref());
        self.pending.has_ready(&oracle)
    }

    /// Whether a ready cell and a free machine both exist right now.
    pub fn can_dispatch(&self) -> bool {
        self.pool.available_machine().is_some() && self.has_ready()
    }

    /// Bind the next ready cell to the next free machine, marking the
    /// machine busy and removing the cell from the pending set.
    pub fn next_dispatch(&mut self) -> Option<Dispatch> {
        let machine = self.pool.available_machine()?;
        let oracle = ReadinessOracle::new(&self.graph, self.store.as_ref());
        let cell = self.pending.take_ready(&oracle)?;

        if !self.pool.mark_busy(&machine) {
            // available_machine() never returns a busy machine; keep the
            // cell rather than lose it if that ever changes.
            self.pending.restore(cell);
            return None;
        }

        *self.attempts.entry(cell).or_insert(0) += 1;
        self.dispatched += 1;

        info!(cell = %cell, machine = %machine, "Running {} on {}", cell, machine);

        Some(Dispatch { cell, machine })
    }

    /// Reap a finished unit: free its machine and apply the failure policy.
    pub fn finish(&mut self, cell: Cell, machine: &Machine, outcome: UnitOutcome, elapsed: Duration) {
        let back_in_rotation = self.pool.release(machine);

        let secs = elapsed.as_secs_f64();
        info!(
            cell = %cell,
            machine = %machine,
            elapsed_s = secs,
            success = outcome.is_success(),
            "Job on {} is done in {:.2} s!",
            machine,
            secs
        );
        debug!(machine = %machine, back_in_rotation, "machine released");

        let UnitOutcome::Failed { step, code } = outcome else {
            return;
        };
        self.failed += 1;

        if self.store.is_done(cell) {
            warn!(
                cell = %cell,
                machine = %machine,
                %step,
                exit_code = ?code,
                "unit failed but its completion marker exists; keeping the cell as done"
            );
            return;
        }

        let attempts = self.attempts.get(&cell).copied().unwrap_or(0);
        match self.options.on_failure {
            FailurePolicy::Skip => {
                warn!(
                    cell = %cell,
                    machine = %machine,
                    %step,
                    exit_code = ?code,
                    "unit failed; cell will be retried on the next run"
                );
            }
            FailurePolicy::Requeue if attempts < self.options.max_attempts => {
                warn!(
                    cell = %cell,
                    machine = %machine,
                    %step,
                    exit_code = ?code,
                    attempts,
                    "unit failed; requeueing cell"
                );
                self.pending.restore(cell);
            }
            FailurePolicy::Requeue => {
                warn!(
                    cell = %cell,
                    machine = %machine,
                    %step,
                    exit_code = ?code,
                    attempts,
                    "unit failed; attempt limit reached for this run"
                );
            }
        }
    }
}
