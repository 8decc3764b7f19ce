// src/exec/unit.rs

//! One cell solved on one machine.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::{Cell, DependencyGraph};
use crate::exec::runner::{CommandRunner, expand_home};
use crate::exec::transport::{Invocation, Transport};
use crate::pool::Machine;
use crate::store::{ArtifactKind, ArtifactStore, CompletionStore, relative_artifact_path};

/// Which part of a unit's work an outcome refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStep {
    /// Running the solver on this host.
    LocalSolve,
    /// Copying a dependency's scores artifact to the remote host.
    PushDependency,
    /// Running the solver on the remote host.
    RemoteSolve,
    /// Copying result artifacts back and publishing them.
    Pull,
    /// Checking that the completion marker exists afterwards.
    Verify,
    /// The unit's task panicked or was cancelled.
    Aborted,
}

impl fmt::Display for UnitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitStep::LocalSolve => "local solve",
            UnitStep::PushDependency => "dependency push",
            UnitStep::RemoteSolve => "remote solve",
            UnitStep::Pull => "artifact pull",
            UnitStep::Verify => "marker check",
            UnitStep::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Final status of an execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Success,
    /// The first step that failed. `code` is the exit code when a process
    /// ran and returned one.
    Failed { step: UnitStep, code: Option<i32> },
}

impl UnitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitOutcome::Success)
    }
}

/// How to invoke the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverCommand {
    /// Solver path on this host. A leading `~/` is expanded from `$HOME`.
    pub program: String,
    /// Solver path on remote hosts, expanded by the remote shell.
    pub remote_program: String,
    pub subcommand: String,
}

impl SolverCommand {
    pub fn local_invocation(&self, cell: Cell) -> Invocation {
        let mut args = vec![self.subcommand.clone()];
        args.extend(cell.solver_args());
        Invocation {
            program: expand_home(&self.program),
            args,
        }
    }

    pub fn remote_command(&self, cell: Cell) -> String {
        format!("{} {} {}", self.remote_program, self.subcommand, cell)
    }
}

/// Everything a unit needs besides its `(cell, machine)` binding. Shared by
/// all units of a run.
#[derive(Debug)]
pub struct UnitContext {
    pub graph: DependencyGraph,
    pub store: ArtifactStore,
    /// Store root on remote hosts.
    pub remote_root: PathBuf,
    pub solver: SolverCommand,
    pub transport: Transport,
    pub runner: Arc<dyn CommandRunner>,
}

/// Runs one cell on one machine to completion.
///
/// Steps run strictly in sequence. A failing step does not stop later ones
/// and nothing is rolled back; the first failure decides the outcome.
#[derive(Debug)]
pub struct ExecutionUnit {
    cell: Cell,
    machine: Machine,
    ctx: Arc<UnitContext>,
}

impl ExecutionUnit {
    pub fn new(cell: Cell, machine: Machine, ctx: Arc<UnitContext>) -> Self {
        Self { cell, machine, ctx }
    }

    pub fn cell(&self) -> Cell {
        self.cell
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub async fn run(self) -> UnitOutcome {
        let mut first_failure = None;

        match &self.machine {
            Machine::Local => {
                let inv = self.ctx.solver.local_invocation(self.cell);
                self.step(UnitStep::LocalSolve, &inv, &mut first_failure).await;
            }
            Machine::Remote(host) => {
                self.push_dependencies(host, &mut first_failure).await;

                let cmd = self.ctx.solver.remote_command(self.cell);
                let inv = self.ctx.transport.exec(host, &cmd);
                self.step(UnitStep::RemoteSolve, &inv, &mut first_failure).await;

                self.pull_results(host, &mut first_failure).await;
            }
        }

        if first_failure.is_none() && !self.ctx.store.is_done(self.cell) {
            warn!(
                cell = %self.cell,
                machine = %self.machine,
                "all steps succeeded but completion marker is missing"
            );
            first_failure = Some(UnitOutcome::Failed {
                step: UnitStep::Verify,
                code: None,
            });
        }

        first_failure.unwrap_or(UnitOutcome::Success)
    }

    async fn push_dependencies(&self, host: &str, first_failure: &mut Option<UnitOutcome>) {
        for dep in self.ctx.graph.dependencies_of(self.cell) {
            let local = self.ctx.store.scores_path(dep);
            let remote = self
                .ctx
                .remote_root
                .join(relative_artifact_path(ArtifactKind::Scores, dep));
            let inv = self.ctx.transport.push(host, &local, &remote);
            self.step(UnitStep::PushDependency, &inv, first_failure).await;
        }
    }

    /// Strategy first, scores last: the scores file is the completion
    /// marker, so it must only appear once both artifacts are in place. A
    /// strategy that did not arrive stops the pull before the scores.
    async fn pull_results(&self, host: &str, first_failure: &mut Option<UnitOutcome>) {
        for kind in [ArtifactKind::Strats, ArtifactKind::Scores] {
            if !self.pull_artifact(host, kind, first_failure).await {
                if let Err(err) = self.ctx.store.discard_staging(kind, self.cell) {
                    warn!(
                        cell = %self.cell,
                        machine = %self.machine,
                        error = %err,
                        "could not remove partial artifact"
                    );
                }
                return;
            }
        }
    }

    /// Pull one artifact into staging and publish it; returns whether it
    /// is now in its final place.
    async fn pull_artifact(
        &self,
        host: &str,
        kind: ArtifactKind,
        first_failure: &mut Option<UnitOutcome>,
    ) -> bool {
        let remote = self
            .ctx
            .remote_root
            .join(relative_artifact_path(kind, self.cell));
        let staging = self.ctx.store.staging_path(kind, self.cell);
        let inv = self.ctx.transport.pull(host, &remote, &staging);

        if !self.step(UnitStep::Pull, &inv, first_failure).await {
            return false;
        }
        if let Err(err) = self.ctx.store.publish(kind, self.cell) {
            warn!(
                cell = %self.cell,
                machine = %self.machine,
                error = %err,
                "could not publish pulled artifact"
            );
            record(first_failure, UnitStep::Pull, None);
            return false;
        }
        true
    }

    /// Run one invocation; returns whether it succeeded.
    async fn step(
        &self,
        step: UnitStep,
        inv: &Invocation,
        first_failure: &mut Option<UnitOutcome>,
    ) -> bool {
        debug!(cell = %self.cell, machine = %self.machine, %step, cmd = %inv.display(), "running step");

        match self.ctx.runner.run(&inv.program, &inv.args).await {
            Ok(0) => true,
            Ok(code) => {
                warn!(
                    cell = %self.cell,
                    machine = %self.machine,
                    %step,
                    exit_code = code,
                    cmd = %inv.display(),
                    "step exited with failure"
                );
                record(first_failure, step, Some(code));
                false
            }
            Err(err) => {
                warn!(
                    cell = %self.cell,
                    machine = %self.machine,
                    %step,
                    error = %err,
                    "step could not be run"
                );
                record(first_failure, step, None);
                false
            }
        }
    }
}

fn record(first_failure: &mut Option<UnitOutcome>, step: UnitStep, code: Option<i32>) {
    if first_failure.is_none() {
        *first_failure = Some(UnitOutcome::Failed { step, code });
    }
}
