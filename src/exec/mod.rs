// src/exec/mod.rs

//! Execution layer.
//!
//! This module is responsible for actually solving cells: locally through
//! the solver binary, or remotely through `scp` + `ssh`.
//!
//! - [`runner`] abstracts process invocation (`tokio::process` in
//!   production).
//! - [`transport`] builds `ssh`/`scp` argument vectors.
//! - [`unit`] runs one cell on one machine.
//! - [`backend`] provides the `ExecutorBackend` trait the control loop
//!   spawns units through, and the `UnitHandle` it polls.

pub mod backend;
pub mod runner;
pub mod transport;
pub mod unit;

pub use backend::{ExecutorBackend, RealExecutorBackend, UnitHandle};
pub use runner::{CommandRunner, ProcessRunner};
pub use transport::{Invocation, Transport};
pub use unit::{ExecutionUnit, SolverCommand, UnitContext, UnitOutcome, UnitStep};
