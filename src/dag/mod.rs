// src/dag/mod.rs

//! The cell grid and its dependency structure.
//!
//! - [`cell`] defines coordinates, grid bounds and enumeration order.
//! - [`graph`] holds the dependency relation between cells.
//! - [`readiness`] combines the graph with the completion store to decide
//!   whether a cell can run now.
//! - [`pending`] is the ordered working set of not-yet-dispatched cells.

pub mod cell;
pub mod graph;
pub mod pending;
pub mod readiness;

pub use cell::{Cell, GridBounds};
pub use graph::DependencyGraph;
pub use pending::PendingSet;
pub use readiness::ReadinessOracle;
