// src/dag/readiness.rs

use crate::dag::{Cell, DependencyGraph};
use crate::store::CompletionStore;

/// Decides whether a cell can be dispatched right now.
///
/// Every query goes straight to the store; results are never cached, so a
/// marker written by a finished unit is seen on the very next scan.
#[derive(Debug)]
pub struct ReadinessOracle<'a, S: CompletionStore + ?Sized> {
    graph: &'a DependencyGraph,
    store: &'a S,
}

impl<'a, S: CompletionStore + ?Sized> ReadinessOracle<'a, S> {
    pub fn new(graph: &'a DependencyGraph, store: &'a S) -> Self {
        Self { graph, store }
    }

    pub fn graph(&self) -> &'a DependencyGraph {
        self.graph
    }

    pub fn is_done(&self, cell: Cell) -> bool {
        self.store.is_done(cell)
    }

    /// `true` iff `cell` is not done and every applicable dependency is done.
    pub fn is_ready(&self, cell: Cell) -> bool {
        if self.is_done(cell) {
            return false;
        }
        self.graph
            .dependencies_of(cell)
            .into_iter()
            .all(|dep| self.is_done(dep))
    }
}
