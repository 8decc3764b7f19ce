// src/dag/graph.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::cell::{Cell, GridBounds};

/// Dependency relation over the cells of a grid.
///
/// The relation is implicit in the coordinates, so nothing is stored per
/// cell. A cell `(a, b, t)` depends on:
/// - `(a + 1, b, t + 2)` when `a < a_max`
/// - `(a, b + 1, t + 2)` when `b < b_max`
/// - `(a, b, t - 1)` when `t > 0`
///
/// Dependencies that would fall outside the grid are omitted, which makes
/// them vacuously satisfied.
#[derive(Debug, Clone, Copy)]
pub struct DependencyGraph {
    bounds: GridBounds,
}

impl DependencyGraph {
    pub fn new(bounds: GridBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /// All cells in enumeration order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.bounds.cells()
    }

    /// Immediate, boundary-filtered dependencies of `cell`.
    pub fn dependencies_of(&self, cell: Cell) -> Vec<Cell> {
        let (a, b, t) = (cell.a(), cell.b(), cell.t());
        let mut deps = Vec::with_capacity(3);

        if a < self.bounds.a_max {
            deps.extend(self.bounds.checked_cell(a + 1, b, t + 2));
        }
        if b < self.bounds.b_max {
            deps.extend(self.bounds.checked_cell(a, b + 1, t + 2));
        }
        if t > 0 {
            deps.extend(self.bounds.checked_cell(a, b, t - 1));
        }

        deps
    }

    /// Build an explicit `petgraph` graph with edges `dependency -> cell`.
    pub fn to_graphmap(&self) -> DiGraphMap<Cell, ()> {
        let mut graph: DiGraphMap<Cell, ()> = DiGraphMap::new();
        for cell in self.cells() {
            graph.add_node(cell);
            for dep in self.dependencies_of(cell) {
                graph.add_edge(dep, cell, ());
            }
        }
        graph
    }

    /// Number of cells on the longest dependency chain, i.e. the minimum
    /// number of sequential waves needed to solve the whole grid regardless
    /// of how many machines are available.
    pub fn critical_path_len(&self) -> usize {
        let graph = self.to_graphmap();
        // The relation strictly decreases (a + b, then t) along every edge,
        // so it cannot contain a cycle.
        let order = match toposort(&graph, None) {
            Ok(order) => order,
            Err(_) => return 0,
        };

        let mut depth: HashMap<Cell, usize> = HashMap::with_capacity(order.len());
        let mut longest = 0;
        for cell in order {
            let d = self
                .dependencies_of(cell)
                .iter()
                .filter_map(|dep| depth.get(dep))
                .max()
                .map_or(1, |m| m + 1);
            depth.insert(cell, d);
            longest = longest.max(d);
        }
        longest
    }
}
