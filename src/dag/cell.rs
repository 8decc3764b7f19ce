// src/dag/cell.rs

//! Cell coordinates and the bounded grid they live in.

use std::cmp::Reverse;
use std::fmt;

use crate::errors::{CellfarmError, Result};

/// One unit of work: coordinates `(a, b, t)` inside a [`GridBounds`].
///
/// Fields are private so a `Cell` can only be obtained from
/// [`GridBounds::cell`] or grid enumeration, which guarantees it is in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    a: u32,
    b: u32,
    t: u32,
}

impl Cell {
    pub fn a(&self) -> u32 {
        self.a
    }

    pub fn b(&self) -> u32 {
        self.b
    }

    pub fn t(&self) -> u32 {
        self.t
    }

    /// File stem shared by both artifacts of this cell: `<a>_<b>_<t>`.
    pub fn artifact_stem(&self) -> String {
        format!("{}_{}_{}", self.a, self.b, self.t)
    }

    /// Sort key reproducing enumeration order: `a` descending, `b`
    /// descending, `t` ascending.
    pub fn enumeration_key(&self) -> (Reverse<u32>, Reverse<u32>, u32) {
        (Reverse(self.a), Reverse(self.b), self.t)
    }

    /// Solver arguments for this cell, in order.
    pub fn solver_args(&self) -> [String; 3] {
        [self.a.to_string(), self.b.to_string(), self.t.to_string()]
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.a, self.b, self.t)
    }
}

/// Upper bounds of the coordinate space.
///
/// A cell `(a, b, t)` is valid iff `a <= a_max`, `b <= b_max` and
/// `t <= (a + b) * 2 + 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBounds {
    pub a_max: u32,
    pub b_max: u32,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self { a_max: 6, b_max: 14 }
    }
}

impl GridBounds {
    pub fn new(a_max: u32, b_max: u32) -> Self {
        Self { a_max, b_max }
    }

    /// Largest valid `t` for the given `(a, b)`.
    pub fn t_max(a: u32, b: u32) -> u32 {
        (a + b) * 2 + 2
    }

    pub fn contains(&self, a: u32, b: u32, t: u32) -> bool {
        a <= self.a_max && b <= self.b_max && t <= Self::t_max(a, b)
    }

    /// Build a cell, rejecting coordinates outside the grid.
    pub fn cell(&self, a: u32, b: u32, t: u32) -> Result<Cell> {
        if !self.contains(a, b, t) {
            return Err(CellfarmError::InvalidCell {
                a,
                b,
                t,
                reason: format!(
                    "outside grid a<={} b<={} t<={}",
                    self.a_max,
                    self.b_max,
                    Self::t_max(a.min(self.a_max), b.min(self.b_max))
                ),
            });
        }
        Ok(Cell { a, b, t })
    }

    /// Like [`GridBounds::cell`] but returns `None` for out-of-range
    /// coordinates. Used for boundary-filtered dependency lookups.
    pub fn checked_cell(&self, a: u32, b: u32, t: u32) -> Option<Cell> {
        self.contains(a, b, t).then_some(Cell { a, b, t })
    }

    /// Every cell of the grid in enumeration order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..=self.a_max).rev().flat_map(move |a| {
            (0..=self.b_max)
                .rev()
                .flat_map(move |b| (0..=Self::t_max(a, b)).map(move |t| Cell { a, b, t }))
        })
    }

    pub fn cell_count(&self) -> usize {
        let mut n = 0usize;
        for a in 0..=self.a_max {
            for b in 0..=self.b_max {
                n += Self::t_max(a, b) as usize + 1;
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_rejects_out_of_range() {
        let g = GridBounds::new(1, 1);
        assert!(g.cell(1, 1, 6).is_ok());
        assert!(g.cell(1, 1, 7).is_err());
        assert!(g.cell(2, 0, 0).is_err());
        assert!(g.cell(0, 2, 0).is_err());
        assert!(g.cell(0, 0, 2).is_ok());
        assert!(g.cell(0, 0, 3).is_err());
    }

    #[test]
    fn enumeration_order_is_a_desc_b_desc_t_asc() {
        let g = GridBounds::new(1, 1);
        let cells: Vec<String> = g.cells().map(|c| c.artifact_stem()).collect();

        let mut expected = Vec::new();
        for (a, b) in [(1, 1), (1, 0), (0, 1), (0, 0)] {
            for t in 0..=GridBounds::t_max(a, b) {
                expected.push(format!("{a}_{b}_{t}"));
            }
        }
        assert_eq!(cells, expected);
        assert_eq!(g.cell_count(), expected.len());
    }

    #[test]
    fn enumeration_key_sorts_like_enumeration() {
        let g = GridBounds::default();
        let mut shuffled: Vec<Cell> = g.cells().collect();
        shuffled.reverse();
        shuffled.sort_by_key(|c| c.enumeration_key());
        assert_eq!(shuffled, g.cells().collect::<Vec<_>>());
    }

    #[test]
    fn display_is_space_separated() {
        let c = GridBounds::default().cell(3, 10, 7).unwrap();
        assert_eq!(c.to_string(), "3 10 7");
        assert_eq!(c.artifact_stem(), "3_10_7");
        assert_eq!(c.solver_args(), ["3", "10", "7"]);
    }
}
