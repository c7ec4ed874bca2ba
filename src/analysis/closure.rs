//! All-pairs reachability over the conversion graph (Floyd–Warshall transitive closure).

use crate::config::EngineConfig;
use crate::graph::{ConversionGraph, NodeId};
use crate::store::UnitId;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Square boolean matrix over the unit set, rows and columns in ascending `UnitId` order.
///
/// Cell (i, k) is true iff unit k can be reached from unit i. The diagonal is always true.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReachabilityMatrix {
    units: Vec<UnitId>,
    cells: Vec<bool>, // Row-major, units.len()^2
}

/// Serialized form: the axis labels plus a 2D grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixView {
    pub units: Vec<UnitId>,
    pub grid: Vec<Vec<bool>>,
}

impl ReachabilityMatrix {
    pub fn size(&self) -> usize { self.units.len() }

    pub fn unit_ids(&self) -> &[UnitId] { &self.units }

    /// Row/column of a unit. Ids are sorted, so this is a binary search.
    pub fn position(&self, id: UnitId) -> Option<usize> {
        self.units.binary_search(&id).ok()
    }

    /// Panics on an out-of-range position; public callers go through `is_reachable`.
    #[inline(always)]
    pub(crate) fn get(&self, i: usize, k: usize) -> bool {
        self.cells[i * self.units.len() + k]
    }

    pub(crate) fn row(&self, i: usize) -> &[bool] {
        let n = self.units.len();
        &self.cells[i * n..(i + 1) * n]
    }

    /// `None` when either unit is outside the matrix.
    pub fn is_reachable(&self, source: UnitId, destination: UnitId) -> Option<bool> {
        Some(self.get(self.position(source)?, self.position(destination)?))
    }

    /// Every unit reachable from `source`, itself included, ascending.
    pub fn reachable_from(&self, source: UnitId) -> Option<Vec<UnitId>> {
        let i = self.position(source)?;
        Some(
            self.row(i)
                .iter()
                .zip(&self.units)
                .filter_map(|(&hit, &id)| hit.then_some(id))
                .collect(),
        )
    }

    pub fn to_view(&self) -> MatrixView {
        MatrixView {
            units: self.units.clone(),
            grid: (0..self.size()).map(|i| self.row(i).to_vec()).collect(),
        }
    }
}

/// Computes the reachability matrix of `graph`.
///
/// For each pivot m, every row i that reaches m absorbs row m. Rows are
/// independent for a fixed pivot, so they are relaxed on the rayon pool once
/// the graph has at least `config.parallel_threshold` units.
pub fn transitive_closure(graph: &ConversionGraph, config: &EngineConfig) -> ReachabilityMatrix {
    let n = graph.unit_count();
    let mut rows = vec![vec![false; n]; n];

    // 1. Identity and direct hops
    for (i, row) in rows.iter_mut().enumerate() {
        row[i] = true;
        for neighbor in graph.hops_from(NodeId::new(i)) {
            row[neighbor.target.index()] = true;
        }
    }

    // 2. Relax through every intermediate unit
    let parallel = n >= config.parallel_threshold;
    for m in 0..n {
        let pivot = rows[m].clone();
        let relax = |row: &mut Vec<bool>| {
            if row[m] {
                for (cell, &via) in row.iter_mut().zip(&pivot) {
                    *cell |= via;
                }
            }
        };
        if parallel {
            rows.par_iter_mut().for_each(relax);
        } else {
            rows.iter_mut().for_each(relax);
        }
    }

    ReachabilityMatrix { units: graph.unit_ids(), cells: rows.concat() }
}
