//! Reachability & composition: the closure over a built graph and composed-transform queries.

use crate::analysis::{transitive_closure, PathTable, ReachabilityMatrix, ShortestPathTree};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::graph::{ConversionGraph, HopId, NodeId, Transform};
use crate::store::UnitId;
use tracing::debug;

/// Output of [`Engine::compute_closure`].
#[derive(Debug, Clone, Default)]
pub struct Closure {
    pub matrix: ReachabilityMatrix,
    /// Path choice per source, present when `cache_paths` is on.
    pub paths: Option<PathTable>,
}

pub struct Engine;

impl Engine {
    /// Computes the reachability matrix and, if configured, the path choice for every pair.
    ///
    /// The same graph always yields the same matrix and the same paths.
    pub fn compute_closure(graph: &ConversionGraph, config: &EngineConfig) -> Closure {
        let matrix = transitive_closure(graph, config);
        let paths = config.cache_paths.then(|| PathTable::compute(graph, config));

        let reachable_pairs = (0..matrix.size())
            .map(|i| matrix.row(i).iter().filter(|&&hit| hit).count())
            .sum::<usize>();
        debug!(
            units = matrix.size(),
            reachable_pairs,
            cached_paths = paths.is_some(),
            "closure computed"
        );

        Closure { matrix, paths }
    }

    /// Composed transform from `source` to `destination` along the chosen path.
    ///
    /// Runs its own breadth-first search, so it needs no cached path table.
    pub fn composed_transform(
        matrix: &ReachabilityMatrix,
        graph: &ConversionGraph,
        source: UnitId,
        destination: UnitId,
    ) -> Result<Transform> {
        let (src, dst) = Self::locate(matrix, graph, source, destination)?;
        let hops = ShortestPathTree::grow(graph, src)
            .hops_to(dst)
            .ok_or(EngineError::NotReachable { source_id: source, destination_id: destination })?;
        Self::checked(Self::fold(graph, &hops), source, destination)
    }

    /// Resolves both units to graph nodes and checks the matrix cell.
    pub(crate) fn locate(
        matrix: &ReachabilityMatrix,
        graph: &ConversionGraph,
        source: UnitId,
        destination: UnitId,
    ) -> Result<(NodeId, NodeId)> {
        let src = graph.node_of(source).ok_or(EngineError::UnknownUnit(source))?;
        let dst = graph.node_of(destination).ok_or(EngineError::UnknownUnit(destination))?;
        match matrix.is_reachable(source, destination) {
            Some(true) => Ok((src, dst)),
            Some(false) => Err(EngineError::NotReachable { source_id: source, destination_id: destination }),
            // Matrix built from another graph.
            None => Err(EngineError::UnknownUnit(if matrix.position(source).is_none() { source } else { destination })),
        }
    }

    /// Rejects a composed transform that overflowed along a long chain of finite hops.
    pub(crate) fn checked(transform: Transform, source: UnitId, destination: UnitId) -> Result<Transform> {
        if transform.is_finite() {
            return Ok(transform);
        }
        Err(EngineError::InvalidTransform {
            source_id: source,
            destination_id: destination,
            reason: "composed transform overflows".into(),
        })
    }

    /// Folds the transforms of `hops` in traversal order, starting from identity.
    pub fn fold(graph: &ConversionGraph, hops: &[HopId]) -> Transform {
        hops.iter()
            .filter_map(|&id| graph.hop(id))
            .fold(Transform::IDENTITY, |acc, hop| hop.fold_onto(acc))
    }
}
