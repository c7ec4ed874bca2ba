//! snapshot.rs
//! The immutable result of one rebuild: graph, matrix and optional path table.

use super::engine::{Closure, Engine};
use crate::analysis::{HopPath, ReachabilityMatrix, ShortestPathTree};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::graph::{ConversionGraph, Direction, Transform};
use crate::store::{Conversion, Unit, UnitId};
use serde::{Deserialize, Serialize};

/// One step of a chosen conversion path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub from: UnitId,
    pub to: UnitId,
    pub direction: Direction,
    /// The conversion's recorded transform (not inverted for `Inverse` steps).
    pub recorded: Transform,
}

/// A fully computed, read-only view of the conversion graph at one generation.
#[derive(Debug, Clone)]
pub struct Snapshot {
    generation: u64,
    graph: ConversionGraph,
    closure: Closure,
}

impl Snapshot {
    /// Runs both stages. Nothing is returned unless both succeed.
    pub fn build(
        units: &[Unit],
        conversions: &[Conversion],
        generation: u64,
        config: &EngineConfig,
    ) -> Result<Self> {
        let graph = ConversionGraph::build(units, conversions)?;
        let closure = Engine::compute_closure(&graph, config);
        Ok(Self { generation, graph, closure })
    }

    pub fn generation(&self) -> u64 { self.generation }
    pub fn graph(&self) -> &ConversionGraph { &self.graph }
    pub fn matrix(&self) -> &ReachabilityMatrix { &self.closure.matrix }
    pub fn has_path_cache(&self) -> bool { self.closure.paths.is_some() }

    pub fn is_reachable(&self, source: UnitId, destination: UnitId) -> Result<bool> {
        match Engine::locate(self.matrix(), &self.graph, source, destination) {
            Ok(_) => Ok(true),
            Err(EngineError::NotReachable { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Composed transform for the pair. Same result with or without the path cache.
    pub fn transform(&self, source: UnitId, destination: UnitId) -> Result<Transform> {
        let hops = self.hops(source, destination)?;
        Engine::checked(Engine::fold(&self.graph, &hops), source, destination)
    }

    pub fn convert(&self, source: UnitId, destination: UnitId, value: f64) -> Result<f64> {
        Ok(self.transform(source, destination)?.apply(value))
    }

    pub fn path(&self, source: UnitId, destination: UnitId) -> Result<Vec<PathStep>> {
        let hops = self.hops(source, destination)?;
        Ok(hops
            .iter()
            .filter_map(|&id| {
                let hop = self.graph.hop(id)?;
                let (tail, head) = self.graph.hop_endpoints(id)?;
                Some(PathStep {
                    from: self.graph.unit(tail).id,
                    to: self.graph.unit(head).id,
                    direction: hop.direction,
                    recorded: hop.transform,
                })
            })
            .collect())
    }

    /// Units `source` can be converted into, itself included.
    pub fn reachable_from(&self, source: UnitId) -> Result<Vec<UnitId>> {
        self.matrix().reachable_from(source).ok_or(EngineError::UnknownUnit(source))
    }

    fn hops(&self, source: UnitId, destination: UnitId) -> Result<HopPath> {
        let (src, dst) = Engine::locate(self.matrix(), &self.graph, source, destination)?;
        let hops = match &self.closure.paths {
            Some(table) => table.hops(src, dst),
            None => ShortestPathTree::grow(&self.graph, src).hops_to(dst),
        };
        hops.ok_or(EngineError::NotReachable { source_id: source, destination_id: destination })
    }
}
