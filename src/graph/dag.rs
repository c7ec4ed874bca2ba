//! dag.rs
//! Builds the conversion graph from store records and answers adjacency queries.
//! Despite the name the graph may contain cycles; every bidirectional conversion is one.

use super::edge::{Direction, Hop};
use super::{HopId, NodeId};
use crate::error::{EngineError, Result};
use crate::store::{Conversion, Unit, UnitId};
use petgraph::dot::Dot;
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use smallvec::SmallVec;
use std::collections::HashMap;
use tracing::debug;

/// One outgoing hop as seen from its tail unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub target: NodeId,
    pub hop_id: HopId,
    pub hop: Hop,
}

pub type Neighbors = SmallVec<[Neighbor; 8]>;

#[derive(Debug, Clone, Default)]
pub struct ConversionGraph {
    graph: DiGraph<Unit, Hop>,
    index: HashMap<UnitId, NodeId>,
}

impl ConversionGraph {
    /// Materializes the graph, or rejects the whole input.
    ///
    /// A graph with a bad edge silently dropped would yield a matrix that
    /// looks more permissive than reality, so there is no partial result.
    pub fn build(units: &[Unit], conversions: &[Conversion]) -> Result<Self> {
        let mut sorted: Vec<&Unit> = units.iter().collect();
        sorted.sort_by_key(|u| u.id);
        if let Some(pair) = sorted.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(EngineError::DuplicateUnit(pair[0].id));
        }

        let mut graph = DiGraph::with_capacity(sorted.len(), conversions.len() * 2);
        let mut index = HashMap::with_capacity(sorted.len());
        for unit in sorted {
            let node = graph.add_node(unit.clone());
            index.insert(unit.id, node);
        }

        // Stable sort: duplicate pairs keep their input order as a tie-break.
        let mut edges: Vec<&Conversion> = conversions.iter().collect();
        edges.sort_by_key(|c| c.key());

        for conversion in edges {
            let (src, dst) = Self::endpoints(&index, conversion)?;
            Self::check_transform(conversion)?;

            let transform = conversion.transform();
            graph.add_edge(src, dst, Hop { transform, direction: Direction::Forward });
            if conversion.bidirectional {
                graph.add_edge(dst, src, Hop { transform, direction: Direction::Inverse });
            }
        }

        debug!(units = graph.node_count(), hops = graph.edge_count(), "conversion graph built");
        Ok(Self { graph, index })
    }

    fn endpoints(index: &HashMap<UnitId, NodeId>, conversion: &Conversion) -> Result<(NodeId, NodeId)> {
        let lookup = |id: UnitId| {
            index.get(&id).copied().ok_or(EngineError::DanglingReference {
                source_id: conversion.source_id,
                destination_id: conversion.destination_id,
                missing: id,
            })
        };
        Ok((lookup(conversion.source_id)?, lookup(conversion.destination_id)?))
    }

    fn check_transform(conversion: &Conversion) -> Result<()> {
        let reason = if conversion.source_id == conversion.destination_id {
            Some("a unit cannot convert to itself")
        } else if !conversion.transform().is_finite() {
            Some("slope and intercept must be finite")
        } else if conversion.bidirectional && conversion.slope == 0.0 {
            Some("a bidirectional conversion needs a non-zero slope")
        } else if conversion.bidirectional && conversion.transform().inverse().is_none() {
            Some("the inverse of a bidirectional conversion must be finite")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(EngineError::InvalidTransform {
                source_id: conversion.source_id,
                destination_id: conversion.destination_id,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    // --- Adjacency ---

    /// Outgoing hops of `node`, ordered by (target id, direction, insertion).
    pub fn hops_from(&self, node: NodeId) -> Neighbors {
        let mut out: Neighbors = self
            .graph
            .edges(node)
            .map(|e| Neighbor { target: e.target(), hop_id: e.id(), hop: *e.weight() })
            .collect();
        out.sort_by_key(|n| (n.target, n.hop.direction, n.hop_id));
        out
    }

    pub fn hop(&self, id: HopId) -> Option<&Hop> {
        self.graph.edge_weight(id)
    }

    pub fn hop_endpoints(&self, id: HopId) -> Option<(NodeId, NodeId)> {
        self.graph.edge_endpoints(id)
    }

    // --- Accessors ---

    pub fn unit_count(&self) -> usize { self.graph.node_count() }
    pub fn hop_count(&self) -> usize { self.graph.edge_count() }

    pub fn node_of(&self, id: UnitId) -> Option<NodeId> {
        self.index.get(&id).copied()
    }

    /// `node` must come from this graph.
    pub(crate) fn unit(&self, node: NodeId) -> &Unit {
        &self.graph[node]
    }

    /// Units in node order (ascending id).
    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.graph.node_weights()
    }

    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units().map(|u| u.id).collect()
    }

    /// Graphviz rendering, unit names on nodes and transforms on hops.
    pub fn to_dot(&self) -> String {
        let labelled = self.graph.map(|_, unit| unit.name.clone(), |_, hop| hop.label());
        format!("{}", Dot::new(&labelled))
    }
}
