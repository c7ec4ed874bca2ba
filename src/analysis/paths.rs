//! Deterministic shortest-path selection over the conversion graph.
//!
//! A path is chosen by breadth-first search from the source: fewest hops
//! first, and among equally short paths the one found first when every
//! frontier is expanded in ascending target-unit order (forward hops before
//! inverse hops to the same unit). The first discovery of a unit is final.

use crate::config::EngineConfig;
use crate::graph::{ConversionGraph, HopId, NodeId};
use rayon::prelude::*;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Hop sequence from a source to a destination, in traversal order.
pub type HopPath = SmallVec<[HopId; 8]>;

/// Breadth-first tree rooted at one source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortestPathTree {
    source: NodeId,
    // (predecessor, hop used to arrive), None for the root and unreached units.
    parent: Vec<Option<(NodeId, HopId)>>,
    depth: Vec<Option<u32>>,
}

impl ShortestPathTree {
    pub fn grow(graph: &ConversionGraph, source: NodeId) -> Self {
        let count = graph.unit_count();
        let mut parent = vec![None; count];
        let mut depth = vec![None; count];
        let mut queue = VecDeque::with_capacity(count);

        depth[source.index()] = Some(0);
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            let next_depth = depth[node.index()].map_or(0, |d| d + 1);
            for neighbor in graph.hops_from(node) {
                let t = neighbor.target.index();
                if depth[t].is_none() {
                    depth[t] = Some(next_depth);
                    parent[t] = Some((node, neighbor.hop_id));
                    queue.push_back(neighbor.target);
                }
            }
        }

        Self { source, parent, depth }
    }

    pub fn source(&self) -> NodeId { self.source }

    pub fn reaches(&self, dest: NodeId) -> bool {
        self.depth.get(dest.index()).map_or(false, |d| d.is_some())
    }

    /// Number of hops on the chosen path.
    pub fn depth(&self, dest: NodeId) -> Option<u32> {
        *self.depth.get(dest.index())?
    }

    /// Hops from the root to `dest`. Empty for the root itself.
    pub fn hops_to(&self, dest: NodeId) -> Option<HopPath> {
        if !self.reaches(dest) {
            return None;
        }
        let mut path = HopPath::new();
        let mut cursor = dest;
        while let Some((prev, hop)) = self.parent[cursor.index()] {
            path.push(hop);
            cursor = prev;
        }
        path.reverse();
        Some(path)
    }
}

/// One shortest-path tree per source unit, indexed by node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathTable {
    trees: Vec<ShortestPathTree>,
}

impl PathTable {
    pub fn compute(graph: &ConversionGraph, config: &EngineConfig) -> Self {
        let n = graph.unit_count();
        let trees: Vec<ShortestPathTree> = if n >= config.parallel_threshold {
            (0..n).into_par_iter().map(|i| ShortestPathTree::grow(graph, NodeId::new(i))).collect()
        } else {
            (0..n).map(|i| ShortestPathTree::grow(graph, NodeId::new(i))).collect()
        };
        Self { trees }
    }

    pub fn tree(&self, source: NodeId) -> Option<&ShortestPathTree> {
        self.trees.get(source.index())
    }

    pub fn hops(&self, source: NodeId, dest: NodeId) -> Option<HopPath> {
        self.tree(source)?.hops_to(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::closure::transitive_closure;
    use crate::store::{Conversion, Unit, UnitId, UnitType};

    fn build(ids: &[u32], conversions: &[Conversion]) -> ConversionGraph {
        let units: Vec<Unit> =
            ids.iter().map(|&id| Unit::new(id, format!("u{}", id), UnitType::Quantity)).collect();
        ConversionGraph::build(&units, conversions).unwrap()
    }

    fn node(graph: &ConversionGraph, id: u32) -> NodeId {
        graph.node_of(UnitId(id)).unwrap()
    }

    /// Unit ids visited along the chosen path, source included.
    fn visited(graph: &ConversionGraph, source: u32, dest: u32) -> Vec<u32> {
        let tree = ShortestPathTree::grow(graph, node(graph, source));
        let mut ids = vec![source];
        for hop in tree.hops_to(node(graph, dest)).unwrap() {
            let (_, head) = graph.hop_endpoints(hop).unwrap();
            ids.push(graph.unit(head).id.0);
        }
        ids
    }

    #[test]
    fn test_prefers_fewest_hops() {
        // 1 -> 2 -> 3 -> 4 and a shortcut 1 -> 5 -> 4
        let graph = build(
            &[1, 2, 3, 4, 5],
            &[
                Conversion::new(1, 2, 1.0, 0.0, false),
                Conversion::new(2, 3, 1.0, 0.0, false),
                Conversion::new(3, 4, 1.0, 0.0, false),
                Conversion::new(1, 5, 1.0, 0.0, false),
                Conversion::new(5, 4, 1.0, 0.0, false),
            ],
        );
        assert_eq!(visited(&graph, 1, 4), vec![1, 5, 4]);
    }

    #[test]
    fn test_ties_go_to_lowest_unit_id() {
        // Two 2-hop routes 1 -> 7 -> 9 and 1 -> 3 -> 9; insertion order favours 7.
        let graph = build(
            &[1, 3, 7, 9],
            &[
                Conversion::new(1, 7, 1.0, 0.0, false),
                Conversion::new(7, 9, 1.0, 0.0, false),
                Conversion::new(1, 3, 1.0, 0.0, false),
                Conversion::new(3, 9, 1.0, 0.0, false),
            ],
        );
        assert_eq!(visited(&graph, 1, 9), vec![1, 3, 9]);
    }

    #[test]
    fn test_root_path_is_empty() {
        let graph = build(&[1, 2], &[Conversion::new(1, 2, 1.0, 0.0, false)]);
        let tree = ShortestPathTree::grow(&graph, node(&graph, 1));
        assert_eq!(tree.hops_to(node(&graph, 1)).unwrap().len(), 0);
        assert_eq!(tree.depth(node(&graph, 2)), Some(1));

        let back = ShortestPathTree::grow(&graph, node(&graph, 2));
        assert!(!back.reaches(node(&graph, 1)));
        assert!(back.hops_to(node(&graph, 1)).is_none());
    }

    #[test]
    fn test_bfs_agrees_with_closure() {
        let mut conversions: Vec<Conversion> =
            (1..10).step_by(2).map(|i| Conversion::new(i, i + 1, 2.0, 0.0, i % 3 == 0)).collect();
        conversions.push(Conversion::new(2, 5, 1.0, 1.0, false));
        conversions.push(Conversion::new(10, 1, 1.0, 0.0, false));
        let graph = build(&(1..=11).collect::<Vec<_>>(), &conversions);

        let config = EngineConfig::default();
        let matrix = transitive_closure(&graph, &config);
        let table = PathTable::compute(&graph, &config);

        for i in 0..graph.unit_count() {
            for k in 0..graph.unit_count() {
                let tree = table.tree(NodeId::new(i)).unwrap();
                assert_eq!(tree.reaches(NodeId::new(k)), matrix.get(i, k), "({}, {})", i, k);
            }
        }
    }

    #[test]
    fn test_parallel_table_matches_sequential() {
        let graph = build(
            &[1, 2, 3, 4],
            &[
                Conversion::new(1, 2, 1.0, 0.0, true),
                Conversion::new(2, 3, 1.0, 0.0, true),
                Conversion::new(3, 4, 1.0, 0.0, false),
            ],
        );
        let seq = PathTable::compute(&graph, &EngineConfig { parallel_threshold: usize::MAX, ..Default::default() });
        let par = PathTable::compute(&graph, &EngineConfig { parallel_threshold: 1, ..Default::default() });
        assert_eq!(seq, par);
    }
}
