//! The conversion graph: units as nodes, direct conversions as hops.
pub mod dag;
pub mod edge;
pub mod transform;

pub use dag::{ConversionGraph, Neighbor, Neighbors};
pub use edge::{Direction, Hop};
pub use transform::Transform;

/// A unit's position in the graph. Positions follow ascending `UnitId`.
pub type NodeId = petgraph::graph::NodeIndex;

/// One traversable hop (a conversion, or the reverse of a bidirectional one).
pub type HopId = petgraph::graph::EdgeIndex;
