//! Reachability closure and path selection.
pub mod closure;
pub mod paths;

pub use closure::{transitive_closure, MatrixView, ReachabilityMatrix};
pub use paths::{HopPath, PathTable, ShortestPathTree};
