//! Unit-conversion reachability engine for a metering dashboard.
//!
//! Units and direct conversions come from an external store. The engine
//! builds a conversion graph, computes which units can be converted into
//! which (the reachability matrix), and composes the affine transform along a
//! deterministic shortest path for any reachable pair. Every edit to the store
//! triggers a full rebuild; readers always see a complete snapshot.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod error;
pub mod graph;
pub mod service;
pub mod store;

pub use analysis::{MatrixView, ReachabilityMatrix};
pub use compute::{Engine, Snapshot};
pub use config::EngineConfig;
pub use error::{EngineError, ErrorKind, Result};
pub use graph::{ConversionGraph, Transform};
pub use service::{ConversionService, RebuildStatus};
pub use store::{Conversion, ConversionStore, Registry, Unit, UnitId, UnitType};
