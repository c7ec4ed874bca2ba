//! Runs the closure and answers conversion queries.
pub mod engine;
pub mod snapshot;

pub use engine::{Closure, Engine};
pub use snapshot::{PathStep, Snapshot};
