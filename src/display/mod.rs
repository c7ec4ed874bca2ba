//! Human-readable renderings of engine results.
pub mod trace;

pub use trace::format_trace;
