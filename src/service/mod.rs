//! Rebuild trigger, snapshot publication and the API handlers on top of them.
pub mod api;
pub mod rebuild;

pub use api::{ErrorPayload, ReadingViews, RefreshOutcome, RefreshRequest};
pub use rebuild::{ConversionService, RebuildStatus};
