//! Handlers behind the dashboard's conversion-array routes.
//!
//! Transport-agnostic: each handler returns a serializable body or an
//! [`ErrorPayload`] carrying the HTTP status the route layer should use.

use super::rebuild::ConversionService;
use crate::analysis::MatrixView;
use crate::error::{EngineError, ErrorKind, Result};
use crate::store::{ConversionStore, UnitId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Structured error body. Internal errors never leak as anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
}

impl From<EngineError> for ErrorPayload {
    fn from(e: EngineError) -> Self {
        let status = match e.kind() {
            ErrorKind::NotBuilt => 503,
            ErrorKind::BuildInProgress => 409,
            ErrorKind::UnknownUnit => 404,
            ErrorKind::NotReachable => 422,
            ErrorKind::DanglingReference
            | ErrorKind::InvalidTransform
            | ErrorKind::DuplicateUnit
            | ErrorKind::Store
            | ErrorKind::Config => 500,
        };
        Self { kind: e.kind(), status, message: e.to_string() }
    }
}

/// Body of the refresh route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Rebuild the graph and closure from the store.
    #[serde(default)]
    pub redo_cik: bool,
    /// Refresh the downstream reading views.
    #[serde(default)]
    pub refresh_reading_views: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub rebuilt_generation: Option<u64>,
    pub reading_views_refreshed: bool,
}

/// Composed transform for one pair, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionView {
    pub source_id: UnitId,
    pub destination_id: UnitId,
    pub slope: f64,
    pub intercept: f64,
    pub hops: usize,
}

/// Downstream cached views that depend on the conversion matrix.
pub trait ReadingViews {
    fn refresh_all(&self) -> Result<()>;
}

/// GET: the last successfully computed matrix.
pub fn get_conversion_array<S: ConversionStore>(
    service: &ConversionService<S>,
) -> std::result::Result<MatrixView, ErrorPayload> {
    Ok(service.snapshot()?.matrix().to_view())
}

/// POST refresh: rebuild and/or refresh reading views.
///
/// Views are only refreshed after a requested rebuild succeeded.
pub fn post_refresh<S, V>(
    service: &ConversionService<S>,
    request: &RefreshRequest,
    views: &V,
) -> std::result::Result<RefreshOutcome, ErrorPayload>
where
    S: ConversionStore,
    V: ReadingViews + ?Sized,
{
    let rebuilt_generation = if request.redo_cik {
        let snapshot = service.try_refresh().map_err(|e| {
            warn!(error = %e, "refresh request could not rebuild");
            ErrorPayload::from(e)
        })?;
        Some(snapshot.generation())
    } else {
        None
    };

    if request.refresh_reading_views {
        views.refresh_all()?;
    }

    Ok(RefreshOutcome { rebuilt_generation, reading_views_refreshed: request.refresh_reading_views })
}

/// GET: composed transform between two units.
pub fn get_conversion<S: ConversionStore>(
    service: &ConversionService<S>,
    source: UnitId,
    destination: UnitId,
) -> std::result::Result<ConversionView, ErrorPayload> {
    let snapshot = service.snapshot()?;
    let transform = snapshot.transform(source, destination)?;
    let hops = snapshot.path(source, destination)?.len();
    Ok(ConversionView {
        source_id: source,
        destination_id: destination,
        slope: transform.slope,
        intercept: transform.intercept,
        hops,
    })
}
