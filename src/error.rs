//! Error types for the conversion engine.

use crate::store::UnitId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// The category of an [`EngineError`], stable across message wording changes.
///
/// This is what API payloads carry so callers can branch on the failure
/// without string matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    DanglingReference,
    InvalidTransform,
    DuplicateUnit,
    UnknownUnit,
    NotReachable,
    BuildInProgress,
    NotBuilt,
    Store,
    Config,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A conversion names a unit that is not in the unit set.
    #[error("Conversion {source_id} -> {destination_id} references unknown unit {missing}")]
    DanglingReference {
        source_id: UnitId,
        destination_id: UnitId,
        missing: UnitId,
    },

    /// Zero slope or a non-finite inverse on a bidirectional edge, a non-finite
    /// coefficient, a self-conversion, or a composed transform that overflows.
    #[error("Invalid transform on conversion {source_id} -> {destination_id}: {reason}")]
    InvalidTransform {
        source_id: UnitId,
        destination_id: UnitId,
        reason: String,
    },

    #[error("Unit {0} is defined more than once")]
    DuplicateUnit(UnitId),

    #[error("Unit {0} is not part of the conversion graph")]
    UnknownUnit(UnitId),

    #[error("No conversion path from unit {source_id} to unit {destination_id}")]
    NotReachable {
        source_id: UnitId,
        destination_id: UnitId,
    },

    #[error("A rebuild is already in progress, retry later")]
    BuildInProgress,

    #[error("The conversion matrix has not been built yet")]
    NotBuilt,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::DanglingReference { .. } => ErrorKind::DanglingReference,
            EngineError::InvalidTransform { .. } => ErrorKind::InvalidTransform,
            EngineError::DuplicateUnit(_) => ErrorKind::DuplicateUnit,
            EngineError::UnknownUnit(_) => ErrorKind::UnknownUnit,
            EngineError::NotReachable { .. } => ErrorKind::NotReachable,
            EngineError::BuildInProgress => ErrorKind::BuildInProgress,
            EngineError::NotBuilt => ErrorKind::NotBuilt,
            EngineError::Store(_) => ErrorKind::Store,
            EngineError::Config(_) => ErrorKind::Config,
        }
    }

    /// True for failures that go away on retry (a rebuild in flight, or no build yet).
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::BuildInProgress | EngineError::NotBuilt)
    }

    /// True when the error came out of graph construction and rejected a rebuild.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            EngineError::DanglingReference { .. }
                | EngineError::InvalidTransform { .. }
                | EngineError::DuplicateUnit(_)
        )
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Store(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Store(e.to_string())
    }
}
