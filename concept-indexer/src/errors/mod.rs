//! Error types for the indexing engine.

use concept_indexer_repository::StoreError;
use thiserror::Error;

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No search cluster client has been delivered yet.
    #[error("no search cluster client available")]
    Unavailable,

    /// The all-ids stream consumer went away before the scroll completed.
    /// Logged by the producer, never surfaced to callers.
    #[error("stream consumer went away before the scroll completed")]
    Cancelled,

    /// A store operation failed; carries the upstream status when known.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Upstream status code, when the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Store(err) => err.status(),
            _ => None,
        }
    }
}
