//! Request-level error taxonomy shared by storage, ingestion and the engines.

use crate::data::provider::ProviderError;
use thiserror::Error;

/// Errors surfaced by the snapshot store, the ingestor and the query engines.
///
/// `Validation` and `NotFound` are fatal to a single request. `Provider` is
/// produced during ingestion and is downgraded to a skipped asset by the batch
/// update; it never reaches a query caller.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl CycleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type CycleResult<T> = Result<T, CycleError>;
