//! Error types for permission export
//!
//! Store errors abort the export run. Engine errors are scoped to one
//! entity and end up in the report as failures instead.

use permission_engine::EngineError;
use thiserror::Error;

use crate::config::ConfigError;

/// Metadata store error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested entity does not exist
    ///
    /// Stores may report absence this way instead of an empty response.
    /// The exporter reads it as a missing entity, not a failed run.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Metadata type of the entity
        kind: String,
        /// API name of the entity
        name: String,
    },

    /// Too many names in one read call
    #[error("Request too large: {requested} names requested, limit is {limit}")]
    RequestTooLarge {
        /// Maximum names per call
        limit: usize,
        /// Names in the rejected call
        requested: usize,
    },

    /// The store is temporarily unavailable
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("Store error: {0}")]
    Backend(String),
}

/// Result type for metadata store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Fold an explicit [`StoreError::NotFound`] into an absent value.
pub(crate) fn absent_if_not_found<T>(result: StoreResult<Option<T>>) -> StoreResult<Option<T>> {
    match result {
        Err(StoreError::NotFound { kind, name }) => {
            tracing::debug!(kind = %kind, name = %name, "Store reported entity not found");
            Ok(None)
        }
        other => other,
    }
}

impl StoreError {
    /// Check if retrying the call might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// Get error code for reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            StoreError::NotFound { .. } => "NOT_FOUND",
            StoreError::RequestTooLarge { .. } => "REQUEST_TOO_LARGE",
            StoreError::Unavailable(_) => "STORE_UNAVAILABLE",
            StoreError::Backend(_) => "STORE_ERROR",
        }
    }
}

/// Export error types.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing was requested
    #[error("Provide at least one profile, permission set, permission set group or user name")]
    EmptyRequest,

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The metadata store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store answered a read with something that is not a document
    /// or a list of documents
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    /// Get error code for logs and callers.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExportError::EmptyRequest => "EMPTY_REQUEST",
            ExportError::Config(_) => "CONFIG_ERROR",
            ExportError::Store(e) => e.error_code(),
            ExportError::Engine(e) => e.error_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(StoreError::Unavailable("timeout".to_string()).is_retryable());
        assert!(!StoreError::Backend("boom".to_string()).is_retryable());
        assert!(!StoreError::RequestTooLarge { limit: 10, requested: 11 }.is_retryable());
        assert!(!StoreError::NotFound {
            kind: "Profile".to_string(),
            name: "Admin".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_export_error_codes() {
        assert_eq!(ExportError::EmptyRequest.error_code(), "EMPTY_REQUEST");
        let store: ExportError = StoreError::Backend("boom".to_string()).into();
        assert_eq!(store.error_code(), "STORE_ERROR");
        assert_eq!(store.to_string(), "Store error: boom");
    }

    #[test]
    fn test_not_found_reads_as_absent() {
        let missing: StoreResult<Option<u32>> = Err(StoreError::NotFound {
            kind: "User".to_string(),
            name: "ghost@example.com".to_string(),
        });
        assert_eq!(absent_if_not_found(missing), Ok(None));
        assert_eq!(absent_if_not_found(Ok(Some(3))), Ok(Some(3)));

        let down: StoreResult<Option<u32>> = Err(StoreError::Unavailable("down".to_string()));
        assert_eq!(absent_if_not_found(down.clone()), down);
    }
}
