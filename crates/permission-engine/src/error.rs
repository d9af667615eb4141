//! Error types for permission combination
//!
//! Sparse or absent categories are never errors. These variants only cover
//! structurally malformed input, which is fatal to the single document being
//! parsed or combined.

use thiserror::Error;

use crate::category::Category;
use crate::document::DocumentKind;

/// Permission engine error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A record is missing its key field or is not an object
    #[error("Malformed {category} record at index {index}: {reason}")]
    MalformedRecord {
        /// Category the record belongs to
        category: Category,
        /// Position of the record within its category list
        index: usize,
        /// What is wrong with the record
        reason: String,
    },

    /// A category field holds a scalar instead of a record or list of records
    #[error("Malformed {0} category: expected a record or a list of records")]
    MalformedCategory(Category),

    /// The document itself is not a metadata object
    #[error("Malformed {kind} document: {reason}")]
    MalformedDocument {
        /// Kind of document being parsed
        kind: DocumentKind,
        /// What is wrong with the document
        reason: String,
    },

    /// A document of the wrong kind was passed to a combiner
    #[error("Expected a {expected} document, got {actual} document '{name}'")]
    UnexpectedKind {
        /// Kind the combiner accepts
        expected: &'static str,
        /// Kind that was supplied
        actual: DocumentKind,
        /// Full name of the offending document
        name: String,
    },
}

/// Result type for permission engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Get a stable error code for reports and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            EngineError::MalformedRecord { .. } => "MALFORMED_RECORD",
            EngineError::MalformedCategory(_) => "MALFORMED_CATEGORY",
            EngineError::MalformedDocument { .. } => "MALFORMED_DOCUMENT",
            EngineError::UnexpectedKind { .. } => "UNEXPECTED_KIND",
        }
    }

    /// The category involved, if the error is scoped to one.
    pub fn category(&self) -> Option<Category> {
        match self {
            EngineError::MalformedRecord { category, .. } => Some(*category),
            EngineError::MalformedCategory(category) => Some(*category),
            _ => None,
        }
    }
}
