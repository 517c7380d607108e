//! Quoting error taxonomy
//!
//! Every failure in the quoting workflow is local to the affected row or
//! option. Callers decide between reporting, reverting and retrying based on
//! the variant; [`QuoteError::is_retryable`] captures the retry split.

use miette::Diagnostic;
use thiserror::Error;

/// Errors raised by sizing, persistence and reorder operations
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum QuoteError {
    /// Bad physical parameters supplied to accessory sizing
    #[error("invalid sizing input: {0}")]
    #[diagnostic(
        code(pq::sizing::invalid_input),
        help("weights and dimensions must be non-negative numbers; spring count must be at least 1")
    )]
    InvalidSizingInput(String),

    /// Reference data could not be read; no price may be substituted
    #[error("catalog unavailable: {0}")]
    #[diagnostic(
        code(pq::catalog::unavailable),
        help("check the files under catalog/ and retry")
    )]
    CatalogUnavailable(String),

    /// The store declined an edit, reorder or accessory save
    #[error("change rejected: {0}")]
    #[diagnostic(code(pq::store::rejected))]
    PersistenceRejected(String),

    /// The store could not be reached or did not answer
    #[error("store unreachable: {0}")]
    #[diagnostic(code(pq::store::unreachable), help("retry the command"))]
    NetworkFailure(String),

    #[error("{kind} not found: {id}")]
    #[diagnostic(code(pq::not_found))]
    NotFound { kind: &'static str, id: String },

    /// Reorder request that does not describe a permutation of one option
    #[error("invalid reorder: {0}")]
    #[diagnostic(
        code(pq::reorder::invalid),
        help("items can only be moved among rows of the same option")
    )]
    InvalidReorder(String),
}

impl QuoteError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        QuoteError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Transient failures that may succeed on a manual retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            QuoteError::CatalogUnavailable(_) | QuoteError::NetworkFailure(_)
        )
    }
}
