//! Error taxonomy for form submission.
//!
//! - `ValidationError`: raised synchronously before anything is sent; the
//!   coordinator stays `Idle` and the collaborator is never called.
//! - `SubmitFailure`: the collaborator reported failure; buffers are retained.
//!
//! Soft parse errors (individual batch entries failing a format check) are not
//! errors at all: they are counted in `ParseSummary::skipped`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("`{field}` is required")]
    MissingField { field: String },
    #[error("`{field}` must contain at least one entry")]
    EmptyBatch { field: String },
    #[error("`{field}` must be one of: {allowed}")]
    InvalidChoice { field: String, allowed: String },
    #[error("payload has no field `{field}`")]
    UnknownField { field: String },
}

/// Failure reported by the submit collaborator, carrying a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("submission failed: {reason}")]
pub struct SubmitFailure {
    pub reason: String,
}

impl SubmitFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Submission(#[from] SubmitFailure),
}
