//! Commerce service errors.

use serde_json::Value;
use thiserror::Error;

use crate::store::RepositoryError;
use crate::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum CommerceError {
    /// Resource absent, or not owned by the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rejected input; the body is returned to the client as-is.
    #[error("invalid input")]
    Invalid(Value),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl CommerceError {
    pub fn fields(errors: FieldErrors) -> Self {
        Self::Invalid(serde_json::to_value(errors).unwrap_or_default())
    }
}
