//! Authentication error types.

use thiserror::Error;

use crate::store::RepositoryError;
use crate::validation::FieldErrors;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration input rejected, keyed by field.
    #[error("invalid registration")]
    Invalid(FieldErrors),

    /// Unknown username or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed, expired or wrong-kind bearer token.
    #[error("invalid token")]
    InvalidToken,

    /// Token refers to a user that no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Token could not be signed.
    #[error("token encoding error: {0}")]
    TokenEncoding(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
