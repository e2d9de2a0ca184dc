//! HTTP error mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::CommerceError;
use crate::store::RepositoryError;

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";
const BAD_TOKEN: &str = "Given token not valid for any token type";
const NO_CREDENTIALS: &str = "Authentication credentials were not provided.";

/// Application-level error type for every handler.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),

    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// No bearer token on a protected route.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Body could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, Value) {
        match self {
            Self::Auth(AuthError::Invalid(fields)) => (StatusCode::BAD_REQUEST, json!(fields)),
            Self::Auth(AuthError::InvalidCredentials) => (StatusCode::UNAUTHORIZED, json!({ "detail": BAD_CREDENTIALS })),
            Self::Auth(AuthError::InvalidToken | AuthError::UserNotFound) => {
                (StatusCode::UNAUTHORIZED, json!({ "detail": BAD_TOKEN }))
            }
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, json!({ "detail": NO_CREDENTIALS })),
            Self::Commerce(CommerceError::Invalid(body)) => (StatusCode::BAD_REQUEST, body.clone()),
            Self::Commerce(CommerceError::NotFound(message)) | Self::NotFound(message) => {
                (StatusCode::NOT_FOUND, json!({ "error": message }))
            }
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, json!({ "detail": message })),
            Self::Auth(AuthError::Repository(_) | AuthError::TokenEncoding(_) | AuthError::PasswordHash)
            | Self::Commerce(CommerceError::Repository(_))
            | Self::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "detail": "Internal server error" })),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}
