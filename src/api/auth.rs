//! Token and user routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::extract::{AppJson, AuthUser};
use crate::domain::aggregates::User;
use crate::error::AppError;
use crate::services::auth::{Registration, TokenPair};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/authentication/api/token/", post(obtain_token))
        .route("/authentication/api/token/refresh/", post(refresh_token))
        .route("/authentication/api/users/", post(register))
        .route("/authentication/api/users/:id/", get(get_user))
}

#[derive(Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: String,
}

async fn obtain_token(State(state): State<AppState>, AppJson(body): AppJson<Credentials>) -> Result<Json<TokenPair>, AppError> {
    let pair = state.auth().obtain_pair(&body.username, &body.password).await?;
    Ok(Json(pair))
}

async fn refresh_token(State(state): State<AppState>, AppJson(body): AppJson<RefreshRequest>) -> Result<Json<Value>, AppError> {
    let access = state.auth().refresh(&body.refresh).await?;
    Ok(Json(json!({ "access": access })))
}

async fn register(
    State(state): State<AppState>,
    AppJson(form): AppJson<Registration>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.auth().register(form).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(state): State<AppState>, _caller: AuthUser, Path(id): Path<Uuid>) -> Result<Json<User>, AppError> {
    state
        .auth()
        .find_user(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Not found.".into()))
}
