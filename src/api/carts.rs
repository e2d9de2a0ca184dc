//! Cart routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::dto::CartResponse;
use super::extract::{AppJson, AuthUser};
use crate::error::AppError;
use crate::services::carts::CartInput;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/commercial/api/carts/", post(create_cart))
        .route("/commercial/api/carts/get-cart/", get(current_cart))
        .route("/commercial/api/carts/delete-cart/", delete(delete_current_cart))
        .route("/commercial/api/carts/:id/", put(update_cart).patch(update_cart))
}

async fn create_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<CartInput>,
) -> Result<(StatusCode, Json<CartResponse>), AppError> {
    let cart = state.carts().create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

async fn update_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<CartInput>,
) -> Result<Json<CartResponse>, AppError> {
    let cart = state.carts().update(user.id, id, input).await?;
    Ok(Json(cart.into()))
}

async fn current_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<CartResponse>, AppError> {
    let cart = state.carts().current(user.id).await?;
    Ok(Json(cart.into()))
}

async fn delete_current_cart(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<(StatusCode, Json<Value>), AppError> {
    state.carts().delete_current(user.id).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": "Cart deleted." }))))
}
