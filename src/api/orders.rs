//! Order routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::dto::OrderResponse;
use super::extract::{AppJson, AuthUser};
use crate::error::AppError;
use crate::services::orders::OrderInput;
use crate::state::AppState;
use crate::store::Page;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/commercial/api/orders/", get(list_orders).post(create_order))
        .route("/commercial/api/orders/create-order-through-cart/", post(create_order_from_cart))
        .route("/commercial/api/orders/:id/", get(get_order).put(update_order).patch(update_order).delete(delete_order))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

async fn list_orders(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<OrderResponse>>, AppError> {
    let page = state.orders().list(user.id, state.page(params.page, params.page_size)).await?;
    Ok(Json(page.map(OrderResponse::from)))
}

async fn create_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    AppJson(input): AppJson<OrderInput>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = state.orders().create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn create_order_from_cart(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let order = state.orders().create_from_cart(user.id).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn get_order(State(state): State<AppState>, AuthUser(user): AuthUser, Path(id): Path<Uuid>) -> Result<Json<OrderResponse>, AppError> {
    Ok(Json(state.orders().get(user.id, id).await?.into()))
}

async fn update_order(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<OrderInput>,
) -> Result<Json<OrderResponse>, AppError> {
    Ok(Json(state.orders().update(user.id, id, input).await?.into()))
}

async fn delete_order(State(state): State<AppState>, AuthUser(user): AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.orders().delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
