//! Product routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{AppJson, AuthUser};
use crate::domain::aggregates::Product;
use crate::domain::value_objects::Money;
use crate::error::AppError;
use crate::services::catalog::{ProductInput, ProductPatch};
use crate::state::AppState;
use crate::store::{Page, ProductFilter, ProductOrdering, ProductQuery};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/commercial/api/products/", get(list_products).post(create_product))
        .route("/commercial/api/products/:id/", get(get_product).put(replace_product).patch(update_product).delete(delete_product))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub name: Option<String>,
    pub price: Option<Money>,
    pub score: Option<i32>,
    pub ordering: Option<String>,
}

async fn list_products(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Product>>, AppError> {
    let query = ProductQuery {
        page: state.page(params.page, params.page_size),
        ordering: params.ordering.as_deref().and_then(ProductOrdering::parse),
        filter: ProductFilter { name: params.name, price: params.price, score: params.score },
    };
    Ok(Json(state.catalog().list(query).await?))
}

async fn get_product(State(state): State<AppState>, _user: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().get(id).await?))
}

async fn create_product(
    State(state): State<AppState>,
    _user: AuthUser,
    AppJson(input): AppJson<ProductInput>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = state.catalog().create(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn replace_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(input): AppJson<ProductInput>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().replace(id, input).await?))
}

async fn update_product(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(patch): AppJson<ProductPatch>,
) -> Result<Json<Product>, AppError> {
    Ok(Json(state.catalog().update(id, patch).await?))
}

async fn delete_product(State(state): State<AppState>, _user: AuthUser, Path(id): Path<Uuid>) -> Result<StatusCode, AppError> {
    state.catalog().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
