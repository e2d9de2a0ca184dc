//! HTTP surface.
//!
//! Account routes live under `/authentication/api/`, catalog, cart and order
//! routes under `/commercial/api/`. Paths keep their trailing slash.

mod auth;
mod carts;
mod dto;
mod extract;
mod orders;
mod products;

use axum::{routing::get, Json, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-webstore"})) }))
        .merge(auth::routes())
        .merge(products::routes())
        .merge(carts::routes())
        .merge(orders::routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(state)
}
