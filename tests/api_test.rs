//! End-to-end HTTP tests against the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use opensase_webstore::store::MemoryStore;
use opensase_webstore::{router, AppConfig, AppState, EventPublisher};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

fn app() -> Router {
    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some(SECRET.to_string()),
        _ => None,
    })
    .unwrap();
    router(AppState::new(Arc::new(MemoryStore::new()), &config, EventPublisher::disabled()))
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, value)
}

async fn register(app: &Router, username: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/authentication/api/users/",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@testing.com"),
            "password": "s3cure-pass",
            "password2": "s3cure-pass",
            "first_name": "Test",
            "last_name": "User",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn login(app: &Router, username: &str) -> String {
    register(app, username).await;
    let (status, body) = send(
        app,
        Method::POST,
        "/authentication/api/token/",
        None,
        Some(json!({ "username": username, "password": "s3cure-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access"].as_str().unwrap().to_string()
}

async fn product(app: &Router, token: &str, price: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/commercial/api/products/",
        Some(token),
        Some(json!({ "name": "test product", "price": price, "score": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

fn amount(value: &Value) -> String { value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string()) }

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_registration_never_returns_password() {
    let app = app();
    let created = register(&app, "test").await;
    assert!(created.get("password").is_none());
    assert!(created.get("password_hash").is_none());

    let token = login(&app, "other").await;
    let uri = format!("/authentication/api/users/{}/", created["id"].as_str().unwrap());
    let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "test");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_registration_field_errors() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/authentication/api/users/",
        None,
        Some(json!({ "username": "test", "email": "nope", "password": "s3cure-pass", "password2": "different" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email").is_some());
    assert!(body.get("password").is_some());
    assert!(body.get("first_name").is_some());
}

#[tokio::test]
async fn test_token_refresh_and_bad_credentials() {
    let app = app();
    register(&app, "test").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/authentication/api/token/",
        None,
        Some(json!({ "username": "test", "password": "wrong-pass" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "No active account found with the given credentials");

    let (_, pair) = send(
        &app,
        Method::POST,
        "/authentication/api/token/",
        None,
        Some(json!({ "username": "test", "password": "s3cure-pass" })),
    )
    .await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/authentication/api/token/refresh/",
        None,
        Some(json!({ "refresh": pair["refresh"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let access = body["access"].as_str().unwrap();

    let (status, _) = send(&app, Method::GET, "/commercial/api/products/", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::POST,
        "/authentication/api/token/refresh/",
        None,
        Some(json!({ "refresh": pair["access"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_commercial_routes_require_token() {
    let app = app();
    let (status, _) = send(&app, Method::GET, "/commercial/api/products/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/commercial/api/carts/get-cart/", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_product_crud() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "10.50").await;
    let uri = format!("/commercial/api/products/{id}/");

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&token), Some(json!({ "price": "100.00" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(amount(&body["price"]), "100.00");
    assert_eq!(body["name"], "test product");

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "name": "renamed", "price": "5.00" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "renamed");
    assert_eq!(body["score"], Value::Null);

    let (status, body) = send(&app, Method::POST, "/commercial/api/products/", Some(&token), Some(json!({ "score": -1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("name").is_some());
    assert!(body.get("price").is_some());
    assert!(body.get("score").is_some());

    let (status, _) = send(&app, Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_list_filters_orders_and_pages() {
    let app = app();
    let token = login(&app, "test").await;
    for price in ["30.00", "10.00", "20.00"] {
        product(&app, &token, price).await;
    }

    let (status, body) =
        send(&app, Method::GET, "/commercial/api/products/?ordering=-price&page_size=2", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(body["next"], 2);
    assert_eq!(body["previous"], Value::Null);
    let prices: Vec<String> = body["results"].as_array().unwrap().iter().map(|p| amount(&p["price"])).collect();
    assert_eq!(prices, vec!["30.00", "20.00"]);

    let (_, body) = send(&app, Method::GET, "/commercial/api/products/?price=10.00", Some(&token), None).await;
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn test_cart_freight_threshold() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "200.00").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(amount(&body["subtotal_price"]), "200.00");
    assert_eq!(amount(&body["total_freight"]), "10.00");
    assert_eq!(amount(&body["total_price"]), "210.00");
    assert_eq!(body["items"][0]["product"]["id"], id.as_str());

    let (_, body) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id }, { "product_id": id }] })),
    )
    .await;
    assert_eq!(amount(&body["total_freight"]), "0.00");
    assert_eq!(amount(&body["total_price"]), "400.00");
}

#[tokio::test]
async fn test_cart_update_reconciles_items() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "10.50").await;

    let (_, cart) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id }, { "product_id": id }] })),
    )
    .await;
    let uri = format!("/commercial/api/carts/{}/", cart["id"].as_str().unwrap());
    let kept = cart["items"][0]["id"].clone();

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "items": [{ "id": kept, "product_id": id }, { "product_id": id, "price": "1.00" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], kept);
    assert_ne!(items[1]["id"], cart["items"][1]["id"]);
    assert_eq!(amount(&items[1]["price"]), "1.00");
}

#[tokio::test]
async fn test_cart_update_with_unknown_item_persists_nothing() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "10.50").await;

    let (_, cart) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id }] })),
    )
    .await;
    let uri = format!("/commercial/api/carts/{}/", cart["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&token),
        Some(json!({ "items": [{ "product_id": id }, { "id": "018f0000-0000-7000-8000-000000000000", "product_id": id }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["items"][0]["index"], 1);
    assert_eq!(body["items"][0]["errors"]["id"][0], "Item does not exist.");

    let (_, current) = send(&app, Method::GET, "/commercial/api/carts/get-cart/", Some(&token), None).await;
    assert_eq!(current["items"].as_array().unwrap().len(), 1);
    assert_eq!(current["items"][0]["id"], cart["items"][0]["id"]);
}

#[tokio::test]
async fn test_get_and_delete_current_cart() {
    let app = app();
    let token = login(&app, "test").await;

    let (status, body) = send(&app, Method::GET, "/commercial/api/carts/get-cart/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "There isn't cart data for this user.");

    send(&app, Method::POST, "/commercial/api/carts/", Some(&token), Some(json!({}))).await;
    let (status, body) = send(&app, Method::DELETE, "/commercial/api/carts/delete-cart/", Some(&token), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["message"], "Cart deleted.");

    let (status, _) = send(&app, Method::DELETE, "/commercial/api/carts/delete-cart/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_total_includes_freight() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "10.50").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/commercial/api/orders/",
        Some(&token),
        Some(json!({ "freight": "20.00", "items": [{ "product_id": id }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(amount(&body["subtotal_price"]), "10.50");
    assert_eq!(amount(&body["total_price"]), "30.50");
    assert_eq!(body["items"][0]["order_id"], body["id"]);

    let (_, list) = send(&app, Method::GET, "/commercial/api/orders/", Some(&token), None).await;
    assert_eq!(list["count"], 1);

    let other = login(&app, "other").await;
    let uri = format!("/commercial/api/orders/{}/", body["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::GET, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_convert_without_cart_is_not_found() {
    let app = app();
    let token = login(&app, "test").await;

    let (status, _) =
        send(&app, Method::POST, "/commercial/api/orders/create-order-through-cart/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = send(&app, Method::GET, "/commercial/api/orders/", Some(&token), None).await;
    assert_eq!(list["count"], 0);
}

#[tokio::test]
async fn test_convert_cart_to_order() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "200.00").await;

    let (_, cart) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id, "price": "150.00" }] })),
    )
    .await;

    let (status, order) =
        send(&app, Method::POST, "/commercial/api/orders/create-order-through-cart/", Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED, "{order}");
    assert_eq!(amount(&order["items"][0]["price"]), "150.00");
    assert_eq!(amount(&order["freight"]), amount(&cart["total_freight"]));
    assert_eq!(amount(&order["total_price"]), amount(&cart["total_price"]));

    let (status, _) = send(&app, Method::GET, "/commercial/api/carts/get-cart/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_update_with_repeated_item_id_keeps_last_entry() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "10.50").await;

    let (_, cart) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id }] })),
    )
    .await;
    let uri = format!("/commercial/api/carts/{}/", cart["id"].as_str().unwrap());
    let item = cart["items"][0]["id"].clone();

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(&token),
        Some(json!({ "items": [
            { "id": item, "product_id": id, "price": "5.00" },
            { "id": item, "product_id": id, "price": "6.00" },
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["id"], item);
    assert_eq!(amount(&body["items"][0]["price"]), "6.00");
}

#[tokio::test]
async fn test_zero_price_uses_product_price() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "10.00").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id, "price": "0" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(amount(&body["items"][0]["price"]), "10.00");
    assert_eq!(amount(&body["subtotal_price"]), "10.00");
}

#[tokio::test]
async fn test_malformed_item_fields_reported_per_entry() {
    let app = app();
    let token = login(&app, "test").await;
    let id = product(&app, &token, "10.00").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/commercial/api/carts/",
        Some(&token),
        Some(json!({ "items": [
            { "product_id": id },
            { "product_id": id, "price": "abc" },
            { "product_id": "not-a-uuid" },
        ] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("detail").is_none());
    assert_eq!(body["items"][0]["index"], 1);
    assert_eq!(body["items"][0]["errors"]["price"][0], "A valid number is required.");
    assert_eq!(body["items"][1]["index"], 2);
    assert_eq!(body["items"][1]["errors"]["product_id"][0], "Must be a valid UUID.");

    let (status, _) = send(&app, Method::GET, "/commercial/api/carts/get-cart/", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::POST,
        "/commercial/api/orders/",
        Some(&token),
        Some(json!({ "items": [{ "product_id": id, "price": "abc" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["items"][0]["errors"]["price"][0], "A valid number is required.");
}
