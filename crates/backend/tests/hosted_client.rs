//! Hosted client tests against a local stub of the REST and auth APIs.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chocolatier_backend::config::HostedConfig;
use chocolatier_backend::hosted::HostedClient;
use chocolatier_core::auth::{AuthError, AuthProvider};
use chocolatier_core::models::{CycleProductInput, Product, SeasonInput};
use chocolatier_core::store::{DataStore, StoreError};
use chocolatier_core::{Email, Money, ProductId, PurchaseCycleId};
use chrono::NaiveDate;
use secrecy::SecretString;
use serde_json::{Value, json};
use std::collections::HashMap;

const ANON_KEY: &str = "anon-test-key";
const USER_ID: &str = "7b1d7c0e-3f7a-4b7e-9a55-0d2f4d5c9e11";

#[derive(Default)]
struct Hits {
    season_lists: AtomicUsize,
    product_reads: AtomicUsize,
    product_disabled: AtomicBool,
}

fn season_row(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": null,
        "start_date": "2026-02-01",
        "end_date": "2026-02-14",
        "created_at": "2026-01-01T00:00:00Z"
    })
}

async fn list_seasons(State(hits): State<Arc<Hits>>, headers: HeaderMap) -> impl IntoResponse {
    hits.season_lists.fetch_add(1, Ordering::SeqCst);
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "no api key"})));
    }
    (StatusCode::OK, Json(json!([season_row(1, "Valentine's")])))
}

async fn create_season(headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let prefer = headers
        .get("Prefer")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if prefer != "return=representation" {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "missing Prefer"})));
    }
    let name = body["name"].as_str().unwrap_or_default().to_string();
    (StatusCode::CREATED, Json(json!([season_row(2, &name)])))
}

async fn create_cycle_product() -> impl IntoResponse {
    (
        StatusCode::CONFLICT,
        Json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"cycle_products_cycle_id_product_id_key\"",
            "details": "Key (cycle_id, product_id)=(1, 1) already exists.",
            "hint": null
        })),
    )
}

async fn get_products(State(hits): State<Arc<Hits>>) -> impl IntoResponse {
    hits.product_reads.fetch_add(1, Ordering::SeqCst);
    Json(json!([{
        "id": 4,
        "name": "Ruby Heart Box",
        "description": "",
        "price": 34.0,
        "image_url": null,
        "season_id": null,
        "is_available": !hits.product_disabled.load(Ordering::SeqCst),
        "is_featured": false,
        "created_at": "2026-01-01T00:00:00Z"
    }]))
}

async fn delete_products() -> impl IntoResponse {
    Json(json!([]))
}

async fn token(
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if params.get("grant_type").map(String::as_str) != Some("password") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "unsupported_grant_type"})));
    }
    if body["password"] == "cocoa-nibs-123" {
        (
            StatusCode::OK,
            Json(json!({
                "access_token": "token-abc",
                "token_type": "bearer",
                "user": {"id": USER_ID, "email": body["email"]}
            })),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": "Invalid login credentials"})),
        )
    }
}

async fn user(headers: HeaderMap) -> impl IntoResponse {
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some("Bearer token-abc") => (
            StatusCode::OK,
            Json(json!({"id": USER_ID, "email": "buyer@example.com"})),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"msg": "invalid JWT"}))),
    }
}

async fn spawn_stub() -> (HostedClient, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route("/rest/v1/seasons", get(list_seasons).post(create_season))
        .route("/rest/v1/cycle_products", post(create_cycle_product))
        .route("/rest/v1/products", get(get_products).delete(delete_products))
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = HostedConfig::new(&format!("http://{addr}"), SecretString::from(ANON_KEY)).unwrap();
    (HostedClient::new(&config), hits)
}

#[tokio::test]
async fn test_season_list_is_cached_until_a_write() {
    let (client, hits) = spawn_stub().await;

    let first = client.list_seasons().await.unwrap();
    let second = client.list_seasons().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].name, "Valentine's");
    assert_eq!(hits.season_lists.load(Ordering::SeqCst), 1);

    let created = client
        .create_season(&SeasonInput {
            name: "Easter".to_string(),
            description: None,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
        })
        .await
        .unwrap();
    assert_eq!(created.name, "Easter");

    client.list_seasons().await.unwrap();
    assert_eq!(hits.season_lists.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_fresh_product_read_skips_cache() {
    let (client, hits) = spawn_stub().await;
    let id = ProductId::new(4);

    assert!(client.get_product(id).await.unwrap().unwrap().is_available);
    assert!(client.get_product(id).await.unwrap().unwrap().is_available);
    assert_eq!(hits.product_reads.load(Ordering::SeqCst), 1);

    // Disabled by another process; the cached copy is stale
    hits.product_disabled.store(true, Ordering::SeqCst);
    assert!(client.get_product(id).await.unwrap().unwrap().is_available);

    let fresh = client.get_product_fresh(id).await.unwrap().unwrap();
    assert!(!fresh.is_available);
    assert_eq!(fresh.price, Money::from_cents(3400));
    assert_eq!(hits.product_reads.load(Ordering::SeqCst), 2);

    // The fresh read refreshes the cache
    assert!(!client.get_product(id).await.unwrap().unwrap().is_available);
    assert_eq!(hits.product_reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unique_violation_is_conflict() {
    let (client, _) = spawn_stub().await;
    let product: Product = serde_json::from_value(json!({
        "id": 1,
        "name": "Bark",
        "description": "",
        "price": "12.00",
        "image_url": null,
        "season_id": null,
        "is_available": true,
        "is_featured": false,
        "created_at": "2026-01-01T00:00:00Z"
    }))
    .unwrap();
    let input = CycleProductInput::snapshot(PurchaseCycleId::new(1), &product, Some(Money::from_cents(1000)), true);
    let result = client.create_cycle_product(&input).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn test_empty_delete_is_not_found() {
    let (client, _) = spawn_stub().await;
    let result = client.delete_product(ProductId::new(42)).await;
    assert!(matches!(result, Err(StoreError::NotFound { entity: "product" })));
}

#[tokio::test]
async fn test_sign_in_and_current_user() {
    let (client, _) = spawn_stub().await;
    let email = Email::parse("buyer@example.com").unwrap();

    let session = client.sign_in(&email, "cocoa-nibs-123").await.unwrap();
    assert_eq!(session.access_token, "token-abc");
    assert_eq!(session.user.email, email);

    let user = client.current_user("token-abc").await.unwrap().unwrap();
    assert_eq!(user.id.to_string(), USER_ID);
    assert!(client.current_user("stale").await.unwrap().is_none());
}

#[tokio::test]
async fn test_wrong_password_is_invalid_credentials() {
    let (client, _) = spawn_stub().await;
    let email = Email::parse("buyer@example.com").unwrap();
    let result = client.sign_in(&email, "wrong").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}
