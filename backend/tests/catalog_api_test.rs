//! Integration tests for the catalog HTTP API

use async_trait::async_trait;
use recipe_cart_backend::{
    api::catalog::{CategoryListResponse, ProductListResponse, SearchResponse},
    app::{build_router, HealthResponse, REQUEST_ID_HEADER},
    assistant::{ChatTurn, CompletionClient},
    catalog::{CatalogDb, Product},
    config::Config,
    error::AppError,
    state::AppState,
};
use std::sync::Arc;
use tempfile::TempDir;

struct UnusedClient;

#[async_trait]
impl CompletionClient for UnusedClient {
    async fn complete(&self, _messages: &[ChatTurn]) -> Result<String, AppError> {
        Err(AppError::Completion("not used".to_string()))
    }
}

/// Serve the app on an ephemeral port backed by a fresh seeded database
async fn spawn_app() -> (String, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");
    let catalog = CatalogDb::new(db_path.to_str().unwrap()).await.unwrap();
    let state = AppState::new(catalog, Arc::new(UnusedClient), Config::default());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(state)).await.unwrap();
    });

    (format!("http://{}", addr), dir)
}

#[tokio::test]
async fn test_health_reports_seeded_catalog() {
    let (base, _dir) = spawn_app().await;

    let health: HealthResponse = reqwest::get(format!("{}/api/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health.status, "healthy");
    assert_eq!(health.product_count, 80);
}

#[tokio::test]
async fn test_hello_world_carries_request_id() {
    let (base, _dir) = spawn_app().await;

    let response = reqwest::get(&base).await.unwrap();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap();
    assert_eq!(request_id.len(), 36);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_list_all_products() {
    let (base, _dir) = spawn_app().await;

    let list: ProductListResponse = reqwest::get(format!("{}/api/products", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(list.count, 80);
    assert_eq!(list.products.len(), 80);
    assert!(list.products.iter().all(|p| p.is_active));
}

#[tokio::test]
async fn test_filter_by_category_and_keyword() {
    let (base, _dir) = spawn_app().await;
    let client = reqwest::Client::new();

    let baking: ProductListResponse = client
        .get(format!("{}/api/products", base))
        .query(&[("category", "baking")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(baking.count, 7);
    assert!(baking
        .products
        .iter()
        .all(|p| p.category.as_deref() == Some("baking")));

    // Keyword matches brand as well as name
    let brand: ProductListResponse = client
        .get(format!("{}/api/products", base))
        .query(&[("q", "KING ARTHUR")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(brand.count, 2);

    let combined: ProductListResponse = client
        .get(format!("{}/api/products", base))
        .query(&[("q", "flour"), ("category", "dairy")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(combined.count, 0);
}

#[tokio::test]
async fn test_wildcards_are_literal() {
    let (base, _dir) = spawn_app().await;

    let list: ProductListResponse = reqwest::Client::new()
        .get(format!("{}/api/products", base))
        .query(&[("q", "%")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.count, 0);
}

#[tokio::test]
async fn test_search_returns_summaries() {
    let (base, _dir) = spawn_app().await;

    let search: SearchResponse = reqwest::Client::new()
        .get(format!("{}/api/search", base))
        .query(&[("q", "flour")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(search.count, 3);
    assert!(search.products.iter().all(|p| p.name == "All-purpose flour"));
    assert!(search.products.iter().all(|p| p.in_stock));
}

#[tokio::test]
async fn test_search_without_keyword_is_empty() {
    let (base, _dir) = spawn_app().await;

    let search: SearchResponse = reqwest::get(format!("{}/api/search", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(search.count, 0);
}

#[tokio::test]
async fn test_overlong_query_rejected() {
    let (base, _dir) = spawn_app().await;

    let response = reqwest::Client::new()
        .get(format!("{}/api/products", base))
        .query(&[("q", "a".repeat(201))])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_get_product_by_sku() {
    let (base, _dir) = spawn_app().await;

    let product: Product = reqwest::get(format!("{}/api/products/PANTRY-PASTA-500G-BARILLA", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(product.item_name, "Pasta");
    assert_eq!(product.brand.as_deref(), Some("Barilla"));

    let missing = reqwest::get(format!("{}/api/products/NOPE", base))
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_categories() {
    let (base, _dir) = spawn_app().await;

    let list: CategoryListResponse = reqwest::get(format!("{}/api/categories", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(list.categories.len(), 15);
    let names: Vec<&str> = list.categories.iter().map(|c| c.name.as_str()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[tokio::test]
async fn test_reopening_database_keeps_seed_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("catalog.db");
    let path = db_path.to_str().unwrap();

    let first = CatalogDb::new(path).await.unwrap();
    assert_eq!(first.count_products().await.unwrap(), 80);
    drop(first);

    let second = CatalogDb::new(path).await.unwrap();
    assert_eq!(second.count_products().await.unwrap(), 80);
    assert_eq!(second.list_categories().await.unwrap().len(), 15);
}
