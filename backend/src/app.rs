//! HTTP application
//!
//! Router construction, request middleware and the service-level handlers.

use crate::api;
use crate::error::AppError;
use crate::state::AppState;
use crate::websocket;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

/// Response header carrying the request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Response body for `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct HelloResponse {
    /// Greeting
    pub message: String,
    /// Always `ok`
    pub status: String,
}

/// Response body for `GET /api/health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `healthy` when the catalog is reachable
    pub status: String,
    /// Crate version
    pub version: String,
    /// Human-readable status
    pub message: String,
    /// Number of active products
    pub product_count: i64,
}

/// Build the application router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check and hello world
        .route("/", get(hello_world))
        .route("/api/health", get(health_check))
        // Catalog API
        .route("/api/products", get(api::catalog::list_products))
        .route("/api/products/:sku", get(api::catalog::get_product))
        .route("/api/search", get(api::catalog::search_products))
        .route("/api/categories", get(api::catalog::list_categories))
        // Shopping assistant
        .route("/ws", get(websocket::websocket_handler))
        // Middleware (order matters - request_id should be first)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Storefront is served from another origin
        .with_state(state)
}

/// Request ID middleware - tags each request with a UUID for tracing and
/// echoes it back in the `x-request-id` header
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let duration = start.elapsed();
    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        duration_ms = duration.as_millis(),
        "Request completed"
    );

    response
}

async fn hello_world() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Recipe Cart backend is running".to_string(),
        status: "ok".to_string(),
    })
}

async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let product_count = state.catalog.count_products().await?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Backend is healthy".to_string(),
        product_count,
    }))
}
