//! Catalog API handlers
//!
//! Read-only product and category endpoints used by the storefront.

use crate::api::utils::{validate_query, SEARCH_LIMIT};
use crate::catalog::{Category, Product, ProductFilter, ProductSummary};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

/// Response body for product listings
#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
    /// Matching products
    pub products: Vec<Product>,
    /// Number of products returned
    pub count: usize,
}

/// Response body for quick search
#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Matching products in summary form
    pub products: Vec<ProductSummary>,
    /// Number of products returned
    pub count: usize,
}

/// Response body for the category list
#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryListResponse {
    /// All categories ordered by name
    pub categories: Vec<Category>,
}

/// Query parameters for quick search
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Keyword matched against product names
    #[serde(default)]
    pub q: Option<String>,
}

/// List active products
///
/// `GET /api/products?q=&category=`
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ProductListResponse>, AppError> {
    validate_query(filter.query.as_deref())?;
    let products = state.catalog.list_products(&filter).await?;
    Ok(Json(ProductListResponse {
        count: products.len(),
        products,
    }))
}

/// Get one product by SKU
///
/// `GET /api/products/:sku`
pub async fn get_product(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<Json<Product>, AppError> {
    state
        .catalog
        .get_product_by_sku(&sku)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Product {}", sku)))
}

/// Quick search on product names, limited to ten results
///
/// `GET /api/search?q=`
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    validate_query(params.q.as_deref())?;
    let keyword = params.q.unwrap_or_default();
    let products: Vec<ProductSummary> = state
        .catalog
        .search_products(&keyword, SEARCH_LIMIT)
        .await?
        .into_iter()
        .map(ProductSummary::from)
        .collect();
    Ok(Json(SearchResponse {
        count: products.len(),
        products,
    }))
}

/// List all categories
///
/// `GET /api/categories`
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoryListResponse>, AppError> {
    let categories = state.catalog.list_categories().await?;
    Ok(Json(CategoryListResponse { categories }))
}
