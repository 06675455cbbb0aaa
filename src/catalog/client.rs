//! Catalog REST client
//!
//! Thin reqwest wrapper around the backend's product and category endpoints.

use crate::catalog::models::{Category, CategoryList, Product, ProductList};
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the catalog client
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Request could not be sent or the body could not be read
    #[error("Catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Catalog API returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, usually `{error, status}`
        body: String,
    },
}

/// Client for the catalog API
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a client for `base_url` (e.g. `http://localhost:8000`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// List active products, optionally filtered by keyword and category
    pub async fn fetch_products(
        &self,
        query: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Product>, CatalogError> {
        let mut params: Vec<(&str, &str)> = Vec::new();
        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            params.push(("q", q));
        }
        if let Some(category) = category {
            params.push(("category", category));
        }

        let url = format!("{}/api/products", self.base_url);
        tracing::debug!(url = %url, ?params, "Fetching products");
        let mut request = self.http.get(&url);
        if !params.is_empty() {
            request = request.query(&params);
        }
        let response = request.send().await?;
        let list: ProductList = Self::check(response).await?.json().await?;
        tracing::debug!(count = list.products.len(), "Products loaded");
        Ok(list.products)
    }

    /// List all categories
    pub async fn fetch_categories(&self) -> Result<Vec<Category>, CatalogError> {
        let url = format!("{}/api/categories", self.base_url);
        let response = self.http.get(&url).send().await?;
        let list: CategoryList = Self::check(response).await?.json().await?;
        Ok(list.categories)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        tracing::error!(status = status.as_u16(), body = %body, "Catalog API error");
        Err(CatalogError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
