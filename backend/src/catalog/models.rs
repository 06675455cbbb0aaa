//! Catalog data models
//!
//! Defines structures for products and categories.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A grocery product
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    /// Database identifier
    pub id: i64,
    /// Display name
    pub item_name: String,
    /// Stock keeping unit (unique)
    pub sku: String,
    /// Manufacturer
    pub brand: Option<String>,
    /// Pack count
    pub quantity: i64,
    /// Pack size, e.g. "500g"
    pub unit: Option<String>,
    /// Category name
    pub category: Option<String>,
    /// Energy per 100 g
    pub calories_per_100g: Option<i64>,
    /// Protein in grams
    pub protein_g: Option<f64>,
    /// Fat in grams
    pub fat_g: Option<f64>,
    /// Carbohydrates in grams
    pub carbs_g: Option<f64>,
    /// Sugar in grams
    pub sugar_g: Option<f64>,
    /// Allergen statement
    pub allergens: Option<String>,
    /// Unit price
    pub price: f64,
    /// Units in stock
    pub stock_quantity: i64,
    /// Whether the product is listed
    pub is_active: bool,
    /// Creation time (UTC)
    pub created_at: NaiveDateTime,
    /// Last update time (UTC)
    pub updated_at: NaiveDateTime,
}

/// Compact product shape returned by quick search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    /// Database identifier
    pub id: i64,
    /// Stock keeping unit
    pub sku: String,
    /// Display name
    pub name: String,
    /// Manufacturer
    pub brand: Option<String>,
    /// Unit price
    pub price: f64,
    /// Category name
    pub category: Option<String>,
    /// Whether any units are left
    pub in_stock: bool,
    /// Units in stock
    pub stock_quantity: i64,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            sku: product.sku,
            name: product.item_name,
            brand: product.brand,
            price: product.price,
            category: product.category,
            in_stock: product.stock_quantity > 0,
            stock_quantity: product.stock_quantity,
        }
    }
}

/// A product category
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    /// Database identifier
    pub id: i64,
    /// Category name
    pub name: String,
    /// URL-friendly name
    pub slug: String,
    /// Optional illustration
    pub image_url: Option<String>,
}

/// Filters for listing products
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Keyword matched against name, brand and category
    #[serde(default, rename = "q")]
    pub query: Option<String>,
    /// Exact category name
    #[serde(default)]
    pub category: Option<String>,
}

impl ProductFilter {
    /// Keyword with surrounding whitespace removed, if non-empty
    pub fn keyword(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Category if non-empty
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }
}
