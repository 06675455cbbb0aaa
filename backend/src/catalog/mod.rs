//! Product catalog
//!
//! SQLite-backed storage for products and categories.

pub mod db;
pub mod models;

pub use db::CatalogDb;
pub use models::{Category, Product, ProductFilter, ProductSummary};
