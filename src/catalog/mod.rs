// Catalog access for the storefront
// Product and category models plus the REST client for the backend

pub mod client;
pub mod models;

pub use client::{CatalogClient, CatalogError};
pub use models::{Category, Product};
