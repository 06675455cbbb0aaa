//! API module
//!
//! Contains HTTP request handlers for the catalog endpoints

pub mod catalog;
pub mod utils;
