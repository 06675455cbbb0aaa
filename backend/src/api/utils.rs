//! API utility functions
//!
//! Contains helper functions used by API handlers for validation.

use crate::error::AppError;

/// Maximum keyword length in characters
pub const MAX_QUERY_LENGTH: usize = 200;

/// Maximum number of quick-search results
pub const SEARCH_LIMIT: i64 = 10;

/// Validate an optional search keyword
///
/// # Arguments
/// * `query` - Keyword from the query string, if any
///
/// # Returns
/// * `Ok(())` - Keyword is absent or within limits
/// * `Err(AppError)` - Keyword is too long
pub fn validate_query(query: Option<&str>) -> Result<(), AppError> {
    match query {
        Some(q) if q.trim().chars().count() > MAX_QUERY_LENGTH => Err(AppError::BadRequest(
            format!("Query exceeds maximum length of {} characters", MAX_QUERY_LENGTH),
        )),
        _ => Ok(()),
    }
}
