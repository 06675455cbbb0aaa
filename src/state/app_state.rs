// Application state management
// Contains the loaded catalog, active filters, and UI state

use crate::catalog::{Category, Product};
use std::collections::HashSet;

/// Sequence number of a product request; only the latest one is applied
pub type RequestId = u64;

/// Main application state
/// Manages catalog data, filters and UI preferences
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// Products currently shown in the grid
    pub products: Vec<Product>,
    /// All known categories
    pub categories: Vec<Category>,
    /// Category filter, if any
    pub selected_category: Option<String>,
    /// Text in the search box
    pub search_input: String,
    /// Keyword the grid is filtered by
    pub active_query: Option<String>,
    /// Whether a product request is outstanding
    pub loading: bool,
    /// Last catalog error, shown above the grid
    pub error: Option<String>,
    /// Text in the chat input box
    pub chat_input: String,
    /// UI state preferences
    pub ui_state: UiState,
    latest_request: RequestId,
}

/// UI-specific state
#[derive(Debug, Clone)]
pub struct UiState {
    /// Whether the category sidebar is visible
    pub sidebar_visible: bool,
    /// Whether the chat window is open
    pub chat_open: bool,
    /// Products whose nutrition block is expanded
    pub expanded_nutrition: HashSet<i64>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            sidebar_visible: true,
            chat_open: false,
            expanded_nutrition: HashSet::new(),
        }
    }
}

impl AppState {
    /// Create a new application state with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a product request and return its id
    pub fn begin_request(&mut self) -> RequestId {
        self.latest_request += 1;
        self.loading = true;
        self.latest_request
    }

    /// Apply the result of a product request
    /// Returns false if a newer request superseded it
    pub fn apply_products(&mut self, request: RequestId, result: Result<Vec<Product>, String>) -> bool {
        if request != self.latest_request {
            return false;
        }
        self.loading = false;
        match result {
            Ok(products) => {
                self.products = products;
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
        true
    }

    /// Apply the result of a category request
    pub fn apply_categories(&mut self, result: Result<Vec<Category>, String>) {
        match result {
            Ok(mut categories) => {
                categories.sort_by(|a, b| a.name.cmp(&b.name));
                self.categories = categories;
            }
            Err(e) => self.error = Some(e),
        }
    }

    /// Select a category (None = all products)
    /// Returns true if the filter changed
    pub fn select_category(&mut self, category: Option<String>) -> bool {
        if self.selected_category == category {
            false
        } else {
            self.selected_category = category;
            true
        }
    }

    /// Use the search box text as the keyword filter
    /// Returns true if the filter changed
    pub fn apply_search(&mut self) -> bool {
        let query = Some(self.search_input.trim().to_string()).filter(|q| !q.is_empty());
        if self.active_query == query {
            false
        } else {
            self.active_query = query;
            true
        }
    }

    /// Clear the keyword filter
    /// Returns true if a filter was active
    pub fn clear_search(&mut self) -> bool {
        self.search_input.clear();
        self.active_query.take().is_some()
    }

    /// Expand or collapse a product's nutrition block
    pub fn toggle_nutrition(&mut self, product_id: i64) {
        if !self.ui_state.expanded_nutrition.remove(&product_id) {
            self.ui_state.expanded_nutrition.insert(product_id);
        }
    }

    /// Whether a product's nutrition block is expanded
    pub fn nutrition_expanded(&self, product_id: i64) -> bool {
        self.ui_state.expanded_nutrition.contains(&product_id)
    }

    /// Heading for the product grid
    pub fn grid_title(&self) -> String {
        match (&self.active_query, &self.selected_category) {
            (Some(q), _) => format!("Results for \"{}\"", q),
            (None, Some(category)) => capitalize(category),
            (None, None) => "All products".to_string(),
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            slug: name.to_string(),
            image_url: None,
        }
    }

    fn product(id: i64, name: &str) -> Product {
        Product {
            id,
            item_name: name.to_string(),
            sku: format!("SKU-{}", id),
            brand: None,
            quantity: 1,
            unit: Some("500g".to_string()),
            category: Some("baking".to_string()),
            calories_per_100g: None,
            protein_g: None,
            fat_g: None,
            carbs_g: None,
            sugar_g: None,
            allergens: None,
            price: 1.0,
            stock_quantity: 10,
        }
    }

    #[test]
    fn test_app_state_creation() {
        let state = AppState::new();
        assert!(state.products.is_empty());
        assert!(state.selected_category.is_none());
        assert!(state.ui_state.sidebar_visible);
        assert!(!state.ui_state.chat_open);
    }

    #[test]
    fn test_select_category() {
        let mut state = AppState::new();
        assert!(state.select_category(Some("dairy".to_string())));
        assert!(!state.select_category(Some("dairy".to_string())));
        assert_eq!(state.grid_title(), "Dairy");
        assert!(state.select_category(None));
        assert_eq!(state.grid_title(), "All products");
    }

    #[test]
    fn test_search_filter() {
        let mut state = AppState::new();
        state.search_input = "  pasta ".to_string();
        assert!(state.apply_search());
        assert_eq!(state.active_query.as_deref(), Some("pasta"));
        assert!(!state.apply_search());
        assert_eq!(state.grid_title(), "Results for \"pasta\"");

        assert!(state.clear_search());
        assert!(state.search_input.is_empty());
        assert!(!state.clear_search());
    }

    #[test]
    fn test_blank_search_clears_filter() {
        let mut state = AppState::new();
        state.search_input = "rice".to_string();
        state.apply_search();
        state.search_input = "   ".to_string();
        assert!(state.apply_search());
        assert!(state.active_query.is_none());
    }

    #[test]
    fn test_stale_product_results_are_ignored() {
        let mut state = AppState::new();
        let first = state.begin_request();
        let second = state.begin_request();

        assert!(!state.apply_products(first, Ok(vec![product(1, "Old")])));
        assert!(state.loading);
        assert!(state.apply_products(second, Ok(vec![product(2, "New")])));
        assert!(!state.loading);
        assert_eq!(state.products[0].item_name, "New");
    }

    #[test]
    fn test_product_error_keeps_previous_products() {
        let mut state = AppState::new();
        let first = state.begin_request();
        state.apply_products(first, Ok(vec![product(1, "Flour")]));
        let second = state.begin_request();
        state.apply_products(second, Err("connection refused".to_string()));

        assert_eq!(state.products.len(), 1);
        assert_eq!(state.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_categories_sorted() {
        let mut state = AppState::new();
        state.apply_categories(Ok(vec![
            category(2, "fruits"),
            category(1, "baking"),
            category(3, "dairy"),
        ]));
        let names: Vec<_> = state.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["baking", "dairy", "fruits"]);
    }

    #[test]
    fn test_toggle_nutrition() {
        let mut state = AppState::new();
        state.toggle_nutrition(5);
        assert!(state.nutrition_expanded(5));
        state.toggle_nutrition(5);
        assert!(!state.nutrition_expanded(5));
    }
}
