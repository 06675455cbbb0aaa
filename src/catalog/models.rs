//! Catalog models as served by the backend REST API

use serde::Deserialize;

/// A grocery product
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    /// Database identifier
    pub id: i64,
    /// Display name, e.g. "All-purpose flour"
    pub item_name: String,
    /// Stock keeping unit
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
    /// Unit price in dollars
    pub price: f64,
    /// Units in stock
    pub stock_quantity: i64,
}

impl Product {
    /// Whether any units are left
    pub fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// Pack description such as "500g" or "12 pieces"
    pub fn pack_size(&self) -> String {
        match (&self.unit, self.quantity) {
            (Some(unit), 1) => unit.clone(),
            (Some(unit), qty) => format!("{} {}", qty, unit),
            (None, qty) => format!("{} pcs", qty),
        }
    }

    /// Whether any nutrition figure is present
    pub fn has_nutrition(&self) -> bool {
        self.calories_per_100g.is_some()
            || self.protein_g.is_some()
            || self.fat_g.is_some()
            || self.carbs_g.is_some()
            || self.sugar_g.is_some()
    }
}

/// A product category
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Category {
    /// Database identifier
    pub id: i64,
    /// Category name, matches `Product::category`
    pub name: String,
    /// URL-friendly name
    pub slug: String,
    /// Optional illustration
    pub image_url: Option<String>,
}

/// Body of `GET /api/products`
#[derive(Debug, Deserialize)]
pub struct ProductList {
    /// Matching products
    pub products: Vec<Product>,
    /// Number of products returned
    #[allow(dead_code)] // Included by the API; the grid counts the list itself
    pub count: usize,
}

/// Body of `GET /api/categories`
#[derive(Debug, Deserialize)]
pub struct CategoryList {
    /// All categories ordered by name
    pub categories: Vec<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flour() -> Product {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "item_name": "All-purpose flour",
            "sku": "DOUGH-FLOUR-500G-GOLD",
            "brand": "Gold Medal",
            "quantity": 1,
            "unit": "500g",
            "category": "baking",
            "calories_per_100g": 280,
            "protein_g": 12.0,
            "fat_g": 2.0,
            "carbs_g": 58.0,
            "sugar_g": 1.0,
            "allergens": "Contains: Gluten",
            "price": 3.49,
            "stock_quantity": 100
        }))
        .unwrap()
    }

    #[test]
    fn test_product_deserializes() {
        let product = flour();
        assert_eq!(product.brand.as_deref(), Some("Gold Medal"));
        assert!(product.in_stock());
        assert!(product.has_nutrition());
    }

    #[test]
    fn test_pack_size() {
        let mut product = flour();
        assert_eq!(product.pack_size(), "500g");
        product.quantity = 12;
        product.unit = Some("pieces".to_string());
        assert_eq!(product.pack_size(), "12 pieces");
        product.unit = None;
        assert_eq!(product.pack_size(), "12 pcs");
    }

    #[test]
    fn test_optional_fields_may_be_null() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 7,
            "item_name": "Dish Soap",
            "sku": "CLEAN-DISH-500ML-DAWN",
            "brand": null,
            "quantity": 1,
            "unit": null,
            "category": null,
            "calories_per_100g": null,
            "protein_g": null,
            "fat_g": null,
            "carbs_g": null,
            "sugar_g": null,
            "allergens": null,
            "price": 2.99,
            "stock_quantity": 0
        }))
        .unwrap();
        assert!(!product.in_stock());
        assert!(!product.has_nutrition());
    }
}
