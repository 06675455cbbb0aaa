//! Catalog database operations
//!
//! Handles all database interactions for products and categories.

use crate::catalog::models::{Category, Product, ProductFilter};
use crate::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

const LIKE_ESCAPE: &str = " ESCAPE '\\'";

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_catalog",
        include_str!("../../migrations/001_create_catalog.sql"),
    ),
    (
        "002_seed_catalog",
        include_str!("../../migrations/002_seed_catalog.sql"),
    ),
];

const PRODUCT_COLUMNS: &str = "id, item_name, sku, brand, quantity, unit, category, \
    calories_per_100g, protein_g, fat_g, carbs_g, sugar_g, allergens, price, \
    stock_quantity, is_active, created_at, updated_at";

/// Database connection pool for catalog operations
pub struct CatalogDb {
    pool: SqlitePool,
}

impl CatalogDb {
    /// Initialize database connection pool and apply migrations
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(CatalogDb)` if successful
    /// * `Err(AppError)` if connection or migration failed
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        // Ensure parent directory exists
        if let Some(parent) = PathBuf::from(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Failed to create db directory: {}", e))
                })?;
            }
        }

        // SQLite connection string format: sqlite:path/to/db.db
        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid database path: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Connected to SQLite database at: {}", db_path);

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        for (name, sql) in MIGRATIONS {
            let statements = split_statements(sql);
            debug!(migration = name, statements = statements.len(), "Applying migration");
            for statement in statements {
                sqlx::query(&statement)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| {
                        AppError::Internal(anyhow::anyhow!(
                            "Migration {} failed: {} - Statement: {}",
                            name,
                            e,
                            statement.chars().take(100).collect::<String>()
                        ))
                    })?;
            }
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// List active products matching the filter
    ///
    /// The keyword is a substring match on name, brand or category (ASCII
    /// letters match regardless of case); the category filter is exact.
    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE is_active = 1",
            PRODUCT_COLUMNS
        ));

        if let Some(keyword) = filter.keyword() {
            let pattern = like_pattern(keyword);
            builder
                .push(" AND (item_name LIKE ")
                .push_bind(pattern.clone())
                .push(LIKE_ESCAPE)
                .push(" OR COALESCE(brand, '') LIKE ")
                .push_bind(pattern.clone())
                .push(LIKE_ESCAPE)
                .push(" OR COALESCE(category, '') LIKE ")
                .push_bind(pattern)
                .push(LIKE_ESCAPE)
                .push(")");
        }
        if let Some(category) = filter.category() {
            builder.push(" AND category = ").push_bind(category.to_string());
        }
        builder.push(" ORDER BY category, item_name, price");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), ?filter, "Listed products");
        Ok(products)
    }

    /// Quick search on product name
    pub async fn search_products(&self, keyword: &str, limit: i64) -> Result<Vec<Product>, AppError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE is_active = 1 AND item_name LIKE ? ESCAPE '\\' \
             ORDER BY item_name, price LIMIT ?",
            PRODUCT_COLUMNS
        ))
        .bind(like_pattern(keyword))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Get an active product by SKU
    pub async fn get_product_by_sku(&self, sku: &str) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE sku = ? AND is_active = 1",
            PRODUCT_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Active products whose name contains `name`, optionally within one category
    pub async fn find_by_name(
        &self,
        name: &str,
        category: Option<&str>,
    ) -> Result<Vec<Product>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE is_active = 1 AND item_name LIKE ",
            PRODUCT_COLUMNS
        ));
        builder.push_bind(like_pattern(name.trim())).push(LIKE_ESCAPE);
        if let Some(category) = category {
            builder.push(" AND category = ").push_bind(category.to_string());
        }
        builder.push(" ORDER BY price, item_name");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// In-stock substitutes for an ingredient
    ///
    /// With a category, anything in that category qualifies as well as name
    /// matches. Products listed in `exclude_skus` are skipped.
    pub async fn find_alternatives(
        &self,
        name: &str,
        exclude_skus: &[String],
        category: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Product>, AppError> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE is_active = 1 AND stock_quantity > 0 AND (item_name LIKE ",
            PRODUCT_COLUMNS
        ));
        builder.push_bind(like_pattern(name.trim())).push(LIKE_ESCAPE);
        if let Some(category) = category {
            builder.push(" OR category = ").push_bind(category.to_string());
        }
        builder.push(")");
        if !exclude_skus.is_empty() {
            builder.push(" AND sku NOT IN (");
            let mut separated = builder.separated(", ");
            for sku in exclude_skus {
                separated.push_bind(sku.clone());
            }
            separated.push_unseparated(")");
        }
        builder.push(" ORDER BY price, item_name LIMIT ").push_bind(limit);

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Active products with the given SKUs, cheapest first
    pub async fn products_by_skus(&self, skus: &[String]) -> Result<Vec<Product>, AppError> {
        if skus.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM products WHERE is_active = 1 AND sku IN (",
            PRODUCT_COLUMNS
        ));
        let mut separated = builder.separated(", ");
        for sku in skus {
            separated.push_bind(sku.clone());
        }
        separated.push_unseparated(")");
        builder.push(" ORDER BY price, sku");

        let products = builder
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// All categories ordered by name
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, image_url FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    /// Number of active products
    pub async fn count_products(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Strip `--` comments and split a migration file into statements
fn split_statements(sql: &str) -> Vec<String> {
    let mut cleaned_sql = String::new();
    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        let without_comments = match trimmed.find("--") {
            Some(comment_pos) => &trimmed[..comment_pos],
            None => trimmed,
        };
        cleaned_sql.push_str(without_comments.trim());
        cleaned_sql.push(' ');
    }

    cleaned_sql
        .split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `%keyword%` pattern with LIKE wildcards escaped
///
/// The keyword keeps its case; SQLite's LIKE already folds ASCII letters and
/// compares everything else exactly.
fn like_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements_strips_comments() {
        let sql = "-- header\nCREATE TABLE a (id INTEGER); -- trailing\n\nINSERT INTO a VALUES (1);\n";
        let statements = split_statements(sql);
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (id INTEGER)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Pasta"), "%Pasta%");
        assert_eq!(like_pattern("Épinards"), "%Épinards%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_bundled_migrations_parse() {
        for (_, sql) in MIGRATIONS {
            assert!(!split_statements(sql).is_empty());
        }
    }

    async fn seeded_db() -> (CatalogDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.db");
        let db = CatalogDb::new(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    async fn insert_product(db: &CatalogDb, name: &str, sku: &str, category: &str, stock: i64) {
        sqlx::query(
            "INSERT INTO products (item_name, sku, brand, unit, category, price, stock_quantity) \
             VALUES (?, ?, 'Maison', '250g', ?, 2.50, ?)",
        )
        .bind(name)
        .bind(sku)
        .bind(category)
        .bind(stock)
        .execute(&db.pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_inactive_product_hidden_by_sku() {
        let (db, _dir) = seeded_db().await;
        let sku = "PANTRY-PASTA-500G-BARILLA";
        assert!(db.get_product_by_sku(sku).await.unwrap().is_some());

        sqlx::query("UPDATE products SET is_active = 0 WHERE sku = ?")
            .bind(sku)
            .execute(&db.pool)
            .await
            .unwrap();

        assert!(db.get_product_by_sku(sku).await.unwrap().is_none());
        assert!(db
            .products_by_skus(&[sku.to_string()])
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_non_ascii_keyword_matches() {
        let (db, _dir) = seeded_db().await;
        insert_product(&db, "Épinards", "VEG-EPINARDS-250G", "vegetables", 10).await;

        let filter = ProductFilter {
            query: Some("Épinards".to_string()),
            category: None,
        };
        let listed = db.list_products(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sku, "VEG-EPINARDS-250G");

        let searched = db.search_products("Épin", 10).await.unwrap();
        assert_eq!(searched.len(), 1);

        // ASCII letters still match regardless of case
        let searched = db.search_products("ÉPINARDS", 10).await.unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(db.search_products("FLOUR", 10).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_find_by_name_filters_category() {
        let (db, _dir) = seeded_db().await;

        let flour = db.find_by_name("flour", None).await.unwrap();
        assert_eq!(flour.len(), 3);
        assert!(flour.windows(2).all(|pair| pair[0].price <= pair[1].price));

        let none = db.find_by_name("flour", Some("dairy")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_find_alternatives_skips_excluded_and_out_of_stock() {
        let (db, _dir) = seeded_db().await;
        insert_product(&db, "All-purpose flour", "DOUGH-FLOUR-500G-EMPTY", "baking", 0).await;

        let exclude = vec!["DOUGH-FLOUR-500G-GOLD".to_string()];
        let alternatives = db
            .find_alternatives("flour", &exclude, None, 5)
            .await
            .unwrap();
        let skus: Vec<&str> = alternatives.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(skus, vec!["DOUGH-FLOUR-500G-PILLA", "DOUGH-FLOUR-500G-KING"]);

        let by_category = db
            .find_alternatives("nothing-by-this-name", &[], Some("baking"), 5)
            .await
            .unwrap();
        assert_eq!(by_category.len(), 5);
        assert!(by_category
            .iter()
            .all(|p| p.category.as_deref() == Some("baking")));
    }

    #[tokio::test]
    async fn test_products_by_skus_sorted_by_price() {
        let (db, _dir) = seeded_db().await;
        let skus = vec![
            "DOUGH-FLOUR-500G-KING".to_string(),
            "DOUGH-FLOUR-500G-GOLD".to_string(),
            "NOPE".to_string(),
        ];

        let products = db.products_by_skus(&skus).await.unwrap();
        let found: Vec<&str> = products.iter().map(|p| p.sku.as_str()).collect();
        assert_eq!(found, vec!["DOUGH-FLOUR-500G-GOLD", "DOUGH-FLOUR-500G-KING"]);
        assert!(db.products_by_skus(&[]).await.unwrap().is_empty());
    }
}
