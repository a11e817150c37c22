//! # Product Repository
//!
//! Catalog table access. Read-only from the ledger engine's perspective:
//! the engine consumes the catalog through [`khata_core::StaticCatalog`],
//! loaded here; writes exist only for seed/admin tooling.
//!
//! ## Catalog Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How the Catalog Reaches the Engine                   │
//! │                                                                         │
//! │  products table                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ProductRepository::load_catalog()                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StaticCatalog (in-memory, khata-core)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ledger::resolve_unit_price(&mart, &catalog, key)                      │
//! │                                                                         │
//! │  The engine never sees the database; it sees an injected lookup.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use khata_core::{Money, Product, StaticCatalog};

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists the full catalog in key order.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT key, name, size_label, default_unit_price_paisa \
             FROM products ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut products = Vec::with_capacity(rows.len());
        for row in rows {
            products.push(row_to_product(&row)?);
        }

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Gets a product by its stable key.
    pub async fn get_by_key(&self, key: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query(
            "SELECT key, name, size_label, default_unit_price_paisa \
             FROM products WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_product(&r)).transpose()
    }

    /// Inserts a catalog product. Seed/admin tooling only.
    ///
    /// ## Errors
    /// `UniqueViolation` when the key already exists.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(key = %product.key, "Inserting product");

        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO products \
             (key, name, size_label, default_unit_price_paisa, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(&product.key)
        .bind(&product.name)
        .bind(&product.size_label)
        .bind(product.default_unit_price.paisa())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Counts catalog products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Loads the whole catalog into the engine's injected lookup form.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let catalog = db.products().load_catalog().await?;
    /// let price = ledger::resolve_unit_price(&mart, &catalog, "gir500");
    /// ```
    pub async fn load_catalog(&self) -> DbResult<StaticCatalog> {
        Ok(StaticCatalog::new(self.list().await?))
    }
}

/// Maps a products row to the domain type.
fn row_to_product(row: &sqlx::sqlite::SqliteRow) -> DbResult<Product> {
    Ok(Product {
        key: row.try_get("key")?,
        name: row.try_get("name")?,
        size_label: row.try_get("size_label")?,
        default_unit_price: Money::from_paisa(row.try_get("default_unit_price_paisa")?),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use khata_core::ProductCatalog;

    fn product(key: &str, rupees: i64) -> Product {
        Product {
            key: key.to_string(),
            name: format!("Product {key}"),
            size_label: "500ml".to_string(),
            default_unit_price: Money::from_rupees(rupees),
        }
    }

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = db().await;
        db.products().insert(&product("gir500", 900)).await.unwrap();

        let loaded = db.products().get_by_key("gir500").await.unwrap().unwrap();
        assert_eq!(loaded.default_unit_price, Money::from_rupees(900));
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_key_rejected() {
        let db = db().await;
        db.products().insert(&product("gir500", 900)).await.unwrap();

        let err = db.products().insert(&product("gir500", 950)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_load_catalog_resolves() {
        let db = db().await;
        db.products().insert(&product("gir500", 900)).await.unwrap();
        db.products().insert(&product("gir1000", 1_700)).await.unwrap();

        let catalog = db.products().load_catalog().await.unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.resolve("gir500").is_some());
        assert!(catalog.resolve("almond250").is_none());
    }
}
