//! # Mart Repository
//!
//! Whole-document storage for mart records.
//!
//! ## Storage Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Marts Are Stored                                 │
//! │                                                                         │
//! │  marts table                                                            │
//! │  ┌──────────┬──────────────────────────────────────────┬────────────┐  │
//! │  │ id       │ doc (JSON)                               │ updated_at │  │
//! │  ├──────────┼──────────────────────────────────────────┼────────────┤  │
//! │  │ 550e8... │ {"id":"550e8...","name":"Bismillah Mart",│ 2026-08-.. │  │
//! │  │          │  "stock":{"gir500":10},"refills":[...],  │            │  │
//! │  │          │  "sales":[...], ...}                     │            │  │
//! │  └──────────┴──────────────────────────────────────────┴────────────┘  │
//! │                                                                         │
//! │  The document embeds the snapshot, the overrides, and BOTH ledgers.    │
//! │  update() replaces the document unconditionally: LAST WRITE WINS.      │
//! │  There is no version column; a lost update between two concurrent     │
//! │  read-modify-write cycles is the documented contract, not a bug.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use khata_core::Mart;

/// Repository for mart record operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = MartRepository::new(pool);
///
/// let all = repo.list().await?;
/// let one = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct MartRepository {
    pool: SqlitePool,
}

impl MartRepository {
    /// Creates a new MartRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MartRepository { pool }
    }

    /// Lists all marts, most recently updated first.
    pub async fn list(&self) -> DbResult<Vec<Mart>> {
        let rows = sqlx::query("SELECT doc FROM marts ORDER BY updated_at DESC")
            .fetch_all(&self.pool)
            .await?;

        let mut marts = Vec::with_capacity(rows.len());
        for row in rows {
            let doc: String = row.try_get("doc")?;
            marts.push(serde_json::from_str(&doc)?);
        }

        debug!(count = marts.len(), "Listed marts");
        Ok(marts)
    }

    /// Gets a mart by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Mart>> {
        let row = sqlx::query("SELECT doc FROM marts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let doc: String = row.try_get("doc")?;
                Ok(Some(serde_json::from_str(&doc)?))
            }
            None => Ok(None),
        }
    }

    /// Inserts a new mart record.
    ///
    /// ## Errors
    /// `UniqueViolation` when the id already exists.
    pub async fn insert(&self, mart: &Mart) -> DbResult<()> {
        debug!(id = %mart.id, name = %mart.name, "Inserting mart");

        let doc = serde_json::to_string(mart)?;

        sqlx::query("INSERT INTO marts (id, doc, updated_at) VALUES (?1, ?2, ?3)")
            .bind(&mart.id)
            .bind(doc)
            .bind(mart.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Overwrites a mart record wholesale.
    ///
    /// ## Last Write Wins
    /// The stored document is replaced unconditionally. The caller is
    /// expected to have derived `mart` from a recent read; if another
    /// writer updated the record in between, their change is silently
    /// discarded here. No partial update exists - the snapshot and both
    /// ledgers land together or not at all.
    ///
    /// ## Errors
    /// `NotFound` when no row matched the id.
    pub async fn update(&self, mart: &Mart) -> DbResult<()> {
        debug!(id = %mart.id, "Updating mart");

        let doc = serde_json::to_string(mart)?;

        let result = sqlx::query("UPDATE marts SET doc = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(&mart.id)
            .bind(doc)
            .bind(mart.updated_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Mart", &mart.id));
        }

        Ok(())
    }

    /// Deletes a mart record. The embedded ledgers go with it - they are
    /// sub-documents, not separately addressable rows.
    ///
    /// ## Errors
    /// `NotFound` when no row matched the id.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting mart");

        let result = sqlx::query("DELETE FROM marts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Mart", id));
        }

        Ok(())
    }

    /// Counts stored marts.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM marts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Most recent stored write time for a mart, straight from the row
    /// (not the document). Diagnostics only.
    pub async fn last_written_at(&self, id: &str) -> DbResult<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT updated_at FROM marts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("updated_at")?;
                let parsed = DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| DbError::Internal(format!("bad updated_at: {e}")))?;
                Ok(Some(parsed.with_timezone(&Utc)))
            }
            None => Ok(None),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
