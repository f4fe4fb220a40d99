//! Reciter repository trait and implementation

use crate::error::Result;
use crate::models::Reciter;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};
use tracing::{debug, warn};

/// Reciter repository interface for data access operations
#[async_trait]
pub trait ReciterRepository: Send + Sync {
    /// Find a reciter by its ID
    ///
    /// # Returns
    /// - `Ok(Some(reciter))` if found
    /// - `Ok(None)` if not found
    /// - `Err` if database error occurs
    async fn find_by_id(&self, id: &str) -> Result<Option<Reciter>>;

    /// All reciters ordered by id.
    async fn find_all(&self) -> Result<Vec<Reciter>>;

    /// The ids of all stored reciters, ordered.
    async fn ids(&self) -> Result<Vec<String>>;

    /// Count total reciters
    async fn count(&self) -> Result<i64>;

    /// Replace the whole reciter set with `reciters`
    ///
    /// Runs in one transaction: existing rows are deleted and every reciter is
    /// inserted. Invalid reciters are skipped and a repeated id keeps the last
    /// entry. If the database fails midway, the previous set is left untouched.
    ///
    /// # Returns
    /// Number of reciters stored
    async fn replace_all(&self, reciters: &[Reciter]) -> Result<u64>;
}

/// SQLite implementation of ReciterRepository
pub struct SqliteReciterRepository {
    pool: SqlitePool,
}

impl SqliteReciterRepository {
    /// Create a new SqliteReciterRepository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReciterRepository for SqliteReciterRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Reciter>> {
        let reciter = query_as::<_, Reciter>(
            "SELECT id, name_en, name_ar, color_primary, color_secondary FROM reciters WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reciter)
    }

    async fn find_all(&self) -> Result<Vec<Reciter>> {
        let reciters = query_as::<_, Reciter>(
            "SELECT id, name_en, name_ar, color_primary, color_secondary FROM reciters ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reciters)
    }

    async fn ids(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = query_as("SELECT id FROM reciters ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM reciters")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn replace_all(&self, reciters: &[Reciter]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        query("DELETE FROM reciters").execute(&mut *tx).await?;

        let mut skipped = 0usize;
        for reciter in reciters {
            if let Err(reason) = reciter.validate() {
                warn!(id = %reciter.id, %reason, "Skipping invalid reciter");
                skipped += 1;
                continue;
            }

            // A repeated id replaces the earlier row.
            query(
                r#"
                INSERT OR REPLACE INTO reciters (id, name_en, name_ar, color_primary, color_secondary)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&reciter.id)
            .bind(&reciter.name_en)
            .bind(&reciter.name_ar)
            .bind(&reciter.color_primary)
            .bind(&reciter.color_secondary)
            .execute(&mut *tx)
            .await?;
        }

        let (stored,): (i64,) = query_as("SELECT COUNT(*) FROM reciters")
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(count = stored, skipped, "Replaced reciters");
        Ok(stored as u64)
    }
}
