//! Surah repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::Surah;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

/// Surah repository interface for data access operations
#[async_trait]
pub trait SurahRepository: Send + Sync {
    /// Find a surah by its number
    async fn find_by_number(&self, number: u16) -> Result<Option<Surah>>;

    /// All surahs in canonical order
    async fn find_all(&self) -> Result<Vec<Surah>>;

    /// Surahs numbered strictly after `number`, in canonical order.
    async fn find_after(&self, number: u16) -> Result<Vec<Surah>>;

    /// Count total surahs
    async fn count(&self) -> Result<i64>;

    /// Insert or replace surahs in a single transaction
    ///
    /// # Errors
    /// Returns error if any surah fails validation (nothing is written) or a
    /// database error occurs
    async fn insert_many(&self, surahs: &[Surah]) -> Result<u64>;
}

/// SQLite implementation of SurahRepository
pub struct SqliteSurahRepository {
    pool: SqlitePool,
}

impl SqliteSurahRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SurahRepository for SqliteSurahRepository {
    async fn find_by_number(&self, number: u16) -> Result<Option<Surah>> {
        let surah = query_as::<_, Surah>(
            "SELECT number, name_ar, name_en, verses FROM surahs WHERE number = ?",
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(surah)
    }

    async fn find_all(&self) -> Result<Vec<Surah>> {
        let surahs = query_as::<_, Surah>(
            "SELECT number, name_ar, name_en, verses FROM surahs ORDER BY number",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(surahs)
    }

    async fn find_after(&self, number: u16) -> Result<Vec<Surah>> {
        let surahs = query_as::<_, Surah>(
            "SELECT number, name_ar, name_en, verses FROM surahs WHERE number > ? ORDER BY number",
        )
        .bind(number)
        .fetch_all(&self.pool)
        .await?;

        Ok(surahs)
    }

    async fn count(&self) -> Result<i64> {
        let count: (i64,) = query_as("SELECT COUNT(*) FROM surahs")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }

    async fn insert_many(&self, surahs: &[Surah]) -> Result<u64> {
        for surah in surahs {
            surah.validate().map_err(|e| LibraryError::InvalidInput {
                field: "Surah".to_string(),
                message: e,
            })?;
        }

        let mut tx = self.pool.begin().await?;

        for surah in surahs {
            query(
                r#"
                INSERT OR REPLACE INTO surahs (number, name_ar, name_en, verses)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(surah.number)
            .bind(&surah.name_ar)
            .bind(&surah.name_en)
            .bind(surah.verses)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(surahs.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundled;
    use crate::db::create_test_pool;

    async fn setup_repo() -> SqliteSurahRepository {
        let pool = create_test_pool().await.unwrap();
        SqliteSurahRepository::new(pool)
    }

    #[tokio::test]
    async fn test_insert_bundled_surahs() {
        let repo = setup_repo().await;
        let surahs = bundled::surahs().unwrap();

        assert_eq!(repo.insert_many(&surahs).await.unwrap(), 114);
        assert_eq!(repo.count().await.unwrap(), 114);

        let fatihah = repo.find_by_number(1).await.unwrap().unwrap();
        assert_eq!(fatihah.name_en, "Al-Fatihah");
        assert_eq!(fatihah.verses, 7);

        // Inserting again replaces rows instead of duplicating them
        repo.insert_many(&surahs).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 114);
    }

    #[tokio::test]
    async fn test_find_after() {
        let repo = setup_repo().await;
        repo.insert_many(&bundled::surahs().unwrap()).await.unwrap();

        let later = repo.find_after(110).await.unwrap();
        let numbers: Vec<u16> = later.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![111, 112, 113, 114]);

        assert!(repo.find_after(114).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_surah_is_rejected() {
        let repo = setup_repo().await;
        let bad = Surah {
            number: 115,
            name_ar: "؟".to_string(),
            name_en: "Unknown".to_string(),
            verses: 1,
        };

        let result = repo.insert_many(&[bad]).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
        assert_eq!(repo.count().await.unwrap(), 0);
    }
}
