//! Application metadata repository
//!
//! String key/value pairs; every write replaces the previous value.

use crate::error::Result;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

#[async_trait]
pub trait MetadataRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write several pairs in one transaction.
    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()>;

    /// `true` only when the stored value is exactly `"true"`.
    async fn get_bool(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.as_deref() == Some("true"))
    }
}

/// SQLite implementation of MetadataRepository
pub struct SqliteMetadataRepository {
    pool: SqlitePool,
}

impl SqliteMetadataRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetadataRepository for SqliteMetadataRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = query_as("SELECT value FROM app_metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        query("INSERT OR REPLACE INTO app_metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for &(key, value) in entries {
            query("INSERT OR REPLACE INTO app_metadata (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::models::metadata_keys;

    async fn setup_repo() -> SqliteMetadataRepository {
        SqliteMetadataRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let repo = setup_repo().await;
        assert!(repo.get(metadata_keys::DB_VERSION).await.unwrap().is_none());

        repo.set(metadata_keys::DB_VERSION, "1").await.unwrap();
        repo.set(metadata_keys::DB_VERSION, "2").await.unwrap();

        assert_eq!(
            repo.get(metadata_keys::DB_VERSION).await.unwrap().as_deref(),
            Some("2")
        );
    }

    #[tokio::test]
    async fn test_set_many() {
        let repo = setup_repo().await;
        repo.set_many(&[
            (metadata_keys::APP_NAME, "Qariee"),
            (metadata_keys::SUPPORT_EMAIL, "support@example.com"),
        ])
        .await
        .unwrap();

        assert_eq!(
            repo.get(metadata_keys::APP_NAME).await.unwrap().as_deref(),
            Some("Qariee")
        );
        assert_eq!(
            repo.get(metadata_keys::SUPPORT_EMAIL)
                .await
                .unwrap()
                .as_deref(),
            Some("support@example.com")
        );
    }

    #[tokio::test]
    async fn test_get_bool() {
        let repo = setup_repo().await;
        assert!(!repo.get_bool(metadata_keys::SURAHS_LOADED).await.unwrap());

        repo.set(metadata_keys::SURAHS_LOADED, "yes").await.unwrap();
        assert!(!repo.get_bool(metadata_keys::SURAHS_LOADED).await.unwrap());

        repo.set(metadata_keys::SURAHS_LOADED, "true").await.unwrap();
        assert!(repo.get_bool(metadata_keys::SURAHS_LOADED).await.unwrap());
    }
}
