//! Download marker repository
//!
//! A marker records that the audio for one (reciter, surah) pair is stored on
//! the device. Recording the same pair twice replaces the earlier marker.

use crate::error::{LibraryError, Result};
use crate::models::Download;
use async_trait::async_trait;
use sqlx::{query, query_as, SqlitePool};

// Rows written by older releases stored `downloaded_at` as a datetime string.
const SELECT_DOWNLOAD: &str = r#"
    SELECT
        reciter_id,
        surah_number,
        local_file_path,
        CASE typeof(downloaded_at)
            WHEN 'integer' THEN downloaded_at
            ELSE CAST(strftime('%s', downloaded_at) AS INTEGER)
        END AS downloaded_at
    FROM downloads
"#;

#[async_trait]
pub trait DownloadRepository: Send + Sync {
    /// Insert a marker, replacing any existing one for the same pair
    async fn upsert(&self, download: &Download) -> Result<()>;

    async fn find(&self, reciter_id: &str, surah_number: u16) -> Result<Option<Download>>;

    /// All markers, most recent first
    async fn find_all(&self) -> Result<Vec<Download>>;

    /// Markers for one reciter ordered by surah number
    async fn find_by_reciter(&self, reciter_id: &str) -> Result<Vec<Download>>;

    /// Delete a marker
    ///
    /// # Returns
    /// - `Ok(true)` if a marker was deleted
    /// - `Ok(false)` if there was none
    async fn delete(&self, reciter_id: &str, surah_number: u16) -> Result<bool>;

    async fn is_downloaded(&self, reciter_id: &str, surah_number: u16) -> Result<bool>;
}

/// SQLite implementation of DownloadRepository
pub struct SqliteDownloadRepository {
    pool: SqlitePool,
}

impl SqliteDownloadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DownloadRepository for SqliteDownloadRepository {
    async fn upsert(&self, download: &Download) -> Result<()> {
        download.validate().map_err(|e| LibraryError::InvalidInput {
            field: "Download".to_string(),
            message: e,
        })?;

        query(
            r#"
            INSERT OR REPLACE INTO downloads (reciter_id, surah_number, local_file_path, downloaded_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&download.reciter_id)
        .bind(download.surah_number)
        .bind(&download.local_file_path)
        .bind(download.downloaded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, reciter_id: &str, surah_number: u16) -> Result<Option<Download>> {
        let sql = format!("{} WHERE reciter_id = ? AND surah_number = ?", SELECT_DOWNLOAD);
        let download = query_as::<_, Download>(&sql)
            .bind(reciter_id)
            .bind(surah_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(download)
    }

    async fn find_all(&self) -> Result<Vec<Download>> {
        let sql = format!(
            "{} ORDER BY downloaded_at DESC, reciter_id, surah_number",
            SELECT_DOWNLOAD
        );
        let downloads = query_as::<_, Download>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(downloads)
    }

    async fn find_by_reciter(&self, reciter_id: &str) -> Result<Vec<Download>> {
        let sql = format!("{} WHERE reciter_id = ? ORDER BY surah_number", SELECT_DOWNLOAD);
        let downloads = query_as::<_, Download>(&sql)
            .bind(reciter_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(downloads)
    }

    async fn delete(&self, reciter_id: &str, surah_number: u16) -> Result<bool> {
        let result = query("DELETE FROM downloads WHERE reciter_id = ? AND surah_number = ?")
            .bind(reciter_id)
            .bind(surah_number)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn is_downloaded(&self, reciter_id: &str, surah_number: u16) -> Result<bool> {
        let count: (i64,) =
            query_as("SELECT COUNT(*) FROM downloads WHERE reciter_id = ? AND surah_number = ?")
                .bind(reciter_id)
                .bind(surah_number)
                .fetch_one(&self.pool)
                .await?;

        Ok(count.0 > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn setup_repo() -> (SqlitePool, SqliteDownloadRepository) {
        let pool = create_test_pool().await.unwrap();
        (pool.clone(), SqliteDownloadRepository::new(pool))
    }

    #[tokio::test]
    async fn test_upsert_replaces_marker() {
        let (_pool, repo) = setup_repo().await;

        repo.upsert(&Download::new("alafasy", 2, "/a/002.mp3", 100))
            .await
            .unwrap();
        repo.upsert(&Download::new("alafasy", 2, "/b/002.mp3", 200))
            .await
            .unwrap();

        let found = repo.find("alafasy", 2).await.unwrap().unwrap();
        assert_eq!(found.local_file_path, "/b/002.mp3");
        assert_eq!(found.downloaded_at, 200);
        assert_eq!(repo.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_queries_and_ordering() {
        let (_pool, repo) = setup_repo().await;
        repo.upsert(&Download::new("alafasy", 36, "/d/036.mp3", 300))
            .await
            .unwrap();
        repo.upsert(&Download::new("alafasy", 1, "/d/001.mp3", 100))
            .await
            .unwrap();
        repo.upsert(&Download::new("husary", 18, "/d/018.mp3", 200))
            .await
            .unwrap();

        let newest_first: Vec<i64> = repo
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|d| d.downloaded_at)
            .collect();
        assert_eq!(newest_first, vec![300, 200, 100]);

        let by_reciter: Vec<u16> = repo
            .find_by_reciter("alafasy")
            .await
            .unwrap()
            .iter()
            .map(|d| d.surah_number)
            .collect();
        assert_eq!(by_reciter, vec![1, 36]);

        assert!(repo.is_downloaded("husary", 18).await.unwrap());
        assert!(!repo.is_downloaded("husary", 19).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let (_pool, repo) = setup_repo().await;
        repo.upsert(&Download::new("alafasy", 1, "/d/001.mp3", 1))
            .await
            .unwrap();

        assert!(repo.delete("alafasy", 1).await.unwrap());
        assert!(!repo.delete("alafasy", 1).await.unwrap());
        assert!(repo.find("alafasy", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_legacy_text_timestamp_is_read_as_unix_seconds() {
        let (pool, repo) = setup_repo().await;
        query(
            "INSERT INTO downloads (reciter_id, surah_number, local_file_path, downloaded_at) \
             VALUES ('alafasy', 3, '/d/003.mp3', '2024-01-01 00:00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let found = repo.find("alafasy", 3).await.unwrap().unwrap();
        assert_eq!(found.downloaded_at, 1_704_067_200);
    }

    #[tokio::test]
    async fn test_invalid_marker_is_rejected() {
        let (_pool, repo) = setup_repo().await;
        let result = repo.upsert(&Download::new("alafasy", 0, "/d/000.mp3", 1)).await;
        assert!(matches!(result, Err(LibraryError::InvalidInput { .. })));
    }
}
