//! # Database Connection Pool Module
//!
//! Provides the SQLite pool for the recitation catalog and the schema it
//! expects.
//!
//! ## Features
//!
//! - **WAL Mode**: readers (UI queries) never block the sync writer
//! - **Idempotent schema**: `CREATE TABLE IF NOT EXISTS` on every start
//! - **Additive migrations**: columns introduced after the first release are
//!   detected with `PRAGMA table_info` and added in place; tables are never
//!   dropped or rewritten, so cached data and download markers survive
//! - **Health Checks**: connection validation after setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_library::db::{create_pool, DatabaseConfig};
//!
//! let pool = create_pool(DatabaseConfig::new("/data/qariee.db")).await?;
//! ```
//!
//! ## Testing
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::bundled;
use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Database configuration for SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:` URL of the database file, or `sqlite::memory:`
    pub database_url: String,

    pub min_connections: u32,

    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    pub max_lifetime: Option<Duration>,

    pub idle_timeout: Option<Duration>,

    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a configuration for the database file at `database_path`.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 4,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(1800)),
            idle_timeout: Some(Duration::from_secs(600)),
            statement_cache_capacity: 64,
        }
    }

    /// Create a configuration for an in-memory database.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: None,
            idle_timeout: None,
            statement_cache_capacity: 64,
        }
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// 1. Configures connection options (WAL, foreign keys, create-if-missing)
/// 2. Opens the pool
/// 3. Initializes the schema and applies additive migrations
/// 4. Performs a health check
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the schema cannot be
/// brought up to date, or the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(LibraryError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5))
        .statement_cache_capacity(config.statement_cache_capacity);

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            LibraryError::Database(e)
        })?;

    initialize_schema(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create an in-memory pool with the schema already applied.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS reciters (
        id TEXT PRIMARY KEY,
        name_en TEXT NOT NULL,
        name_ar TEXT NOT NULL,
        color_primary TEXT NOT NULL DEFAULT '',
        color_secondary TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS surahs (
        number INTEGER PRIMARY KEY,
        name_ar TEXT NOT NULL,
        name_en TEXT NOT NULL,
        verses INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS downloads (
        reciter_id TEXT NOT NULL,
        surah_number INTEGER NOT NULL,
        local_file_path TEXT NOT NULL,
        downloaded_at INTEGER NOT NULL DEFAULT (CAST(strftime('%s', 'now') AS INTEGER)),
        PRIMARY KEY (reciter_id, surah_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS app_metadata (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

/// Columns added after the first schema: (table, column, definition).
const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("reciters", "color_primary", "TEXT NOT NULL DEFAULT ''"),
    ("reciters", "color_secondary", "TEXT NOT NULL DEFAULT ''"),
    ("surahs", "verses", "INTEGER NOT NULL DEFAULT 0"),
];

/// Bring the schema up to date.
///
/// Safe to call on every start. Returns the `table.column` names that were
/// added by this call (empty when the schema was already current).
///
/// When `surahs.verses` is added to a table that already holds surahs, the
/// verse counts are backfilled from the bundled data.
#[instrument(skip(pool))]
pub async fn initialize_schema(pool: &Pool<Sqlite>) -> Result<Vec<String>> {
    for statement in CREATE_TABLES {
        sqlx::query(statement).execute(pool).await.map_err(|e| {
            warn!(error = %e, "Failed to create table");
            LibraryError::Migration(e.to_string())
        })?;
    }

    let mut applied = Vec::new();
    for (table, column, definition) in ADDITIVE_COLUMNS {
        if table_columns(pool, table).await?.iter().any(|c| c == column) {
            continue;
        }

        let statement = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, definition);
        sqlx::query(&statement).execute(pool).await.map_err(|e| {
            warn!(table, column, error = %e, "Additive migration failed");
            LibraryError::Migration(format!("{}.{}: {}", table, column, e))
        })?;

        info!(table, column, "Added column");
        applied.push(format!("{}.{}", table, column));
    }

    if applied.iter().any(|c| c == "surahs.verses") {
        backfill_verse_counts(pool).await?;
    }

    debug!(migrations = applied.len(), "Schema is current");
    Ok(applied)
}

async fn table_columns(pool: &Pool<Sqlite>, table: &str) -> Result<Vec<String>> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|row| row.try_get::<String, _>("name").map_err(LibraryError::from))
        .collect()
}

async fn backfill_verse_counts(pool: &Pool<Sqlite>) -> Result<()> {
    let surahs = bundled::surahs()?;
    let mut tx = pool.begin().await?;

    for surah in &surahs {
        sqlx::query("UPDATE surahs SET verses = ? WHERE number = ?")
            .bind(surah.verses)
            .bind(surah.number)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    debug!("Backfilled verse counts");
    Ok(())
}

/// Verify the pool can serve a trivial query.
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        LibraryError::Database(e)
    })?;

    debug!("Database health check passed");
    Ok(())
}
