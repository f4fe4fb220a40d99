//! # Repository Pattern Implementation
//!
//! Repository traits and their SQLite implementations for the local store.
//!
//! - Traits define the interface for each repository
//! - SQLite implementations use sqlx for async database access
//! - Multi-row writes run inside a single transaction
//!
//! ## Available Repositories
//!
//! - `ReciterRepository` - Mirror of the reciters published in the catalog
//! - `SurahRepository` - The 114 surahs loaded from bundled data
//! - `DownloadRepository` - Markers for recitations saved on the device
//! - `MetadataRepository` - Key/value application metadata

pub mod download;
pub mod metadata;
pub mod reciter;
pub mod surah;

pub use download::{DownloadRepository, SqliteDownloadRepository};
pub use metadata::{MetadataRepository, SqliteMetadataRepository};
pub use reciter::{ReciterRepository, SqliteReciterRepository};
pub use surah::{SqliteSurahRepository, SurahRepository};
