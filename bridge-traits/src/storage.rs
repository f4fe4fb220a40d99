//! Settings Storage Abstraction
//!
//! Key-value preferences storage that lives outside the catalog database, so
//! that wiping the catalog does not lose launch bookkeeping (and vice versa):
//! - iOS: UserDefaults
//! - Android: SharedPreferences / DataStore
//! - Desktop: SQLite-backed key-value store
//!
//! # Example
//!
//! ```ignore
//! use bridge_traits::storage::SettingsStore;
//!
//! async fn mark_first_launch(store: &dyn SettingsStore) -> Result<()> {
//!     store.set_string("first_launch_complete", "true").await
//! }
//! ```

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage trait
///
/// The core only records the presence of a key, so hosts need to provide
/// nothing beyond a write and an existence check.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value, replacing any previous one
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;
}
