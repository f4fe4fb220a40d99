//! # Catalog Sync Module
//!
//! Keeps the on-device catalog cache in line with the CDN.
//!
//! ## Overview
//!
//! - Fetching the catalog document with cache-busting requests (`catalog`)
//! - Comparing the running app version with the published one (`version`)
//! - The launch sequence: first-launch load, background refresh and
//!   bundled surah loading (`orchestrator`)

pub mod catalog;
pub mod error;
pub mod orchestrator;
pub mod version;

pub use catalog::{Catalog, CatalogClient, CatalogSettings};
pub use error::{CatalogError, InitStage, Result, SyncError};
pub use orchestrator::{LaunchOutcome, RefreshOutcome, SyncOrchestrator, SyncState, FIRST_LAUNCH_KEY};
pub use version::{compare_versions, AppVersion, VersionCheck};
