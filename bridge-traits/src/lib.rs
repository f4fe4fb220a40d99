//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the Qariee core and the
//! platform-specific shells. Each trait represents a capability that the core
//! requires but that must be implemented differently per platform.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-attempt async `GET` for the catalog
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences (first-launch flag)
//!
//! ### Playback
//! - [`AudioEngine`](playback::AudioEngine) - Host audio player driven by the queue manager
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | iOS      | Host app (Swift)    | 📋 Planned |
//! | Android  | Host app (Kotlin)   | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| CoreError::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "Desktop: enable the desktop-shims feature. \
//!                   Mobile: inject a platform-native adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so that adapters can be shared
//! between the sync orchestrator, the background refresh task and the
//! playback monitor.

pub mod error;
pub mod http;
pub mod playback;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use playback::{AudioEngine, AudioSource, EngineStatus};
pub use storage::SettingsStore;
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
