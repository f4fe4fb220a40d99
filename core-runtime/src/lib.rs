//! # Core Runtime Module
//!
//! Foundational infrastructure shared by every Qariee core crate:
//! - Logging and tracing setup
//! - Configuration (`CoreConfig`, CDN snapshot handle, playback tuning)
//! - Event bus
//!
//! Nothing here talks to the network or the database; those concerns live in
//! `core-sync` and `core-library`.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CdnConfig, CdnConfigHandle, CoreConfig, PlaybackConfig, PlaybackMode};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, PlaybackEvent, SyncEvent};
