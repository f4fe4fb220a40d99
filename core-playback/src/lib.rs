//! # Playback Queue Module
//!
//! Drives the host audio engine for surah playback.
//!
//! ## Overview
//!
//! This module handles:
//! - Building playable tracks from the local store (`track`)
//! - Uniform shuffling (`shuffle`)
//! - The current track, queue and shuffle/repeat mode (`queue`)
//! - Advancing automatically when a track ends (`monitor`)

pub mod error;
pub mod monitor;
pub mod queue;
pub mod shuffle;
pub mod track;

pub use error::{PlaybackError, Result};
pub use monitor::{AutoAdvanceMonitor, EndOfTrackDetector};
pub use queue::{AdvanceOutcome, PlaybackQueueManager};
pub use shuffle::fisher_yates;
pub use track::{split_shuffled, Locale, Track, TrackResolver};
