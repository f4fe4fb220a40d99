//! # Playback Error Types

use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The host audio engine has not been initialized.
    #[error("Audio engine not ready")]
    EngineNotReady,

    /// The engine refused to load the audio source.
    #[error("Audio source rejected: {0}")]
    SourceRejected(String),

    /// A transport call (play, pause, seek, status) failed.
    #[error("Audio engine error: {0}")]
    Engine(#[from] BridgeError),

    // ========================================================================
    // Track Resolution Errors
    // ========================================================================
    #[error("Reciter not found: {0}")]
    ReciterNotFound(String),

    #[error("Surah not found: {0}")]
    SurahNotFound(u16),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

impl PlaybackError {
    /// Returns `true` if the error came from the host engine.
    pub fn is_engine_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::EngineNotReady
                | PlaybackError::SourceRejected(_)
                | PlaybackError::Engine(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
