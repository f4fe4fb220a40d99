//! Playback bridge traits and supporting audio types.
//!
//! The core never decodes audio. It drives a host-provided engine (AVPlayer,
//! ExoPlayer, a desktop sink) through [`AudioEngine`] and observes it by
//! polling [`AudioEngine::status`].

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::Result;

/// High-level audio source descriptor provided to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Local file accessible to the host runtime.
    LocalFile { path: PathBuf },
    /// Remote HTTP(S) stream to be fetched by the host.
    RemoteStream { url: String },
}

impl AudioSource {
    pub fn remote(url: impl Into<String>) -> Self {
        AudioSource::RemoteStream { url: url.into() }
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        AudioSource::LocalFile { path: path.into() }
    }

    /// Determine whether the source represents remote content.
    pub fn is_remote(&self) -> bool {
        matches!(self, AudioSource::RemoteStream { .. })
    }
}

/// Snapshot of the engine's transport state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineStatus {
    /// Current playback position.
    pub position: Duration,
    /// Total duration of the loaded source, when known.
    pub duration: Option<Duration>,
    /// Whether audio is currently being rendered.
    pub is_playing: bool,
}

impl EngineStatus {
    /// Time left until the end of the source, if the duration is known.
    pub fn remaining(&self) -> Option<Duration> {
        self.duration.map(|d| d.saturating_sub(self.position))
    }
}

/// Host audio engine contract.
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Whether the engine has been initialized and can accept a source.
    fn is_ready(&self) -> bool;

    /// Replace the currently loaded source. Does not start playback.
    async fn replace_source(&self, source: AudioSource) -> Result<()>;

    /// Begin or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback without unloading the source.
    async fn pause(&self) -> Result<()>;

    /// Seek to an absolute position within the source.
    async fn seek_to(&self, position: Duration) -> Result<()>;

    /// Poll the engine state.
    async fn status(&self) -> Result<EngineStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_source_kinds() {
        assert!(AudioSource::remote("https://cdn/audio/a/001.mp3").is_remote());
        assert!(!AudioSource::local("/data/a/001.mp3").is_remote());
    }

    #[test]
    fn remaining_time() {
        let status = EngineStatus {
            position: Duration::from_secs(95),
            duration: Some(Duration::from_secs(100)),
            is_playing: true,
        };
        assert_eq!(status.remaining(), Some(Duration::from_secs(5)));

        let overshoot = EngineStatus {
            position: Duration::from_secs(120),
            duration: Some(Duration::from_secs(100)),
            is_playing: false,
        };
        assert_eq!(overshoot.remaining(), Some(Duration::ZERO));

        assert_eq!(EngineStatus::default().remaining(), None);
    }
}
