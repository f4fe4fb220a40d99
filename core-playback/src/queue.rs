//! # Playback Queue Manager
//!
//! Owns the current track, the active queue and the playback mode, and drives
//! the host [`AudioEngine`].
//!
//! ## Modes
//!
//! - **Shuffle**: the active queue is a random permutation of the queue given
//!   to [`PlaybackQueueManager::play`]; advancing plays the head and reshuffles
//!   the remainder.
//! - **Repeat**: the active queue keeps its original order and advancing
//!   restarts the current track.
//!
//! State lives behind a `parking_lot::Mutex` that is never held across an
//! engine call.

use crate::error::{PlaybackError, Result};
use crate::shuffle::fisher_yates;
use crate::track::Track;
use bridge_traits::AudioEngine;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::PlaybackMode;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// What a call to [`PlaybackQueueManager::advance`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// Repeat mode restarted the current track.
    Repeated,
    /// The head of the queue started playing.
    Advanced(Track),
    /// The queue was empty; nothing changed.
    Exhausted,
    /// Repeat mode with no current track; nothing changed.
    Idle,
}

#[derive(Debug, Default)]
struct QueueState {
    current: Option<Track>,
    queue: Vec<Track>,
    original_queue: Vec<Track>,
    mode: PlaybackMode,
}

pub struct PlaybackQueueManager {
    engine: Arc<dyn AudioEngine>,
    event_bus: EventBus,
    state: Mutex<QueueState>,
    rng: Mutex<StdRng>,
}

impl PlaybackQueueManager {
    pub fn new(engine: Arc<dyn AudioEngine>, event_bus: EventBus, mode: PlaybackMode) -> Self {
        Self {
            engine,
            event_bus,
            state: Mutex::new(QueueState {
                mode,
                ..Default::default()
            }),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a fixed random source, for reproducible shuffles.
    pub fn with_rng(self, rng: StdRng) -> Self {
        *self.rng.lock() = rng;
        self
    }

    pub fn engine(&self) -> &Arc<dyn AudioEngine> {
        &self.engine
    }

    pub fn current_track(&self) -> Option<Track> {
        self.state.lock().current.clone()
    }

    /// The active queue, in the order it will play.
    pub fn queue(&self) -> Vec<Track> {
        self.state.lock().queue.clone()
    }

    /// The queue in the order it was given to `play`.
    pub fn original_queue(&self) -> Vec<Track> {
        self.state.lock().original_queue.clone()
    }

    pub fn mode(&self) -> PlaybackMode {
        self.state.lock().mode
    }

    fn shuffled(&self, tracks: &[Track]) -> Vec<Track> {
        let mut shuffled = tracks.to_vec();
        fisher_yates(&mut shuffled, &mut *self.rng.lock());
        shuffled
    }

    /// Start `track` and queue `queue` behind it.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::EngineNotReady`] before the engine is initialized;
    ///   nothing changes
    /// - [`PlaybackError::SourceRejected`] when the engine cannot load the
    ///   track; nothing changes
    /// - [`PlaybackError::Engine`] when starting playback fails after the
    ///   track was loaded
    #[instrument(skip_all, fields(reciter_id = %track.reciter_id, surah = track.surah_number))]
    pub async fn play(&self, track: Track, queue: Vec<Track>) -> Result<()> {
        if !self.engine.is_ready() {
            return Err(PlaybackError::EngineNotReady);
        }

        let active = match self.mode() {
            PlaybackMode::Shuffle => self.shuffled(&queue),
            PlaybackMode::Repeat => queue.clone(),
        };

        self.engine
            .replace_source(track.source.clone())
            .await
            .map_err(|e| PlaybackError::SourceRejected(e.to_string()))?;

        let remaining = active.len() as u64;
        {
            let mut state = self.state.lock();
            state.current = Some(track.clone());
            state.queue = active;
            state.original_queue = queue;
        }

        self.engine.play().await?;

        info!(
            surah_name = %track.surah_name,
            reciter_name = %track.reciter_name,
            remaining,
            "Playing"
        );
        self.event_bus
            .emit(CoreEvent::Playback(PlaybackEvent::TrackStarted {
                reciter_id: track.reciter_id,
                surah_number: track.surah_number,
                remaining,
            }))
            .ok();

        Ok(())
    }

    /// Move on after the current track ends.
    ///
    /// Repeat mode restarts the current track without touching the queue.
    /// Shuffle mode plays the head of the queue with the rest as the new
    /// queue; an empty queue is a no-op and makes no engine call.
    #[instrument(skip(self))]
    pub async fn advance(&self) -> Result<AdvanceOutcome> {
        let (mode, current) = {
            let state = self.state.lock();
            (state.mode, state.current.clone())
        };

        if mode == PlaybackMode::Repeat {
            let Some(current) = current else {
                debug!("Nothing to repeat");
                return Ok(AdvanceOutcome::Idle);
            };

            self.engine.seek_to(Duration::ZERO).await?;
            self.engine.play().await?;

            self.event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::TrackRepeated {
                    reciter_id: current.reciter_id,
                    surah_number: current.surah_number,
                }))
                .ok();
            return Ok(AdvanceOutcome::Repeated);
        }

        let next = {
            let state = self.state.lock();
            state
                .queue
                .split_first()
                .map(|(head, rest)| (head.clone(), rest.to_vec()))
        };

        let Some((head, rest)) = next else {
            debug!("No next track in queue");
            self.event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::QueueExhausted))
                .ok();
            return Ok(AdvanceOutcome::Exhausted);
        };

        self.play(head.clone(), rest).await?;
        Ok(AdvanceOutcome::Advanced(head))
    }

    /// Switch mode: shuffle draws a fresh permutation of the original queue,
    /// repeat restores its order.
    pub fn set_mode(&self, mode: PlaybackMode) {
        let original = {
            let mut state = self.state.lock();
            state.mode = mode;
            state.original_queue.clone()
        };

        let queue = match mode {
            PlaybackMode::Shuffle if !original.is_empty() => Some(self.shuffled(&original)),
            PlaybackMode::Shuffle => None,
            PlaybackMode::Repeat => Some(original),
        };

        if let Some(queue) = queue {
            self.state.lock().queue = queue;
        }

        debug!(%mode, "Playback mode changed");
        self.event_bus
            .emit(CoreEvent::Playback(PlaybackEvent::ModeChanged { mode }))
            .ok();
    }

    pub async fn seek_to(&self, position: Duration) -> Result<()> {
        self.engine.seek_to(position).await?;
        Ok(())
    }

    /// Pause when playing, resume otherwise. Returns whether audio is now playing.
    pub async fn toggle_play_pause(&self) -> Result<bool> {
        let status = self.engine.status().await?;
        if status.is_playing {
            self.engine.pause().await?;
            Ok(false)
        } else {
            self.engine.play().await?;
            Ok(true)
        }
    }

    /// Drop the current track and both queues, and pause the engine.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.current = None;
            state.queue.clear();
            state.original_queue.clear();
        }

        if self.engine.is_ready() {
            self.engine.pause().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::{AudioSource, EngineStatus};
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Engine {}

        #[async_trait::async_trait]
        impl AudioEngine for Engine {
            fn is_ready(&self) -> bool;
            async fn replace_source(&self, source: AudioSource) -> BridgeResult<()>;
            async fn play(&self) -> BridgeResult<()>;
            async fn pause(&self) -> BridgeResult<()>;
            async fn seek_to(&self, position: Duration) -> BridgeResult<()>;
            async fn status(&self) -> BridgeResult<EngineStatus>;
        }
    }

    fn track(surah_number: u16) -> Track {
        Track {
            reciter_id: "alafasy".to_string(),
            reciter_name: "Mishary Alafasy".to_string(),
            reciter_color_primary: String::new(),
            reciter_color_secondary: String::new(),
            surah_number,
            surah_name: format!("Surah {}", surah_number),
            source: AudioSource::remote(format!(
                "https://cdn.example.com/audio/alafasy/{:03}.mp3",
                surah_number
            )),
            is_downloaded: false,
        }
    }

    fn numbers(tracks: &[Track]) -> Vec<u16> {
        tracks.iter().map(|t| t.surah_number).collect()
    }

    fn ready_engine() -> MockEngine {
        let mut engine = MockEngine::new();
        engine.expect_is_ready().return_const(true);
        engine
    }

    fn manager(engine: MockEngine, mode: PlaybackMode) -> PlaybackQueueManager {
        PlaybackQueueManager::new(Arc::new(engine), EventBus::new(16), mode)
            .with_rng(StdRng::seed_from_u64(11))
    }

    #[tokio::test]
    async fn test_play_requires_ready_engine() {
        let mut engine = MockEngine::new();
        engine.expect_is_ready().return_const(false);
        engine.expect_replace_source().never();
        engine.expect_play().never();

        let manager = manager(engine, PlaybackMode::Shuffle);
        let err = manager.play(track(1), vec![track(2)]).await.unwrap_err();

        assert!(matches!(err, PlaybackError::EngineNotReady));
        assert!(manager.current_track().is_none());
        assert!(manager.queue().is_empty());
    }

    #[tokio::test]
    async fn test_play_loads_source_and_starts() {
        let mut engine = ready_engine();
        engine
            .expect_replace_source()
            .with(eq(AudioSource::remote(
                "https://cdn.example.com/audio/alafasy/036.mp3",
            )))
            .times(1)
            .returning(|_| Ok(()));
        engine.expect_play().times(1).returning(|| Ok(()));

        let manager = manager(engine, PlaybackMode::Repeat);
        manager
            .play(track(36), vec![track(37), track(38)])
            .await
            .unwrap();

        assert_eq!(manager.current_track().unwrap().surah_number, 36);
        assert_eq!(numbers(&manager.queue()), vec![37, 38]);
    }

    #[tokio::test]
    async fn test_rejected_source_keeps_state() {
        let mut engine = ready_engine();
        engine
            .expect_replace_source()
            .returning(|_| Err(BridgeError::OperationFailed("unsupported".to_string())));
        engine.expect_play().never();

        let manager = manager(engine, PlaybackMode::Repeat);
        let err = manager.play(track(1), vec![track(2)]).await.unwrap_err();

        assert!(matches!(err, PlaybackError::SourceRejected(_)));
        assert!(manager.current_track().is_none());
    }

    #[tokio::test]
    async fn test_shuffle_play_permutes_queue() {
        let mut engine = ready_engine();
        engine.expect_replace_source().returning(|_| Ok(()));
        engine.expect_play().returning(|| Ok(()));

        let manager = manager(engine, PlaybackMode::Shuffle);
        let queue: Vec<Track> = (2..=30).map(track).collect();
        manager.play(track(1), queue).await.unwrap();

        let active = numbers(&manager.queue());
        let mut sorted = active.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (2..=30).collect::<Vec<u16>>());
        assert_eq!(numbers(&manager.original_queue()), (2..=30).collect::<Vec<u16>>());
    }

    #[tokio::test]
    async fn test_advance_on_empty_queue_makes_no_engine_call() {
        let mut engine = ready_engine();
        engine.expect_replace_source().times(1).returning(|_| Ok(()));
        engine.expect_play().times(1).returning(|| Ok(()));
        engine.expect_seek_to().never();

        let manager = manager(engine, PlaybackMode::Shuffle);
        manager.play(track(5), Vec::new()).await.unwrap();

        assert_eq!(manager.advance().await.unwrap(), AdvanceOutcome::Exhausted);
        assert_eq!(manager.current_track().unwrap().surah_number, 5);
    }

    #[tokio::test]
    async fn test_advance_repeat_without_current_is_idle() {
        let mut engine = MockEngine::new();
        engine.expect_seek_to().never();
        engine.expect_play().never();

        let manager = manager(engine, PlaybackMode::Repeat);
        assert_eq!(manager.advance().await.unwrap(), AdvanceOutcome::Idle);
    }

    #[tokio::test]
    async fn test_set_mode_restores_and_reshuffles() {
        let mut engine = ready_engine();
        engine.expect_replace_source().returning(|_| Ok(()));
        engine.expect_play().returning(|| Ok(()));

        let manager = manager(engine, PlaybackMode::Shuffle);
        let ordered: Vec<u16> = (2..=40).collect();
        manager
            .play(track(1), ordered.iter().copied().map(track).collect())
            .await
            .unwrap();

        manager.set_mode(PlaybackMode::Repeat);
        assert_eq!(manager.mode(), PlaybackMode::Repeat);
        assert_eq!(numbers(&manager.queue()), ordered);

        manager.set_mode(PlaybackMode::Shuffle);
        let reshuffled = numbers(&manager.queue());
        assert_ne!(reshuffled, ordered);
        let mut sorted = reshuffled.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, ordered);
    }

    #[tokio::test]
    async fn test_toggle_play_pause() {
        let mut engine = ready_engine();
        engine.expect_status().times(1).returning(|| {
            Ok(EngineStatus {
                is_playing: true,
                ..Default::default()
            })
        });
        engine.expect_pause().times(1).returning(|| Ok(()));

        let manager = manager(engine, PlaybackMode::Shuffle);
        assert!(!manager.toggle_play_pause().await.unwrap());
    }

    #[tokio::test]
    async fn test_clear() {
        let mut engine = ready_engine();
        engine.expect_replace_source().returning(|_| Ok(()));
        engine.expect_play().returning(|| Ok(()));
        engine.expect_pause().times(1).returning(|| Ok(()));

        let manager = manager(engine, PlaybackMode::Repeat);
        manager.play(track(1), vec![track(2)]).await.unwrap();
        manager.clear().await.unwrap();

        assert!(manager.current_track().is_none());
        assert!(manager.queue().is_empty());
        assert!(manager.original_queue().is_empty());
    }
}
