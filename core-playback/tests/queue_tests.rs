//! Queue semantics and auto-advance against a recording engine
//!
//! This test suite verifies:
//! - Repeat mode restarts the current track and leaves the queue alone
//! - Shuffle mode walks the queue head by head and stops when it is empty
//! - Events emitted for each transition
//! - The auto-advance monitor advances once per finished track and stops on
//!   cancellation

use async_trait::async_trait;
use bridge_traits::{error::Result as BridgeResult, AudioEngine, AudioSource, EngineStatus};
use core_playback::{AdvanceOutcome, AutoAdvanceMonitor, PlaybackQueueManager, Track};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use core_runtime::{PlaybackConfig, PlaybackMode};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Recording Engine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum EngineCall {
    Replace(AudioSource),
    Play,
    Pause,
    Seek(Duration),
}

/// Records every transport call and plays back a scripted status.
struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    status: Mutex<EngineStatus>,
    status_polls: Mutex<usize>,
}

impl RecordingEngine {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            status: Mutex::new(EngineStatus::default()),
            status_polls: Mutex::new(0),
        }
    }

    fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    fn set_status(&self, status: EngineStatus) {
        *self.status.lock() = status;
    }

    fn polls(&self) -> usize {
        *self.status_polls.lock()
    }
}

#[async_trait]
impl AudioEngine for RecordingEngine {
    fn is_ready(&self) -> bool {
        true
    }

    async fn replace_source(&self, source: AudioSource) -> BridgeResult<()> {
        self.calls.lock().push(EngineCall::Replace(source));
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.calls.lock().push(EngineCall::Play);
        self.status.lock().is_playing = true;
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.calls.lock().push(EngineCall::Pause);
        self.status.lock().is_playing = false;
        Ok(())
    }

    async fn seek_to(&self, position: Duration) -> BridgeResult<()> {
        self.calls.lock().push(EngineCall::Seek(position));
        self.status.lock().position = position;
        Ok(())
    }

    async fn status(&self) -> BridgeResult<EngineStatus> {
        *self.status_polls.lock() += 1;
        Ok(*self.status.lock())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn track(label: &str, surah_number: u16) -> Track {
    Track {
        reciter_id: "alafasy".to_string(),
        reciter_name: "Mishary Alafasy".to_string(),
        reciter_color_primary: "#0d4d3d".to_string(),
        reciter_color_secondary: "#c9a961".to_string(),
        surah_number,
        surah_name: label.to_string(),
        source: AudioSource::remote(format!(
            "https://cdn.example.com/audio/alafasy/{:03}.mp3",
            surah_number
        )),
        is_downloaded: false,
    }
}

fn labels(tracks: &[Track]) -> Vec<String> {
    tracks.iter().map(|t| t.surah_name.clone()).collect()
}

fn setup(mode: PlaybackMode) -> (Arc<RecordingEngine>, EventBus, Arc<PlaybackQueueManager>) {
    let engine = Arc::new(RecordingEngine::new());
    let event_bus = EventBus::new(64);
    let manager = PlaybackQueueManager::new(engine.clone(), event_bus.clone(), mode)
        .with_rng(StdRng::seed_from_u64(5));
    (engine, event_bus, Arc::new(manager))
}

// ============================================================================
// Queue Semantics
// ============================================================================

#[tokio::test]
async fn test_repeat_advance_restarts_current_track() {
    let (engine, event_bus, manager) = setup(PlaybackMode::Repeat);
    let mut rx = event_bus.subscribe();

    manager
        .play(track("A", 1), vec![track("B", 2), track("C", 3)])
        .await
        .unwrap();
    engine.reset_calls();
    engine.set_status(EngineStatus {
        position: Duration::from_secs(300),
        duration: Some(Duration::from_secs(300)),
        is_playing: false,
    });

    let outcome = manager.advance().await.unwrap();

    assert_eq!(outcome, AdvanceOutcome::Repeated);
    assert_eq!(
        engine.calls(),
        vec![EngineCall::Seek(Duration::ZERO), EngineCall::Play]
    );
    let status = engine.status().await.unwrap();
    assert_eq!(status.position, Duration::ZERO);
    assert!(status.is_playing);

    assert_eq!(manager.current_track().unwrap().surah_name, "A");
    assert_eq!(labels(&manager.queue()), vec!["B", "C"]);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&CoreEvent::Playback(PlaybackEvent::TrackRepeated {
        reciter_id: "alafasy".to_string(),
        surah_number: 1,
    })));
}

#[tokio::test]
async fn test_shuffle_advance_walks_queue_then_stops() {
    let (engine, _event_bus, manager) = setup(PlaybackMode::Shuffle);
    manager
        .play(track("A", 1), vec![track("B", 2), track("C", 3)])
        .await
        .unwrap();
    let first = manager.queue()[0].clone();
    let second = manager.queue()[1].clone();

    engine.reset_calls();
    let outcome = manager.advance().await.unwrap();
    assert_eq!(outcome, AdvanceOutcome::Advanced(first.clone()));
    assert_eq!(manager.current_track(), Some(first.clone()));
    assert_eq!(manager.queue(), vec![second.clone()]);
    assert_eq!(
        engine.calls(),
        vec![EngineCall::Replace(first.source.clone()), EngineCall::Play]
    );

    manager.advance().await.unwrap();
    assert_eq!(manager.current_track(), Some(second.clone()));
    assert!(manager.queue().is_empty());

    engine.reset_calls();
    assert_eq!(manager.advance().await.unwrap(), AdvanceOutcome::Exhausted);
    assert_eq!(manager.current_track(), Some(second));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn test_mode_switch_mid_queue() {
    let (engine, _event_bus, manager) = setup(PlaybackMode::Repeat);
    manager
        .play(track("A", 1), vec![track("B", 2), track("C", 3)])
        .await
        .unwrap();
    assert_eq!(labels(&manager.queue()), vec!["B", "C"]);

    // Repeat restarts A, then shuffle moves on to the queue
    assert_eq!(manager.advance().await.unwrap(), AdvanceOutcome::Repeated);
    manager.set_mode(PlaybackMode::Shuffle);
    let head = manager.queue()[0].surah_name.clone();

    engine.reset_calls();
    manager.advance().await.unwrap();
    assert_eq!(manager.current_track().unwrap().surah_name, head);
    assert_eq!(manager.queue().len(), 1);
    assert_eq!(manager.original_queue().len(), 1);
    assert!(!engine.calls().contains(&EngineCall::Seek(Duration::ZERO)));

    manager.set_mode(PlaybackMode::Repeat);
    assert_eq!(manager.advance().await.unwrap(), AdvanceOutcome::Repeated);
    assert_eq!(manager.current_track().unwrap().surah_name, head);
}

#[tokio::test]
async fn test_pause_and_resume() {
    let (engine, _event_bus, manager) = setup(PlaybackMode::Shuffle);
    manager.play(track("A", 1), Vec::new()).await.unwrap();

    assert!(!manager.toggle_play_pause().await.unwrap());
    assert!(manager.toggle_play_pause().await.unwrap());

    let calls = engine.calls();
    assert_eq!(&calls[calls.len() - 2..], &[EngineCall::Pause, EngineCall::Play]);
}

#[tokio::test]
async fn test_events_for_play_and_exhaustion() {
    let (_engine, event_bus, manager) = setup(PlaybackMode::Shuffle);
    let mut rx = event_bus.subscribe();

    manager.play(track("A", 1), Vec::new()).await.unwrap();
    manager.advance().await.unwrap();

    assert_eq!(
        rx.try_recv().unwrap(),
        CoreEvent::Playback(PlaybackEvent::TrackStarted {
            reciter_id: "alafasy".to_string(),
            surah_number: 1,
            remaining: 0,
        })
    );
    assert_eq!(
        rx.try_recv().unwrap(),
        CoreEvent::Playback(PlaybackEvent::QueueExhausted)
    );
}

// ============================================================================
// Auto-Advance
// ============================================================================

fn fast_config() -> PlaybackConfig {
    PlaybackConfig {
        poll_interval: Duration::from_millis(5),
        end_threshold: Duration::from_secs(1),
        initial_mode: PlaybackMode::Shuffle,
    }
}

async fn wait_for_polls(engine: &RecordingEngine, polls: usize) {
    let start = engine.polls();
    for _ in 0..400 {
        if engine.polls() >= start + polls {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("monitor did not poll");
}

#[tokio::test]
async fn test_monitor_advances_once_per_finished_track() {
    let (engine, _event_bus, manager) = setup(PlaybackMode::Repeat);
    manager
        .play(track("A", 1), vec![track("B", 2), track("C", 3)])
        .await
        .unwrap();
    manager.set_mode(PlaybackMode::Shuffle);
    let expected_next = manager.queue()[0].clone();

    let monitor = AutoAdvanceMonitor::spawn(manager.clone(), &fast_config());
    wait_for_polls(&engine, 2).await;
    assert_eq!(manager.current_track().unwrap().surah_name, "A");

    // Track A reaches its end and the engine stops. The position never
    // leaves the end afterwards, so the detector must not fire again.
    engine.set_status(EngineStatus {
        position: Duration::from_millis(299_800),
        duration: Some(Duration::from_secs(300)),
        is_playing: false,
    });
    wait_for_polls(&engine, 10).await;

    assert_eq!(manager.current_track(), Some(expected_next));
    assert_eq!(manager.queue().len(), 1);

    monitor.shutdown().await;
}

#[tokio::test]
async fn test_monitor_stops_polling_when_cancelled() {
    let (engine, _event_bus, manager) = setup(PlaybackMode::Shuffle);

    let monitor = AutoAdvanceMonitor::spawn(manager, &fast_config());
    wait_for_polls(&engine, 2).await;
    assert!(monitor.is_running());

    monitor.stop();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_stop = engine.polls();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(engine.polls(), after_stop);
    assert!(!monitor.is_running());
}
