//! # Event Bus System
//!
//! Typed, broadcast-based notifications from the sync orchestrator and the
//! playback queue to whoever is listening (usually the host UI layer).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ Sync Orchestrator├────────>│           ├────────────>│ Host UI    │
//! └──────────────────┘         │ EventBus  │             └────────────┘
//! ┌──────────────────┐  emit   │ (broadcast│  subscribe  ┌────────────┐
//! │ Playback Queue   ├────────>│  channel) ├────────────>│ Telemetry  │
//! └──────────────────┘         └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::FirstLaunchStarted)).ok();
//! assert_eq!(rx.recv().await.unwrap(), CoreEvent::Sync(SyncEvent::FirstLaunchStarted));
//! # }
//! ```
//!
//! Emitting with no subscribers returns an error that producers ignore with
//! `.ok()`: notifications are best effort and never affect control flow.
//!
//! Slow subscribers receive `RecvError::Lagged(n)` and may keep reading;
//! `RecvError::Closed` means every sender is gone.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

use crate::config::PlaybackMode;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Sync(SyncEvent),
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::RefreshFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::UpdateAvailable { is_mandatory, .. }) => {
                if *is_mandatory {
                    EventSeverity::Warning
                } else {
                    EventSeverity::Info
                }
            }
            CoreEvent::Sync(SyncEvent::FirstLaunchCompleted { .. })
            | CoreEvent::Sync(SyncEvent::CatalogRefreshed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Catalog synchronization lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// The blocking first-launch load began.
    FirstLaunchStarted,
    /// The first-launch load finished and the flag was persisted.
    FirstLaunchCompleted {
        reciter_count: u64,
        surah_count: u64,
    },
    /// The server advertises a newer app version.
    ///
    /// `is_mandatory` is advisory; the core never blocks on it.
    UpdateAvailable {
        current_version: String,
        latest_version: String,
        min_version: String,
        is_mandatory: bool,
    },
    /// A background or manual refresh replaced the reciter set.
    CatalogRefreshed {
        reciter_count: u64,
        db_version: String,
    },
    /// A background refresh found the same reciter ids and wrote nothing.
    RefreshSkipped { reciter_count: u64 },
    /// A background refresh failed. Cached data stays in place.
    RefreshFailed { message: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::FirstLaunchStarted => "First launch load started",
            SyncEvent::FirstLaunchCompleted { .. } => "First launch load completed",
            SyncEvent::UpdateAvailable { .. } => "App update available",
            SyncEvent::CatalogRefreshed { .. } => "Catalog refreshed",
            SyncEvent::RefreshSkipped { .. } => "Catalog unchanged",
            SyncEvent::RefreshFailed { .. } => "Catalog refresh failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Queue transitions driven by the playback queue manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new track was handed to the engine.
    TrackStarted {
        reciter_id: String,
        surah_number: u16,
        /// Tracks still waiting after this one.
        remaining: u64,
    },
    /// Repeat mode restarted the current track.
    TrackRepeated {
        reciter_id: String,
        surah_number: u16,
    },
    /// Shuffle mode reached the end of the queue.
    QueueExhausted,
    /// The playback mode was switched.
    ModeChanged { mode: PlaybackMode },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::TrackStarted { .. } => "Track started",
            PlaybackEvent::TrackRepeated { .. } => "Track repeated",
            PlaybackEvent::QueueExhausted => "Queue exhausted",
            PlaybackEvent::ModeChanged { .. } => "Playback mode changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cloning the bus is cheap and every clone publishes into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus that buffers up to `capacity` events per
    /// subscriber before reporting `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates an independent receiver for all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::default();
/// let sync_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` will be returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
