//! # Auto-Advance Monitor
//!
//! Polls the engine at a fixed interval and calls
//! [`PlaybackQueueManager::advance`] once per track when playback reaches the
//! end.
//!
//! The engine reports no end-of-track callback, only position, duration and
//! the playing flag. A track counts as finished when less than the end
//! threshold remains and the engine has stopped playing. A latch makes sure
//! that fires once; it re-arms when the position moves back away from the end
//! (a new track, or a repeat seeking to zero).

use crate::queue::PlaybackQueueManager;
use bridge_traits::EngineStatus;
use core_runtime::PlaybackConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Latched "near end and stopped" detector.
#[derive(Debug, Clone)]
pub struct EndOfTrackDetector {
    threshold: Duration,
    armed: bool,
}

impl EndOfTrackDetector {
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            armed: true,
        }
    }

    /// Feed one poll result. Returns `true` exactly when the track should
    /// advance.
    pub fn observe(&mut self, status: &EngineStatus) -> bool {
        let remaining = match (status.duration, status.remaining()) {
            (Some(duration), Some(remaining)) if !duration.is_zero() => remaining,
            // Nothing loaded yet
            _ => return false,
        };

        if remaining >= self.threshold {
            self.armed = true;
            return false;
        }

        if self.armed && !status.is_playing {
            self.armed = false;
            return true;
        }

        false
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}

/// Background task driving auto-advance. Cancelled on [`stop`](Self::stop) or drop.
pub struct AutoAdvanceMonitor {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AutoAdvanceMonitor {
    /// Spawn the polling task on the current tokio runtime.
    pub fn spawn(queue: Arc<PlaybackQueueManager>, config: &PlaybackConfig) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let poll_interval = config.poll_interval;
        let detector = EndOfTrackDetector::new(config.end_threshold);

        let handle = tokio::spawn(async move {
            run(queue, poll_interval, detector, token).await;
        });

        info!(?poll_interval, "Auto-advance monitor started");
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel and wait for the task to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Auto-advance task ended abnormally");
            }
        }
    }
}

impl Drop for AutoAdvanceMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    queue: Arc<PlaybackQueueManager>,
    poll_interval: Duration,
    mut detector: EndOfTrackDetector,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Auto-advance monitor stopped");
                return;
            }
            _ = ticker.tick() => {}
        }

        let engine = queue.engine();
        if !engine.is_ready() {
            continue;
        }

        let status = match engine.status().await {
            Ok(status) => status,
            Err(e) => {
                debug!(error = %e, "Engine status poll failed");
                continue;
            }
        };

        if detector.observe(&status) {
            debug!("Track finished");
            if let Err(e) = queue.advance().await {
                warn!(error = %e, "Auto-advance failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(position_ms: u64, duration_ms: u64, is_playing: bool) -> EngineStatus {
        EngineStatus {
            position: Duration::from_millis(position_ms),
            duration: Some(Duration::from_millis(duration_ms)),
            is_playing,
        }
    }

    #[test]
    fn test_detector_fires_once_near_end() {
        let mut detector = EndOfTrackDetector::new(Duration::from_secs(1));

        assert!(!detector.observe(&status(10_000, 60_000, true)));
        // Still playing inside the threshold
        assert!(!detector.observe(&status(59_500, 60_000, true)));
        assert!(detector.observe(&status(59_900, 60_000, false)));
        assert!(!detector.observe(&status(60_000, 60_000, false)));
        assert!(!detector.observe(&status(60_000, 60_000, false)));
        assert!(!detector.is_armed());
    }

    #[test]
    fn test_detector_rearms_after_leaving_end() {
        let mut detector = EndOfTrackDetector::new(Duration::from_secs(1));

        assert!(detector.observe(&status(60_000, 60_000, false)));
        // Repeat seeks back to zero
        assert!(!detector.observe(&status(0, 60_000, true)));
        assert!(detector.is_armed());
        assert!(detector.observe(&status(59_999, 60_000, false)));
    }

    #[test]
    fn test_detector_ignores_unknown_duration() {
        let mut detector = EndOfTrackDetector::new(Duration::from_secs(1));

        assert!(!detector.observe(&EngineStatus::default()));
        assert!(!detector.observe(&status(0, 0, false)));
        assert!(detector.is_armed());
    }
}
