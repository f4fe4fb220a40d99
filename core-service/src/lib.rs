//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (HTTP, settings, audio engine,
//! clock) into the shared Rust core and exposes the handful of operations a
//! host UI needs: launch, catalog browsing, download markers and playback.
//!
//! Desktop hosts typically enable the `desktop-shims` feature (on by default),
//! which lets [`CoreConfig`] fall back to the reqwest HTTP client and the SQLite
//! settings store from `bridge-desktop`. Mobile hosts inject their own.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn example(engine: Arc<dyn bridge_traits::AudioEngine>) -> core_service::Result<()> {
//! use core_service::{CoreConfig, CoreService};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/qariee.db")
//!     .app_version("1.4.0")
//!     .audio_engine(engine)
//!     .build()?;
//!
//! let core = CoreService::bootstrap(config).await?;
//! let launch = core.start().await;
//! if launch.is_first_launch {
//!     // show onboarding
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_library::divisions::QuranDivision;
pub use core_library::{Download, Reciter, Surah};
pub use core_playback::{AdvanceOutcome, Locale, PlaybackQueueManager, Track};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventStream};
pub use core_sync::{LaunchOutcome, RefreshOutcome, SyncState, VersionCheck};

use bridge_traits::Clock;
use core_library::db::{create_pool, DatabaseConfig};
use core_library::divisions::{QURAN_DIVISIONS, STANDALONE_SURAHS};
use core_library::repositories::{
    DownloadRepository, ReciterRepository, SqliteDownloadRepository, SqliteReciterRepository,
    SqliteSurahRepository, SurahRepository,
};
use core_playback::{AutoAdvanceMonitor, TrackResolver};
use core_runtime::config::{CdnConfigHandle, PlaybackConfig};
use core_runtime::events::EventBus;
use core_runtime::logging::strip_path;
use core_sync::{CatalogClient, SyncOrchestrator};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Surahs grouped the way the reciter screen lists them.
#[derive(Debug, Clone, Serialize)]
pub struct SurahIndex {
    /// Listed above every division (Al-Fatihah)
    pub standalone: Vec<Surah>,
    pub divisions: Vec<DivisionSurahs>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DivisionSurahs {
    pub division: QuranDivision,
    pub surahs: Vec<Surah>,
}

/// Primary façade exposed to host applications.
///
/// Cheap to clone; every clone shares the same store, queue and event bus.
#[derive(Clone)]
pub struct CoreService {
    orchestrator: Arc<SyncOrchestrator>,
    reciters: Arc<dyn ReciterRepository>,
    surahs: Arc<dyn SurahRepository>,
    downloads: Arc<dyn DownloadRepository>,
    resolver: TrackResolver,
    queue: Arc<PlaybackQueueManager>,
    cdn: CdnConfigHandle,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    playback: PlaybackConfig,
    auto_advance: Arc<Mutex<Option<AutoAdvanceMonitor>>>,
}

impl CoreService {
    /// Open the catalog database and wire every component.
    ///
    /// No network traffic happens here; call [`start`](Self::start) for the
    /// launch sequence.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Config`] when the default CDN URL is invalid
    /// - [`CoreError::Library`] when the database cannot be opened
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        info!(
            database = %config.database_path.display(),
            app_version = %config.app_version,
            "Bootstrapping core"
        );

        let cdn = CdnConfigHandle::new(config.default_cdn()?);
        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        let event_bus = EventBus::new(config.event_buffer_size);

        let catalog = CatalogClient::new(
            Arc::clone(&config.http_client),
            cdn.clone(),
            Arc::clone(&config.clock),
        );
        let orchestrator = SyncOrchestrator::new(
            pool.clone(),
            catalog,
            Arc::clone(&config.settings_store),
            event_bus.clone(),
            config.app_version.clone(),
        );
        let queue = PlaybackQueueManager::new(
            Arc::clone(&config.audio_engine),
            event_bus.clone(),
            config.playback.initial_mode,
        );

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            reciters: Arc::new(SqliteReciterRepository::new(pool.clone())),
            surahs: Arc::new(SqliteSurahRepository::new(pool.clone())),
            downloads: Arc::new(SqliteDownloadRepository::new(pool.clone())),
            resolver: TrackResolver::new(pool, cdn.clone()),
            queue: Arc::new(queue),
            cdn,
            event_bus,
            clock: config.clock,
            playback: config.playback,
            auto_advance: Arc::new(Mutex::new(None)),
        })
    }

    /// Run the launch sequence.
    ///
    /// Never fails: when initialization errors, the host is told this is a
    /// first launch without a pending update, and the next start retries.
    pub async fn start(&self) -> LaunchOutcome {
        match self.orchestrator.initialize().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Initialization failed, continuing with defaults");
                LaunchOutcome {
                    is_first_launch: true,
                    needs_update: false,
                }
            }
        }
    }

    pub fn sync_state(&self) -> SyncState {
        self.orchestrator.state()
    }

    /// Wait for the background refresh started by [`start`](Self::start), if any.
    pub async fn wait_for_background_refresh(&self) -> Option<RefreshOutcome> {
        let handle = self.orchestrator.take_background_refresh()?;
        match handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Background refresh task ended abnormally");
                None
            }
        }
    }

    /// Fetch the catalog and replace the reciters now. Returns the reciter count.
    pub async fn refresh_now(&self) -> Result<u64> {
        Ok(self.orchestrator.refresh_now().await?)
    }

    pub async fn check_version(&self) -> Result<VersionCheck> {
        Ok(self.orchestrator.check_version().await?)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub async fn reciters(&self) -> Result<Vec<Reciter>> {
        Ok(self.reciters.find_all().await?)
    }

    pub async fn reciter(&self, reciter_id: &str) -> Result<Option<Reciter>> {
        Ok(self.reciters.find_by_id(reciter_id).await?)
    }

    pub async fn surahs(&self) -> Result<Vec<Surah>> {
        Ok(self.surahs.find_all().await?)
    }

    /// Photo URL on the CDN currently in effect.
    pub fn reciter_photo_url(&self, reciter_id: &str) -> String {
        self.cdn.current().reciter_photo_url(reciter_id)
    }

    /// Stored surahs grouped into the standalone list and the four divisions.
    pub async fn surah_divisions(&self) -> Result<SurahIndex> {
        let surahs = self.surahs.find_all().await?;
        let pick = |numbers: &[u16]| -> Vec<Surah> {
            numbers
                .iter()
                .filter_map(|n| surahs.iter().find(|s| s.number == *n).cloned())
                .collect()
        };

        Ok(SurahIndex {
            standalone: pick(STANDALONE_SURAHS),
            divisions: QURAN_DIVISIONS
                .iter()
                .map(|division| DivisionSurahs {
                    division: *division,
                    surahs: pick(division.surah_numbers),
                })
                .collect(),
        })
    }

    // ------------------------------------------------------------------
    // Downloads
    // ------------------------------------------------------------------

    /// Record that the host saved a recitation to `local_file_path`.
    #[instrument(skip(self, local_file_path))]
    pub async fn record_download(
        &self,
        reciter_id: &str,
        surah_number: u16,
        local_file_path: &str,
    ) -> Result<Download> {
        let download = Download::new(
            reciter_id,
            surah_number,
            local_file_path,
            self.clock.unix_timestamp(),
        );
        self.downloads.upsert(&download).await?;

        info!(file = %strip_path(local_file_path), "Recorded download");
        Ok(download)
    }

    /// Forget a download marker. Returns whether one existed.
    pub async fn remove_download(&self, reciter_id: &str, surah_number: u16) -> Result<bool> {
        Ok(self.downloads.delete(reciter_id, surah_number).await?)
    }

    /// Every download marker, newest first.
    pub async fn downloads(&self) -> Result<Vec<Download>> {
        Ok(self.downloads.find_all().await?)
    }

    pub async fn downloads_for(&self, reciter_id: &str) -> Result<Vec<Download>> {
        Ok(self.downloads.find_by_reciter(reciter_id).await?)
    }

    // ------------------------------------------------------------------
    // Playback
    // ------------------------------------------------------------------

    /// Play one surah, queueing every later surah by the same reciter.
    #[instrument(skip(self))]
    pub async fn play_surah(
        &self,
        reciter_id: &str,
        surah_number: u16,
        locale: Locale,
    ) -> Result<Track> {
        let (first, queue) = self
            .resolver
            .surah_queue(reciter_id, surah_number, locale)
            .await?;
        self.queue.play(first.clone(), queue).await?;
        Ok(first)
    }

    /// Play every surah by the reciter in random order.
    ///
    /// # Errors
    ///
    /// [`CoreError::NothingToPlay`] when no surahs are stored yet.
    #[instrument(skip(self))]
    pub async fn play_reciter_shuffled(&self, reciter_id: &str, locale: Locale) -> Result<Track> {
        let (first, queue) = self
            .resolver
            .shuffled_queue(reciter_id, locale)
            .await?
            .ok_or_else(|| CoreError::NothingToPlay(reciter_id.to_string()))?;
        self.queue.play(first.clone(), queue).await?;
        Ok(first)
    }

    pub fn queue(&self) -> &Arc<PlaybackQueueManager> {
        &self.queue
    }

    /// Subscribe to sync and playback events.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    /// Start advancing through the queue when a track finishes. Calling it
    /// while the monitor runs does nothing.
    pub fn start_auto_advance(&self) {
        let mut slot = self.auto_advance.lock();
        if slot.as_ref().is_some_and(|m| m.is_running()) {
            return;
        }
        *slot = Some(AutoAdvanceMonitor::spawn(
            Arc::clone(&self.queue),
            &self.playback,
        ));
    }

    pub async fn stop_auto_advance(&self) {
        let monitor = self.auto_advance.lock().take();
        if let Some(monitor) = monitor {
            monitor.shutdown().await;
        }
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.auto_advance
            .lock()
            .as_ref()
            .is_some_and(|m| m.is_running())
    }
}
