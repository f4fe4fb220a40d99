//! # Sync Orchestrator
//!
//! Decides, on every app start, how the local store is brought in line with
//! the CDN catalog.
//!
//! ## Workflow
//!
//! ### First Launch
//! 1. Initialize the schema
//! 2. Fetch the catalog (failure aborts the launch)
//! 3. Replace reciters, persist the catalog settings, update the CDN config
//! 4. Load the bundled surahs (at most once)
//! 5. Mark the first launch complete in the settings store
//!
//! ### Subsequent Launch
//! 1. Initialize the schema (no-op when current)
//! 2. Spawn a detached background refresh
//! 3. Check the published app version
//!
//! The background refresh replaces reciters only when the published id set
//! differs from the cached one. Its failures are logged and emitted as
//! events; they never reach the caller of `initialize`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = SyncOrchestrator::new(pool, catalog, settings, event_bus, "1.2.0");
//! let outcome = orchestrator.initialize().await?;
//! if outcome.is_first_launch {
//!     // show onboarding
//! }
//! ```

use crate::catalog::{Catalog, CatalogClient};
use crate::error::{InitStage, Result, SyncError};
use crate::version::VersionCheck;
use bridge_traits::SettingsStore;
use core_library::db::initialize_schema;
use core_library::repositories::{
    MetadataRepository, ReciterRepository, SqliteMetadataRepository, SqliteReciterRepository,
    SqliteSurahRepository, SurahRepository,
};
use core_library::{bundled, metadata_keys};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use core_runtime::logging::redact_if_sensitive;
use core_runtime::CdnConfig;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Settings-store key whose presence marks a completed first launch.
pub const FIRST_LAUNCH_KEY: &str = "first_launch_complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    Uninitialized,
    CheckingFirstLaunch,
    FirstLaunchLoad,
    BackgroundRefresh,
    Ready,
}

/// What `initialize` reports to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchOutcome {
    pub is_first_launch: bool,
    /// A newer app version is published. Advisory only.
    pub needs_update: bool,
}

/// Result of one background refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Replaced { count: u64 },
    Unchanged,
    Failed { message: String },
}

pub struct SyncOrchestrator {
    pool: SqlitePool,
    catalog: CatalogClient,
    settings: Arc<dyn SettingsStore>,
    reciters: Arc<dyn ReciterRepository>,
    surahs: Arc<dyn SurahRepository>,
    metadata: Arc<dyn MetadataRepository>,
    event_bus: EventBus,
    app_version: String,
    state: Arc<RwLock<SyncState>>,
    background: Arc<Mutex<Option<JoinHandle<RefreshOutcome>>>>,
    /// Serializes bundled-surah loading
    surah_load: Arc<tokio::sync::Mutex<()>>,
}

impl SyncOrchestrator {
    /// Create an orchestrator over `pool`.
    ///
    /// The catalog client's CDN handle is the one updated when a catalog is
    /// applied.
    pub fn new(
        pool: SqlitePool,
        catalog: CatalogClient,
        settings: Arc<dyn SettingsStore>,
        event_bus: EventBus,
        app_version: impl Into<String>,
    ) -> Self {
        let reciters =
            Arc::new(SqliteReciterRepository::new(pool.clone())) as Arc<dyn ReciterRepository>;
        let surahs = Arc::new(SqliteSurahRepository::new(pool.clone())) as Arc<dyn SurahRepository>;
        let metadata =
            Arc::new(SqliteMetadataRepository::new(pool.clone())) as Arc<dyn MetadataRepository>;

        Self {
            pool,
            catalog,
            settings,
            reciters,
            surahs,
            metadata,
            event_bus,
            app_version: app_version.into(),
            state: Arc::new(RwLock::new(SyncState::Uninitialized)),
            background: Arc::new(Mutex::new(None)),
            surah_load: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    fn set_state(&self, state: SyncState) {
        debug!(?state, "Sync state changed");
        *self.state.write() = state;
    }

    /// Clone for background task
    fn clone_for_task(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            catalog: self.catalog.clone(),
            settings: Arc::clone(&self.settings),
            reciters: Arc::clone(&self.reciters),
            surahs: Arc::clone(&self.surahs),
            metadata: Arc::clone(&self.metadata),
            event_bus: self.event_bus.clone(),
            app_version: self.app_version.clone(),
            state: Arc::clone(&self.state),
            background: Arc::clone(&self.background),
            surah_load: Arc::clone(&self.surah_load),
        }
    }

    /// Run the launch sequence.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Initialization`] when the schema cannot be set up,
    /// the settings store cannot be read, or any first-launch step fails.
    /// Subsequent launches never fail because of the network.
    #[instrument(skip(self), fields(app_version = %self.app_version))]
    pub async fn initialize(&self) -> Result<LaunchOutcome> {
        self.set_state(SyncState::CheckingFirstLaunch);

        let result = self.run_launch().await;
        match &result {
            Ok(_) => self.set_state(SyncState::Ready),
            Err(e) => {
                warn!(error = %e, "Launch sequence failed");
                self.set_state(SyncState::Uninitialized);
            }
        }
        result
    }

    async fn run_launch(&self) -> Result<LaunchOutcome> {
        let applied = initialize_schema(&self.pool)
            .await
            .map_err(|e| SyncError::init(InitStage::Schema, e))?;
        if !applied.is_empty() {
            info!(migrations = ?applied, "Applied schema migrations");
        }

        self.restore_cdn_base_url().await;

        let is_first_launch = !self
            .settings
            .has_key(FIRST_LAUNCH_KEY)
            .await
            .map_err(|e| SyncError::init(InitStage::CheckFirstLaunch, e))?;

        if is_first_launch {
            self.first_launch().await?;
            return Ok(LaunchOutcome {
                is_first_launch: true,
                needs_update: false,
            });
        }

        info!("Using cached catalog, refreshing in background");
        self.set_state(SyncState::BackgroundRefresh);
        self.spawn_background_refresh();

        let needs_update = self.check_for_update().await;

        Ok(LaunchOutcome {
            is_first_launch: false,
            needs_update,
        })
    }

    /// Point the CDN handle at the last base URL the catalog advertised.
    async fn restore_cdn_base_url(&self) {
        let cached = match self.metadata.get(metadata_keys::CDN_BASE_URL).await {
            Ok(Some(url)) if !url.trim().is_empty() => url,
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, "Failed to read cached CDN base URL");
                return;
            }
        };

        if let Err(e) = self.catalog.cdn().set_base_url(&cached) {
            warn!(error = %e, "Ignoring invalid cached CDN base URL");
        }
    }

    #[instrument(skip(self))]
    async fn first_launch(&self) -> Result<()> {
        info!("First launch: loading initial data");
        self.set_state(SyncState::FirstLaunchLoad);
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::FirstLaunchStarted))
            .ok();

        let catalog = self
            .catalog
            .fetch_catalog()
            .await
            .map_err(|e| SyncError::init(InitStage::FetchCatalog, e))?;

        let reciter_count = self
            .apply_catalog(&catalog)
            .await
            .map_err(|e| SyncError::init(InitStage::ApplyCatalog, e))?;

        self.ensure_surahs_loaded()
            .await
            .map_err(|e| SyncError::init(InitStage::LoadSurahs, e))?;
        let surah_count = self
            .surahs
            .count()
            .await
            .map_err(|e| SyncError::init(InitStage::LoadSurahs, e))?;

        self.settings
            .set_string(FIRST_LAUNCH_KEY, "true")
            .await
            .map_err(|e| SyncError::init(InitStage::MarkComplete, e))?;

        info!(reciter_count, surah_count, "Initial data loaded");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::FirstLaunchCompleted {
                reciter_count,
                surah_count: surah_count as u64,
            }))
            .ok();

        Ok(())
    }

    /// Store `catalog`: replace reciters, persist settings and version, and
    /// point the CDN handle at the advertised base URL.
    ///
    /// An advertised base URL that does not parse is neither stored nor used.
    async fn apply_catalog(&self, catalog: &Catalog) -> Result<u64> {
        let count = self.reciters.replace_all(&catalog.reciters).await?;

        let settings = &catalog.settings;
        let cdn = advertised_cdn(catalog);
        let mut entries = vec![
            (metadata_keys::APP_NAME, settings.app_name.as_str()),
            (metadata_keys::SUPPORT_EMAIL, settings.support_email.as_str()),
            (metadata_keys::APP_VERSION, settings.app_version.as_str()),
            (metadata_keys::MIN_APP_VERSION, settings.min_app_version.as_str()),
            (metadata_keys::DB_VERSION, catalog.version.as_str()),
        ];
        if let Some(cdn) = &cdn {
            entries.push((metadata_keys::CDN_BASE_URL, cdn.base_url()));
        }
        self.metadata.set_many(&entries).await?;

        if let Some(cdn) = cdn {
            self.switch_cdn(cdn);
        }

        info!(
            count,
            version = %catalog.version,
            support_email = %redact_if_sensitive("support_email", &settings.support_email),
            "Applied catalog"
        );
        Ok(count)
    }

    fn switch_cdn(&self, cdn: CdnConfig) {
        let handle = self.catalog.cdn();
        if *handle.current() == cdn {
            return;
        }
        info!(base_url = cdn.base_url(), "CDN base URL updated");
        handle.update(cdn);
    }

    /// Insert the bundled surahs unless they were loaded before.
    ///
    /// Returns `true` when an insertion pass ran.
    #[instrument(skip(self))]
    pub async fn ensure_surahs_loaded(&self) -> Result<bool> {
        let _guard = self.surah_load.lock().await;

        if self.metadata.get_bool(metadata_keys::SURAHS_LOADED).await? {
            debug!("Surahs already loaded");
            return Ok(false);
        }

        let surahs = bundled::surahs()?;
        let inserted = self.surahs.insert_many(&surahs).await?;
        self.metadata.set(metadata_keys::SURAHS_LOADED, "true").await?;

        info!(inserted, "Loaded bundled surahs");
        Ok(true)
    }

    fn spawn_background_refresh(&self) {
        let task = self.clone_for_task();
        let handle = tokio::spawn(async move { task.background_refresh().await });
        *self.background.lock() = Some(handle);
    }

    /// Take the handle of the last background refresh, if one was spawned and
    /// not taken yet.
    pub fn take_background_refresh(&self) -> Option<JoinHandle<RefreshOutcome>> {
        self.background.lock().take()
    }

    #[instrument(skip(self))]
    async fn background_refresh(&self) -> RefreshOutcome {
        match self.refresh_if_changed().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Background refresh failed");
                let message = e.to_string();
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::RefreshFailed {
                        message: message.clone(),
                    }))
                    .ok();
                RefreshOutcome::Failed { message }
            }
        }
    }

    async fn refresh_if_changed(&self) -> Result<RefreshOutcome> {
        let catalog = self.catalog.fetch_catalog().await?;
        let current = self.reciters.ids().await?;

        if !catalog.differs_from(&current) {
            info!(count = current.len(), "Catalog unchanged");
            if let Some(cdn) = advertised_cdn(&catalog) {
                self.switch_cdn(cdn);
            }
            self.event_bus
                .emit(CoreEvent::Sync(SyncEvent::RefreshSkipped {
                    reciter_count: current.len() as u64,
                }))
                .ok();
            return Ok(RefreshOutcome::Unchanged);
        }

        info!("New reciters detected, updating");
        let count = self.apply_catalog(&catalog).await?;
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::CatalogRefreshed {
                reciter_count: count,
                db_version: catalog.version.clone(),
            }))
            .ok();

        Ok(RefreshOutcome::Replaced { count })
    }

    /// Fetch the catalog and replace the reciters unconditionally.
    ///
    /// # Errors
    ///
    /// Fetch and store errors are returned to the caller.
    #[instrument(skip(self))]
    pub async fn refresh_now(&self) -> Result<u64> {
        let catalog = self.catalog.fetch_catalog().await?;
        let count = self.apply_catalog(&catalog).await?;

        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::CatalogRefreshed {
                reciter_count: count,
                db_version: catalog.version.clone(),
            }))
            .ok();

        Ok(count)
    }

    /// Compare the running version against the published one.
    pub async fn check_version(&self) -> Result<VersionCheck> {
        let catalog = self.catalog.fetch_catalog().await?;
        Ok(VersionCheck::evaluate(&self.app_version, &catalog.settings))
    }

    /// Version check used at launch: failures mean "no update".
    async fn check_for_update(&self) -> bool {
        let check = match self.check_version().await {
            Ok(check) => check,
            Err(e) => {
                debug!(error = %e, "Version check skipped");
                return false;
            }
        };

        if check.needs_update {
            info!(
                current = %check.current,
                latest = %check.latest,
                is_mandatory = check.is_mandatory,
                "App update available"
            );
            self.event_bus
                .emit(CoreEvent::Sync(SyncEvent::UpdateAvailable {
                    current_version: check.current.to_string(),
                    latest_version: check.latest.to_string(),
                    min_version: check.minimum.to_string(),
                    is_mandatory: check.is_mandatory,
                }))
                .ok();
        }

        check.needs_update
    }
}

/// The CDN the catalog points at. `None` when it names none or an invalid one.
fn advertised_cdn(catalog: &Catalog) -> Option<CdnConfig> {
    let base_url = catalog.settings.cdn_base_url.trim();
    if base_url.is_empty() {
        return None;
    }

    match CdnConfig::new(base_url) {
        Ok(cdn) => Some(cdn),
        Err(e) => {
            warn!(error = %e, "Catalog advertised an invalid CDN base URL");
            None
        }
    }
}
