//! # Core Configuration Module
//!
//! Provides configuration management for the Qariee core.
//!
//! ## Overview
//!
//! The configuration system uses a builder to construct a [`CoreConfig`]
//! holding every bridge and setting the core needs. Validation is fail-fast:
//! missing capabilities are reported at build time with an actionable message
//! rather than surfacing later as a runtime failure.
//!
//! ## Required Dependencies
//!
//! - `AudioEngine` - host audio player
//!
//! ## Dependencies with desktop defaults (`desktop-shims` feature)
//!
//! - `HttpClient` - reqwest-based client
//! - `SettingsStore` - SQLite key-value store next to the catalog database
//!
//! ## CDN configuration
//!
//! The CDN base URL is not a static setting: the catalog itself can move it.
//! [`CdnConfigHandle`] holds the current [`CdnConfig`] snapshot and swaps it
//! as a whole, so readers always see either the previous or the new value.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/qariee/qariee.db")
//!     .app_version("1.4.0")
//!     .audio_engine(Arc::new(MyAudioEngine))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AudioEngine, Clock, HttpClient, SettingsStore, SystemClock};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Production CDN used until the catalog (or the cache) says otherwise.
pub const DEFAULT_CDN_BASE_URL: &str = "https://pub-ab70d7236e61414aabfd72718fa65d27.r2.dev";

/// Default interval between engine status polls for auto-advance.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Remaining time under which a stopped track counts as finished.
pub const DEFAULT_END_THRESHOLD: Duration = Duration::from_secs(1);

// ============================================================================
// CDN
// ============================================================================

/// Immutable snapshot of the CDN location with URL builders for every
/// remote resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnConfig {
    base: Url,
}

impl CdnConfig {
    /// Parses and normalises a base URL (trailing slashes dropped).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] unless the URL is an absolute `http(s)` URL
    /// with a host and without a query or fragment.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let raw = base_url.as_ref().trim().trim_end_matches('/');
        let invalid =
            |reason: &str| Error::Config(format!("Invalid CDN base URL '{}': {}", raw, reason));

        let base = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if base.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }
        if base.query().is_some() {
            return Err(invalid("query strings are not allowed"));
        }
        if base.fragment().is_some() {
            return Err(invalid("fragments are not allowed"));
        }

        if base.cannot_be_a_base() {
            return Err(invalid("cannot be a base URL"));
        }

        Ok(Self { base })
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn resource(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Never fails: `new` rejects URLs that cannot be a base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Catalog document URL. `cache_buster` is typically the current Unix
    /// time in milliseconds so intermediaries never serve a stale copy.
    pub fn catalog_url(&self, cache_buster: i64) -> String {
        let mut url = self.resource(&["metadata", "db.json"]);
        url.query_pairs_mut()
            .append_pair("t", &cache_buster.to_string());
        url.into()
    }

    /// Recitation audio, e.g. `/audio/alafasy/001.mp3`. The reciter id is
    /// percent-encoded as a single path segment.
    pub fn audio_url(&self, reciter_id: &str, surah_number: u16) -> String {
        let file = format!("{:03}.mp3", surah_number);
        self.resource(&["audio", reciter_id, &file]).into()
    }

    pub fn reciter_photo_url(&self, reciter_id: &str) -> String {
        let file = format!("{}.jpg", reciter_id);
        self.resource(&["images", "reciters", &file]).into()
    }
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CDN_BASE_URL).expect("default CDN base URL is valid")
    }
}

/// Shared holder of the current [`CdnConfig`].
///
/// Clones share the same slot. Writers replace the whole snapshot; readers
/// take an `Arc` and keep using it even if a swap happens meanwhile.
#[derive(Clone, Default)]
pub struct CdnConfigHandle {
    inner: Arc<RwLock<Arc<CdnConfig>>>,
}

impl CdnConfigHandle {
    pub fn new(config: CdnConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Returns the current snapshot.
    pub fn current(&self) -> Arc<CdnConfig> {
        Arc::clone(&self.inner.read())
    }

    /// Swaps in a new snapshot.
    pub fn update(&self, config: CdnConfig) {
        *self.inner.write() = Arc::new(config);
    }

    /// Validates `base_url` and swaps it in. Returns `true` when the value changed.
    pub fn set_base_url(&self, base_url: &str) -> Result<bool> {
        let next = CdnConfig::new(base_url)?;
        let mut slot = self.inner.write();
        if slot.base == next.base {
            return Ok(false);
        }
        *slot = Arc::new(next);
        Ok(true)
    }
}

impl fmt::Debug for CdnConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdnConfigHandle")
            .field("base_url", &self.current().base_url())
            .finish()
    }
}

// ============================================================================
// Playback
// ============================================================================

/// How the queue proceeds when a track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Play the queue in a random permutation.
    #[default]
    Shuffle,
    /// Restart the current track.
    Repeat,
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackMode::Shuffle => f.write_str("shuffle"),
            PlaybackMode::Repeat => f.write_str("repeat"),
        }
    }
}

/// Playback queue and auto-advance settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// How often the engine is polled for position/duration.
    pub poll_interval: Duration,
    /// Remaining time under which a stopped track is considered finished.
    pub end_threshold: Duration,
    pub initial_mode: PlaybackMode,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            end_threshold: DEFAULT_END_THRESHOLD,
            initial_mode: PlaybackMode::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Playback poll interval must be greater than zero".to_string(),
            ));
        }

        if self.end_threshold.is_zero() {
            return Err(Error::Config(
                "End-of-track threshold must be greater than zero".to_string(),
            ));
        }

        if self.end_threshold > Duration::from_secs(30) {
            return Err(Error::Config(
                "End-of-track threshold exceeds maximum of 30 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Core configuration
// ============================================================================

/// Core configuration for the Qariee core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite catalog database
    pub database_path: PathBuf,

    /// Version of the running app, compared against the catalog
    pub app_version: String,

    /// CDN used before any catalog or cached value is known
    pub default_cdn_base_url: String,

    pub http_client: Arc<dyn HttpClient>,

    /// Holds the first-launch flag
    pub settings_store: Arc<dyn SettingsStore>,

    pub audio_engine: Arc<dyn AudioEngine>,

    pub clock: Arc<dyn Clock>,

    pub event_buffer_size: usize,

    pub playback: PlaybackConfig,
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("app_version", &self.app_version)
            .field("default_cdn_base_url", &self.default_cdn_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("audio_engine", &"AudioEngine { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("playback", &self.playback)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// The CDN snapshot implied by `default_cdn_base_url`.
    pub fn default_cdn(&self) -> Result<CdnConfig> {
        CdnConfig::new(&self.default_cdn_base_url)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        validate_app_version(&self.app_version)?;
        self.default_cdn()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.playback.validate()
    }
}

/// Accepts dotted numeric versions such as `1`, `1.2` or `1.2.3`.
fn validate_app_version(version: &str) -> Result<()> {
    let trimmed = version.trim();
    if trimmed.is_empty() {
        return Err(Error::Config("App version cannot be empty".to_string()));
    }

    let valid = trimmed
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));

    if !valid {
        return Err(Error::Config(format!(
            "App version '{}' must be dot-separated numbers (e.g. 1.2.3)",
            trimmed
        )));
    }

    Ok(())
}

fn audio_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioEngine".to_string(),
        message: "An AudioEngine implementation is required for playback. \
                 Inject the host's native player (AVPlayer/ExoPlayer or a desktop sink)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to fetch the catalog. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile: inject a platform-native adapter (URLSession/OkHttp)."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required to remember the first launch. \
                 Desktop: enable the 'desktop-shims' feature to use the default SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let candidate = database_path
        .parent()
        .map(|parent| parent.join("settings.db"))
        .unwrap_or_else(|| PathBuf::from("settings.db"));

    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // block_on panics inside a runtime, so hop to a plain thread there.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(candidate))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(candidate)?,
    };

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    app_version: Option<String>,
    default_cdn_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    audio_engine: Option<Arc<dyn AudioEngine>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    playback: Option<PlaybackConfig>,
}

impl CoreConfigBuilder {
    /// Sets the catalog database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/data/qariee.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the version of the running app (e.g. `"1.4.0"`).
    pub fn app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Overrides the CDN used before the catalog has been fetched.
    ///
    /// Default: [`DEFAULT_CDN_BASE_URL`]
    pub fn default_cdn_base_url(mut self, url: impl Into<String>) -> Self {
        self.default_cdn_base_url = Some(url.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the settings store implementation.
    ///
    /// If not provided, a SQLite store named `settings.db` next to the
    /// catalog database is used when the `desktop-shims` feature is enabled.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Sets the host audio engine (required).
    pub fn audio_engine(mut self, engine: Arc<dyn AudioEngine>) -> Self {
        self.audio_engine = Some(engine);
        self
    }

    /// Overrides the time source. Default: [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = Some(playback);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a required value is missing or invalid
    /// - [`Error::CapabilityMissing`] when a bridge has no implementation
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let app_version = self.app_version.ok_or_else(|| {
            Error::Config("App version is required. Use .app_version() to set it.".to_string())
        })?;

        let audio_engine = self.audio_engine.ok_or_else(audio_engine_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&database_path)?,
        };

        let config = CoreConfig {
            database_path,
            app_version: app_version.trim().to_string(),
            default_cdn_base_url: self
                .default_cdn_base_url
                .unwrap_or_else(|| DEFAULT_CDN_BASE_URL.to_string()),
            http_client,
            settings_store,
            audio_engine,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            playback: self.playback.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
