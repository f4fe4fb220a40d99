use bridge_traits::error::BridgeError;
use core_library::LibraryError;
use std::fmt;
use thiserror::Error;

/// Failures of a single catalog fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The request never produced a response (DNS, TLS, timeout, offline).
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// The server answered with a non-2xx status.
    #[error("HTTP {status} fetching {url}")]
    Http { status: u16, url: String },

    /// The response body is not a valid catalog document.
    #[error("Invalid catalog document: {0}")]
    Parse(String),
}

/// Step of the first-launch load that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStage {
    Schema,
    CheckFirstLaunch,
    FetchCatalog,
    ApplyCatalog,
    LoadSurahs,
    MarkComplete,
}

impl fmt::Display for InitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            InitStage::Schema => "schema",
            InitStage::CheckFirstLaunch => "check_first_launch",
            InitStage::FetchCatalog => "fetch_catalog",
            InitStage::ApplyCatalog => "apply_catalog",
            InitStage::LoadSurahs => "load_surahs",
            InitStage::MarkComplete => "mark_complete",
        };
        f.write_str(stage)
    }
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Initialization failed at {stage}: {message}")]
    Initialization { stage: InitStage, message: String },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl SyncError {
    pub(crate) fn init(stage: InitStage, error: impl fmt::Display) -> Self {
        SyncError::Initialization {
            stage,
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
