//! App version comparison.
//!
//! Versions are dot-separated `major.minor.patch`. Missing or non-numeric
//! components count as zero, so `"1.0"` equals `"1.0.0"`.

use crate::catalog::CatalogSettings;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AppVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl AppVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse leniently; never fails.
    pub fn parse(version: &str) -> Self {
        let mut parts = version
            .trim()
            .split('.')
            .map(|part| part.trim().parse::<u64>().unwrap_or(0));

        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
        }
    }
}

impl fmt::Display for AppVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

pub fn compare_versions(a: &str, b: &str) -> Ordering {
    AppVersion::parse(a).cmp(&AppVersion::parse(b))
}

/// Result of comparing the running app against the server's settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionCheck {
    pub current: AppVersion,
    pub latest: AppVersion,
    pub minimum: AppVersion,
    /// A newer version is published
    pub needs_update: bool,
    /// The running version is below the supported minimum
    pub is_mandatory: bool,
}

impl VersionCheck {
    pub fn evaluate(running: &str, settings: &CatalogSettings) -> Self {
        let current = AppVersion::parse(running);
        let latest = AppVersion::parse(&settings.app_version);
        let minimum = AppVersion::parse(&settings.min_app_version);

        Self {
            current,
            latest,
            minimum,
            needs_update: current < latest,
            is_mandatory: current < minimum,
        }
    }
}
