//! Domain models for the recitation catalog
//!
//! Rows map straight onto the SQLite tables through `sqlx::FromRow`; the same
//! `Reciter` shape is what the CDN catalog document carries, so it also
//! derives `Deserialize`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Number of surahs in the Quran.
pub const SURAH_COUNT: u16 = 114;

/// Well-known keys of the `app_metadata` table.
pub mod metadata_keys {
    /// `"true"` once the bundled surah list has been inserted.
    pub const SURAHS_LOADED: &str = "surahs_loaded";
    /// Last CDN base URL advertised by the catalog.
    pub const CDN_BASE_URL: &str = "cdn_base_url";
    pub const APP_NAME: &str = "app_name";
    pub const SUPPORT_EMAIL: &str = "support_email";
    /// Latest app version published by the server.
    pub const APP_VERSION: &str = "app_version";
    /// Oldest app version the server still supports.
    pub const MIN_APP_VERSION: &str = "min_app_version";
    /// Version string of the catalog document last applied.
    pub const DB_VERSION: &str = "db_version";
}

// =============================================================================
// Reciter
// =============================================================================

/// A Quran reciter as published in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Reciter {
    /// Stable identifier, also the CDN path segment for audio and photos
    pub id: String,
    pub name_en: String,
    pub name_ar: String,
    /// Theme colors used by the player UI
    #[serde(default)]
    pub color_primary: String,
    #[serde(default)]
    pub color_secondary: String,
}

impl Reciter {
    pub fn new(
        id: impl Into<String>,
        name_en: impl Into<String>,
        name_ar: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name_en: name_en.into(),
            name_ar: name_ar.into(),
            color_primary: String::new(),
            color_secondary: String::new(),
        }
    }

    pub fn with_colors(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.color_primary = primary.into();
        self.color_secondary = secondary.into();
        self
    }

    /// Validate reciter data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Reciter id cannot be empty".to_string());
        }

        if self.id.contains('/') {
            return Err(format!("Reciter id '{}' cannot contain '/'", self.id));
        }

        if self.name_en.trim().is_empty() && self.name_ar.trim().is_empty() {
            return Err(format!("Reciter '{}' has no name", self.id));
        }

        Ok(())
    }
}

// =============================================================================
// Surah
// =============================================================================

/// One of the 114 chapters of the Quran.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Surah {
    /// Canonical position, 1 to 114
    pub number: u16,
    pub name_ar: String,
    pub name_en: String,
    /// Number of verses (ayat)
    #[serde(default)]
    pub verses: u16,
}

impl Surah {
    /// Validate surah data
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=SURAH_COUNT).contains(&self.number) {
            return Err(format!(
                "Surah number {} is outside 1..={}",
                self.number, SURAH_COUNT
            ));
        }

        if self.name_ar.trim().is_empty() || self.name_en.trim().is_empty() {
            return Err(format!("Surah {} is missing a name", self.number));
        }

        Ok(())
    }
}

// =============================================================================
// Download
// =============================================================================

/// Marker that a recitation has been saved to the device.
///
/// The core only records and queries markers; fetching the audio file is the
/// host's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Download {
    pub reciter_id: String,
    pub surah_number: u16,
    /// Absolute path of the audio file on the device
    pub local_file_path: String,
    /// Unix timestamp (seconds)
    pub downloaded_at: i64,
}

impl Download {
    pub fn new(
        reciter_id: impl Into<String>,
        surah_number: u16,
        local_file_path: impl Into<String>,
        downloaded_at: i64,
    ) -> Self {
        Self {
            reciter_id: reciter_id.into(),
            surah_number,
            local_file_path: local_file_path.into(),
            downloaded_at,
        }
    }

    /// Validate download data
    pub fn validate(&self) -> Result<(), String> {
        if self.reciter_id.trim().is_empty() {
            return Err("Download reciter id cannot be empty".to_string());
        }

        if !(1..=SURAH_COUNT).contains(&self.surah_number) {
            return Err(format!(
                "Surah number {} is outside 1..={}",
                self.surah_number, SURAH_COUNT
            ));
        }

        if self.local_file_path.trim().is_empty() {
            return Err("Download file path cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reciter_validation() {
        assert!(Reciter::new("alafasy", "Mishary Alafasy", "مشاري العفاسي")
            .validate()
            .is_ok());
        assert!(Reciter::new("  ", "Name", "اسم").validate().is_err());
        assert!(Reciter::new("a/b", "Name", "اسم").validate().is_err());
        assert!(Reciter::new("x", "", " ").validate().is_err());
    }

    #[test]
    fn test_reciter_deserializes_without_colors() {
        let reciter: Reciter =
            serde_json::from_str(r#"{"id":"husary","name_en":"Al-Husary","name_ar":"الحصري"}"#)
                .unwrap();
        assert_eq!(reciter.color_primary, "");
        assert_eq!(reciter.id, "husary");
    }

    #[test]
    fn test_surah_bounds() {
        let mut surah = Surah {
            number: 114,
            name_ar: "الناس".to_string(),
            name_en: "An-Nas".to_string(),
            verses: 6,
        };
        assert!(surah.validate().is_ok());

        surah.number = 0;
        assert!(surah.validate().is_err());
        surah.number = 115;
        assert!(surah.validate().is_err());
    }

    #[test]
    fn test_download_validation() {
        assert!(Download::new("alafasy", 1, "/data/001.mp3", 0)
            .validate()
            .is_ok());
        assert!(Download::new("alafasy", 0, "/data/000.mp3", 0)
            .validate()
            .is_err());
        assert!(Download::new("alafasy", 2, "", 0).validate().is_err());
    }
}
