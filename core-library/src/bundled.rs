//! Surah reference data compiled into the binary.
//!
//! The list never changes, so it ships with the app instead of the CDN
//! catalog and is copied into the `surahs` table once.

use crate::error::{LibraryError, Result};
use crate::models::{Surah, SURAH_COUNT};

const SURAHS_JSON: &str = include_str!("../data/surahs.json");

/// Parses and validates the bundled surah list.
///
/// # Errors
///
/// Returns [`LibraryError::BundledData`] if the embedded document is malformed,
/// does not hold exactly 114 entries, or is not numbered 1..=114 in order.
pub fn surahs() -> Result<Vec<Surah>> {
    let surahs: Vec<Surah> = serde_json::from_str(SURAHS_JSON)
        .map_err(|e| LibraryError::BundledData(format!("Invalid surahs.json: {}", e)))?;

    if surahs.len() != usize::from(SURAH_COUNT) {
        return Err(LibraryError::BundledData(format!(
            "Expected {} surahs, found {}",
            SURAH_COUNT,
            surahs.len()
        )));
    }

    for (index, surah) in surahs.iter().enumerate() {
        surah.validate().map_err(LibraryError::BundledData)?;

        if usize::from(surah.number) != index + 1 {
            return Err(LibraryError::BundledData(format!(
                "Surah at position {} is numbered {}",
                index + 1,
                surah.number
            )));
        }
    }

    Ok(surahs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_surahs_are_complete() {
        let surahs = surahs().unwrap();

        assert_eq!(surahs.len(), 114);
        assert_eq!(surahs[0].name_en, "Al-Fatihah");
        assert_eq!(surahs[0].verses, 7);
        assert_eq!(surahs[1].verses, 286);
        assert_eq!(surahs[113].name_en, "An-Nas");

        let total_verses: u32 = surahs.iter().map(|s| u32::from(s.verses)).sum();
        assert_eq!(total_verses, 6236);
    }
}
