//! Traditional grouping of the surahs used by the reciter screen.
//!
//! Al-Fatihah stands alone. Al-Anfal (8) and At-Tawbah (9) belong to no
//! division. Every other surah belongs to exactly one of the four classical
//! divisions: the seven long, the hundreds, the oft-repeated and the detailed.

use serde::Serialize;

/// A named block of consecutive-in-reading surahs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuranDivision {
    pub id: &'static str,
    /// Localization key for the division title
    pub name_key: &'static str,
    pub surah_numbers: &'static [u16],
    /// Whether the host should render the division expanded initially
    pub default_expanded: bool,
}

/// Surahs listed on their own above the divisions.
pub const STANDALONE_SURAHS: &[u16] = &[1];

const SEVEN_LONG: &[u16] = &[2, 3, 4, 5, 6, 7, 10];
const HUNDREDS: &[u16] = &[11, 12, 13, 14, 15, 16, 17, 18];
const OFT_REPEATED: &[u16] = &[
    19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, 41,
    42, 43, 44, 45, 46, 47, 48, 49,
];
const DETAILED: &[u16] = &[
    50, 51, 52, 53, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71, 72,
    73, 74, 75, 76, 77, 78, 79, 80, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90, 91, 92, 93, 94, 95,
    96, 97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111, 112, 113, 114,
];

pub const QURAN_DIVISIONS: &[QuranDivision] = &[
    QuranDivision {
        id: "seven_long",
        name_key: "seven_long",
        surah_numbers: SEVEN_LONG,
        default_expanded: true,
    },
    QuranDivision {
        id: "hundreds",
        name_key: "hundreds",
        surah_numbers: HUNDREDS,
        default_expanded: false,
    },
    QuranDivision {
        id: "oft_repeated",
        name_key: "oft_repeated",
        surah_numbers: OFT_REPEATED,
        default_expanded: false,
    },
    QuranDivision {
        id: "detailed",
        name_key: "detailed",
        surah_numbers: DETAILED,
        default_expanded: false,
    },
];

/// Returns the division containing `surah_number`, or `None` for standalone
/// and out-of-range surahs.
pub fn division_for_surah(surah_number: u16) -> Option<&'static QuranDivision> {
    QURAN_DIVISIONS
        .iter()
        .find(|division| division.surah_numbers.contains(&surah_number))
}
