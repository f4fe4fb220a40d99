//! Playable tracks and the queue builders used by the reciter screen.
//!
//! A [`Track`] is one surah recited by one reciter, with display names already
//! localized and the audio source resolved: the downloaded file when a
//! download marker exists, the CDN stream otherwise.

use crate::error::{PlaybackError, Result};
use crate::shuffle::fisher_yates;
use bridge_traits::AudioSource;
use core_library::repositories::{
    DownloadRepository, ReciterRepository, SqliteDownloadRepository, SqliteReciterRepository,
    SqliteSurahRepository, SurahRepository,
};
use core_library::{Download, Reciter, Surah};
use core_runtime::CdnConfigHandle;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Display language for reciter and surah names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Ar,
}

impl Locale {
    /// Maps a language tag such as `"ar"` or `"ar-SA"`; anything else is English.
    pub fn from_tag(tag: &str) -> Self {
        let primary = tag.split(['-', '_']).next().unwrap_or_default();
        if primary.eq_ignore_ascii_case("ar") {
            Locale::Ar
        } else {
            Locale::En
        }
    }

    pub fn is_rtl(&self) -> bool {
        matches!(self, Locale::Ar)
    }
}

/// One recitation ready for the audio engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub reciter_id: String,
    pub reciter_name: String,
    pub reciter_color_primary: String,
    pub reciter_color_secondary: String,
    pub surah_number: u16,
    pub surah_name: String,
    pub source: AudioSource,
    pub is_downloaded: bool,
}

impl Track {
    /// Build a track; `download` switches the source to the local file.
    pub fn new(
        reciter: &Reciter,
        surah: &Surah,
        locale: Locale,
        cdn: &CdnConfigHandle,
        download: Option<&Download>,
    ) -> Self {
        let (reciter_name, surah_name) = match locale {
            Locale::Ar => (&reciter.name_ar, &surah.name_ar),
            Locale::En => (&reciter.name_en, &surah.name_en),
        };

        let source = match download {
            Some(download) => AudioSource::local(&download.local_file_path),
            None => AudioSource::remote(cdn.current().audio_url(&reciter.id, surah.number)),
        };

        Self {
            reciter_id: reciter.id.clone(),
            reciter_name: reciter_name.clone(),
            reciter_color_primary: reciter.color_primary.clone(),
            reciter_color_secondary: reciter.color_secondary.clone(),
            surah_number: surah.number,
            surah_name: surah_name.clone(),
            source,
            is_downloaded: download.is_some(),
        }
    }
}

/// Builds tracks and queues from the local store.
#[derive(Clone)]
pub struct TrackResolver {
    reciters: Arc<dyn ReciterRepository>,
    surahs: Arc<dyn SurahRepository>,
    downloads: Arc<dyn DownloadRepository>,
    cdn: CdnConfigHandle,
}

impl TrackResolver {
    pub fn new(pool: SqlitePool, cdn: CdnConfigHandle) -> Self {
        Self {
            reciters: Arc::new(SqliteReciterRepository::new(pool.clone())),
            surahs: Arc::new(SqliteSurahRepository::new(pool.clone())),
            downloads: Arc::new(SqliteDownloadRepository::new(pool)),
            cdn,
        }
    }

    async fn reciter(&self, reciter_id: &str) -> Result<Reciter> {
        self.reciters
            .find_by_id(reciter_id)
            .await?
            .ok_or_else(|| PlaybackError::ReciterNotFound(reciter_id.to_string()))
    }

    async fn downloads_by_surah(&self, reciter_id: &str) -> Result<HashMap<u16, Download>> {
        Ok(self
            .downloads
            .find_by_reciter(reciter_id)
            .await?
            .into_iter()
            .map(|d| (d.surah_number, d))
            .collect())
    }

    fn build_all(
        &self,
        reciter: &Reciter,
        surahs: &[Surah],
        downloads: &HashMap<u16, Download>,
        locale: Locale,
    ) -> Vec<Track> {
        surahs
            .iter()
            .map(|surah| {
                Track::new(
                    reciter,
                    surah,
                    locale,
                    &self.cdn,
                    downloads.get(&surah.number),
                )
            })
            .collect()
    }

    /// The track for one surah, using the downloaded file when available.
    pub async fn track_for(
        &self,
        reciter_id: &str,
        surah_number: u16,
        locale: Locale,
    ) -> Result<Track> {
        let reciter = self.reciter(reciter_id).await?;
        let surah = self
            .surahs
            .find_by_number(surah_number)
            .await?
            .ok_or(PlaybackError::SurahNotFound(surah_number))?;
        let download = self.downloads.find(reciter_id, surah_number).await?;

        Ok(Track::new(
            &reciter,
            &surah,
            locale,
            &self.cdn,
            download.as_ref(),
        ))
    }

    /// The selected surah followed by every later surah in canonical order.
    pub async fn surah_queue(
        &self,
        reciter_id: &str,
        surah_number: u16,
        locale: Locale,
    ) -> Result<(Track, Vec<Track>)> {
        let first = self.track_for(reciter_id, surah_number, locale).await?;

        let reciter = self.reciter(reciter_id).await?;
        let later = self.surahs.find_after(surah_number).await?;
        let downloads = self.downloads_by_surah(reciter_id).await?;
        let queue = self.build_all(&reciter, &later, &downloads, locale);

        debug!(reciter_id, surah_number, queued = queue.len(), "Built surah queue");
        Ok((first, queue))
    }

    /// Every surah in random order; the first one is returned separately.
    ///
    /// Returns `None` when no surahs are stored.
    pub async fn shuffled_queue(
        &self,
        reciter_id: &str,
        locale: Locale,
    ) -> Result<Option<(Track, Vec<Track>)>> {
        let tracks = self.all_tracks(reciter_id, locale).await?;
        Ok(split_shuffled(tracks, &mut rand::thread_rng()))
    }

    async fn all_tracks(&self, reciter_id: &str, locale: Locale) -> Result<Vec<Track>> {
        let reciter = self.reciter(reciter_id).await?;
        let surahs = self.surahs.find_all().await?;
        let downloads = self.downloads_by_surah(reciter_id).await?;
        Ok(self.build_all(&reciter, &surahs, &downloads, locale))
    }
}

/// Shuffle `tracks` and split off the head.
pub fn split_shuffled<R>(mut tracks: Vec<Track>, rng: &mut R) -> Option<(Track, Vec<Track>)>
where
    R: Rng + ?Sized,
{
    fisher_yates(&mut tracks, rng);
    if tracks.is_empty() {
        return None;
    }
    let first = tracks.remove(0);
    Some((first, tracks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_library::bundled;
    use core_library::db::create_test_pool;
    use core_runtime::CdnConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    async fn setup() -> (SqlitePool, TrackResolver) {
        let pool = create_test_pool().await.unwrap();
        SqliteReciterRepository::new(pool.clone())
            .replace_all(&[
                Reciter::new("alafasy", "Mishary Alafasy", "مشاري العفاسي")
                    .with_colors("#0d4d3d", "#c9a961"),
            ])
            .await
            .unwrap();
        SqliteSurahRepository::new(pool.clone())
            .insert_many(&bundled::surahs().unwrap())
            .await
            .unwrap();

        let cdn = CdnConfigHandle::new(CdnConfig::new("https://cdn.example.com").unwrap());
        (pool.clone(), TrackResolver::new(pool, cdn))
    }

    #[test]
    fn test_locale_from_tag() {
        assert_eq!(Locale::from_tag("ar"), Locale::Ar);
        assert_eq!(Locale::from_tag("AR-sa"), Locale::Ar);
        assert_eq!(Locale::from_tag("en_US"), Locale::En);
        assert_eq!(Locale::from_tag(""), Locale::En);
        assert!(Locale::Ar.is_rtl());
    }

    #[tokio::test]
    async fn test_track_for_streams_from_cdn() {
        let (_pool, resolver) = setup().await;

        let track = resolver.track_for("alafasy", 2, Locale::En).await.unwrap();

        assert_eq!(track.reciter_name, "Mishary Alafasy");
        assert_eq!(track.surah_name, "Al-Baqarah");
        assert_eq!(track.reciter_color_primary, "#0d4d3d");
        assert_eq!(
            track.source,
            AudioSource::remote("https://cdn.example.com/audio/alafasy/002.mp3")
        );
        assert!(!track.is_downloaded);

        let arabic = resolver.track_for("alafasy", 2, Locale::Ar).await.unwrap();
        assert_eq!(arabic.reciter_name, "مشاري العفاسي");
        assert_eq!(arabic.surah_name, "البقرة");
    }

    #[test]
    fn test_stream_url_encodes_reciter_id() {
        let reciter = Reciter::new("abdul basit?mujawwad", "Abdul Basit", "عبد الباسط");
        let surah = bundled::surahs().unwrap().remove(0);
        let cdn = CdnConfigHandle::new(CdnConfig::new("https://cdn.example.com").unwrap());

        let track = Track::new(&reciter, &surah, Locale::En, &cdn, None);

        assert_eq!(
            track.source,
            AudioSource::remote("https://cdn.example.com/audio/abdul%20basit%3Fmujawwad/001.mp3")
        );
        assert_eq!(track.reciter_id, "abdul basit?mujawwad");
    }

    #[tokio::test]
    async fn test_track_for_prefers_downloaded_file() {
        let (pool, resolver) = setup().await;
        SqliteDownloadRepository::new(pool)
            .upsert(&Download::new("alafasy", 18, "/data/alafasy/018.mp3", 1))
            .await
            .unwrap();

        let track = resolver.track_for("alafasy", 18, Locale::En).await.unwrap();
        assert!(track.is_downloaded);
        assert_eq!(track.source, AudioSource::local("/data/alafasy/018.mp3"));
    }

    #[tokio::test]
    async fn test_track_for_unknown_entities() {
        let (_pool, resolver) = setup().await;

        let err = resolver.track_for("nobody", 1, Locale::En).await.unwrap_err();
        assert!(matches!(err, PlaybackError::ReciterNotFound(_)));

        let err = resolver.track_for("alafasy", 200, Locale::En).await.unwrap_err();
        assert!(matches!(err, PlaybackError::SurahNotFound(200)));
    }

    #[tokio::test]
    async fn test_surah_queue_holds_later_surahs() {
        let (_pool, resolver) = setup().await;

        let (first, queue) = resolver.surah_queue("alafasy", 110, Locale::En).await.unwrap();

        assert_eq!(first.surah_number, 110);
        let numbers: Vec<u16> = queue.iter().map(|t| t.surah_number).collect();
        assert_eq!(numbers, vec![111, 112, 113, 114]);
    }

    #[tokio::test]
    async fn test_shuffled_queue_covers_every_surah() {
        let (_pool, resolver) = setup().await;

        let (first, rest) = resolver
            .shuffled_queue("alafasy", Locale::En)
            .await
            .unwrap()
            .unwrap();

        let mut numbers: Vec<u16> = rest.iter().map(|t| t.surah_number).collect();
        numbers.push(first.surah_number);
        numbers.sort_unstable();
        assert_eq!(numbers, (1..=114).collect::<Vec<u16>>());
    }

    #[test]
    fn test_split_shuffled_empty() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(split_shuffled(Vec::new(), &mut rng).is_none());
    }
}
