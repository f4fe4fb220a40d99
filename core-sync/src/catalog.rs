//! # Remote Catalog Client
//!
//! Fetches the catalog document (`metadata/db.json`) from the CDN.
//!
//! Every request carries a `t=<unix-ms>` query parameter and no-cache headers
//! so intermediate caches never serve a stale catalog. A fetch has no side
//! effects and is never retried: callers decide what a failure means.

use crate::error::CatalogError;
use bridge_traits::{Clock, HttpClient, HttpRequest};
use core_library::Reciter;
use core_runtime::CdnConfigHandle;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Applied to every catalog request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-controlled application settings carried by the catalog.
///
/// Missing fields deserialize as empty strings; an empty `cdn_base_url`
/// leaves the current CDN in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub cdn_base_url: String,
    pub app_name: String,
    pub support_email: String,
    /// Latest published app version
    pub app_version: String,
    /// Oldest app version still supported
    pub min_app_version: String,
}

/// The catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub version: String,
    #[serde(default)]
    pub settings: CatalogSettings,
    pub reciters: Vec<Reciter>,
}

impl Catalog {
    /// Distinct ids of the reciters that would be stored.
    ///
    /// Invalid entries are left out, matching what the repository keeps.
    pub fn reciter_ids(&self) -> HashSet<&str> {
        self.reciters
            .iter()
            .filter(|r| r.validate().is_ok())
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Whether this catalog publishes a different reciter set than `current`.
    ///
    /// Order and repeated ids are irrelevant; only membership matters.
    pub fn differs_from(&self, current: &[String]) -> bool {
        let current: HashSet<&str> = current.iter().map(String::as_str).collect();
        self.reciter_ids() != current
    }
}

/// HTTP client for the catalog document.
#[derive(Clone)]
pub struct CatalogClient {
    http: Arc<dyn HttpClient>,
    cdn: CdnConfigHandle,
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl CatalogClient {
    pub fn new(http: Arc<dyn HttpClient>, cdn: CdnConfigHandle, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            cdn,
            clock,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The CDN configuration requests are built from.
    pub fn cdn(&self) -> &CdnConfigHandle {
        &self.cdn
    }

    /// Fetch and parse the current catalog.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Network`] when no response was received
    /// - [`CatalogError::Http`] for any non-2xx status
    /// - [`CatalogError::Parse`] when the body is not a catalog document
    #[instrument(skip(self))]
    pub async fn fetch_catalog(&self) -> Result<Catalog, CatalogError> {
        let url = self
            .cdn
            .current()
            .catalog_url(self.clock.unix_timestamp_millis());

        let request = HttpRequest::get(url.clone())
            .header("Cache-Control", "no-cache, no-store, must-revalidate")
            .header("Pragma", "no-cache")
            .timeout(self.timeout);

        let response = self.http.execute(request).await.map_err(|e| {
            warn!(error = %e, "Catalog request failed");
            CatalogError::Network {
                url: url.clone(),
                message: e.to_string(),
            }
        })?;

        if !response.is_success() {
            warn!(status = response.status, "Catalog request rejected");
            return Err(CatalogError::Http {
                status: response.status,
                url,
            });
        }

        let catalog: Catalog = serde_json::from_slice(&response.body)
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        debug!(
            version = %catalog.version,
            reciters = catalog.reciters.len(),
            "Fetched catalog"
        );

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::HttpResponse;
    use bytes::Bytes;
    use chrono::{DateTime, TimeZone, Utc};
    use core_runtime::CdnConfig;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
        }
    }

    const CATALOG: &str = r##"{
        "version": "4",
        "settings": {
            "cdn_base_url": "https://cdn.example.com",
            "app_name": "Qariee",
            "support_email": "help@example.com",
            "app_version": "1.2.0",
            "min_app_version": "1.0.0"
        },
        "reciters": [
            {"id": "alafasy", "name_en": "Mishary Alafasy", "name_ar": "مشاري العفاسي",
             "color_primary": "#0d4d3d", "color_secondary": "#c9a961"},
            {"id": "husary", "name_en": "Al-Husary", "name_ar": "الحصري"}
        ]
    }"##;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn client(http: MockHttp) -> CatalogClient {
        let cdn = CdnConfigHandle::new(CdnConfig::new("https://cdn.example.com/").unwrap());
        CatalogClient::new(Arc::new(http), cdn, Arc::new(FixedClock))
    }

    #[tokio::test]
    async fn test_fetch_catalog_builds_uncached_request() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|request| {
                request.url == "https://cdn.example.com/metadata/db.json?t=1700000000123"
                    && request.headers.get("Cache-Control").map(String::as_str)
                        == Some("no-cache, no-store, must-revalidate")
                    && request.headers.get("Pragma").map(String::as_str) == Some("no-cache")
            })
            .times(1)
            .returning(|_| Ok(response(200, CATALOG)));

        let catalog = client(http).fetch_catalog().await.unwrap();

        assert_eq!(catalog.version, "4");
        assert_eq!(catalog.settings.min_app_version, "1.0.0");
        assert_eq!(catalog.reciters.len(), 2);
        assert_eq!(catalog.reciters[0].color_secondary, "#c9a961");
        assert_eq!(catalog.reciters[1].color_primary, "");
    }

    #[tokio::test]
    async fn test_fetch_catalog_http_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(404, "not found")));

        let err = client(http).fetch_catalog().await.unwrap_err();
        assert!(matches!(err, CatalogError::Http { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_catalog_network_error_is_not_retried() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Network("offline".to_string())));

        let err = client(http).fetch_catalog().await.unwrap_err();
        assert!(matches!(err, CatalogError::Network { .. }));
    }

    #[tokio::test]
    async fn test_fetch_catalog_parse_error() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"version": "1"}"#)));

        let err = client(http).fetch_catalog().await.unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn test_differs_from_ignores_order() {
        let catalog: Catalog = serde_json::from_str(CATALOG).unwrap();

        assert!(!catalog.differs_from(&["husary".to_string(), "alafasy".to_string()]));
        assert!(catalog.differs_from(&["alafasy".to_string()]));
        assert!(catalog.differs_from(&["alafasy".to_string(), "sudais".to_string()]));
    }

    #[test]
    fn test_differs_from_collapses_repeated_ids() {
        let catalog = Catalog {
            version: "2".to_string(),
            settings: CatalogSettings::default(),
            reciters: vec![
                Reciter::new("a", "A", "أ"),
                Reciter::new("a", "A again", "أ"),
                Reciter::new("b", "B", "ب"),
                Reciter::new("bad/id", "Bad", ""),
            ],
        };

        assert_eq!(catalog.reciter_ids().len(), 2);
        assert!(!catalog.differs_from(&["b".to_string(), "a".to_string()]));
        assert!(catalog.differs_from(&["a".to_string(), "b".to_string(), "c".to_string()]));
    }

    #[test]
    fn test_settings_default_when_missing() {
        let catalog: Catalog =
            serde_json::from_str(r#"{"version": "1", "reciters": []}"#).unwrap();
        assert_eq!(catalog.settings, CatalogSettings::default());
        assert!(catalog.reciter_ids().is_empty());
    }
}
