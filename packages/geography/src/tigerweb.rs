//! Census Bureau `TIGERweb` tract boundary client.
//!
//! Issues `esriGeometryEnvelope` intersection queries against the
//! `Tracts_Blocks` map service and returns the raw features. Pages are
//! followed via `resultOffset` while the server reports
//! `exceededTransferLimit`.

use std::time::Duration;

use site_engine_geography_models::Envelope;

use crate::GeoError;

/// Default `TIGERweb` census tract layer query endpoint.
pub const DEFAULT_TRACTS_URL: &str =
    "https://tigerweb.geo.census.gov/arcgis/rest/services/TIGERweb/Tracts_Blocks/MapServer/10/query";

/// Attribute fields requested for every tract.
const OUT_FIELDS: &str = "STATE,COUNTY,TRACT,INTPTLAT,INTPTLON";

/// Page size for paginated envelope queries.
const PAGE_SIZE: u32 = 500;

/// Browser-like User-Agent to avoid WAF blocks on `TIGERweb`.
const TIGERWEB_USER_AGENT: &str = "Mozilla/5.0 (compatible; SiteEngine/1.0; +https://github.com)";

/// A source of census tract features intersecting an envelope.
#[async_trait::async_trait]
pub trait TractBoundaryService: Send + Sync {
    /// Returns every raw tract feature whose boundary intersects `envelope`.
    ///
    /// Features carry either an `attributes` object (`EsriJSON`) or a
    /// `properties` object (`GeoJSON`) plus an optional `geometry`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the service cannot be reached or responds
    /// with something other than a feature collection.
    async fn tracts_in_envelope(
        &self,
        envelope: &Envelope,
    ) -> Result<Vec<serde_json::Value>, GeoError>;
}

/// `TIGERweb` REST client.
pub struct TigerWebClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    return_geometry: bool,
}

impl TigerWebClient {
    /// Creates a client for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .user_agent(TIGERWEB_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            max_retries: 3,
            return_geometry: true,
        })
    }

    /// Sets how many attempts are made per page before giving up.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Whether boundary geometry is requested along with the attributes.
    #[must_use]
    pub const fn with_geometry(mut self, return_geometry: bool) -> Self {
        self.return_geometry = return_geometry;
        self
    }

    fn envelope_url(&self, envelope: &Envelope, offset: u32) -> String {
        format!(
            "{base}?geometry={geometry}\
             &geometryType=esriGeometryEnvelope\
             &inSR=4326\
             &spatialRel=esriSpatialRelIntersects\
             &outFields={OUT_FIELDS}\
             &outSR=4326\
             &f=json\
             &returnGeometry={return_geometry}\
             &resultRecordCount={PAGE_SIZE}\
             &resultOffset={offset}",
            base = self.base_url,
            geometry = envelope.to_query_string(),
            return_geometry = self.return_geometry,
        )
    }

    /// Fetches a single page with retry and exponential backoff. Logs the
    /// raw response body on failure for debugging.
    async fn fetch_page_with_retry(&self, url: &str, offset: u32) -> Result<serde_json::Value, GeoError> {
        let mut last_error = String::new();

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(250 << attempt);
                log::warn!(
                    "TIGERweb (offset={offset}): retry {attempt}/{} in {delay:?}...",
                    self.max_retries
                );
                tokio::time::sleep(delay).await;
            }

            let resp = match self.client.get(url).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = format!("HTTP request error: {e}");
                    log::warn!("TIGERweb (offset={offset}, attempt {attempt}): {last_error}");
                    continue;
                }
            };

            let status = resp.status();
            let body = match resp.text().await {
                Ok(b) => b,
                Err(e) => {
                    last_error = format!("Failed to read response body: {e}");
                    log::warn!("TIGERweb (offset={offset}, attempt {attempt}): {last_error}");
                    continue;
                }
            };

            if !status.is_success() {
                last_error = format!("HTTP {status}");
                log::warn!(
                    "TIGERweb (offset={offset}, attempt {attempt}): {last_error}. Response body: {}",
                    truncate_for_log(&body, 500)
                );
                continue;
            }

            let json: serde_json::Value = match serde_json::from_str(&body) {
                Ok(j) => j,
                Err(e) => {
                    last_error = format!("JSON parse error: {e}");
                    log::warn!(
                        "TIGERweb (offset={offset}, attempt {attempt}): {last_error}. Response body: {}",
                        truncate_for_log(&body, 500)
                    );
                    continue;
                }
            };

            // ArcGIS reports failures in-band: {"error": {"code": 500, "message": "..."}}
            if let Some(error_obj) = json.get("error") {
                let code = error_obj
                    .get("code")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or(0);
                let msg = error_obj
                    .get("message")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown");
                last_error = format!("ArcGIS error {code}: {msg}");
                log::warn!("TIGERweb (offset={offset}, attempt {attempt}): {last_error}");
                continue;
            }

            return Ok(json);
        }

        Err(GeoError::Conversion {
            message: format!(
                "TIGERweb request failed after {} attempts (offset={offset}): {last_error}",
                self.max_retries
            ),
        })
    }
}

#[async_trait::async_trait]
impl TractBoundaryService for TigerWebClient {
    async fn tracts_in_envelope(
        &self,
        envelope: &Envelope,
    ) -> Result<Vec<serde_json::Value>, GeoError> {
        let mut all_features: Vec<serde_json::Value> = Vec::new();
        let mut offset = 0u32;

        loop {
            let url = self.envelope_url(envelope, offset);
            let json = self.fetch_page_with_retry(&url, offset).await?;

            let features = json["features"]
                .as_array()
                .ok_or_else(|| GeoError::Conversion {
                    message: format!("No features array in TIGERweb response (offset={offset})"),
                })?;

            if features.is_empty() {
                break;
            }

            #[allow(clippy::cast_possible_truncation)]
            let page_len = features.len() as u32;

            all_features.extend(features.iter().cloned());

            let exceeded = json
                .get("exceededTransferLimit")
                .and_then(serde_json::Value::as_bool)
                .unwrap_or(false);

            if !exceeded {
                break;
            }

            offset += page_len;
            log::debug!(
                "TIGERweb: fetched {page_len} tracts (total so far: {}), fetching next page...",
                all_features.len()
            );
        }

        log::info!(
            "TIGERweb: {} tract features intersect envelope {}",
            all_features.len(),
            envelope.to_query_string()
        );

        Ok(all_features)
    }
}

/// Truncates a string for logging, appending "..." if it exceeds `max_len`.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_url_contains_query_shape() {
        let client = TigerWebClient::new(DEFAULT_TRACTS_URL, Duration::from_secs(5)).unwrap();
        let env = Envelope {
            min_lon: -77.3,
            min_lat: 38.6,
            max_lon: -76.7,
            max_lat: 39.2,
        };
        let url = client.envelope_url(&env, 500);
        assert!(url.starts_with(DEFAULT_TRACTS_URL));
        assert!(url.contains("geometry=-77.3,38.6,-76.7,39.2"));
        assert!(url.contains("geometryType=esriGeometryEnvelope"));
        assert!(url.contains("outFields=STATE,COUNTY,TRACT,INTPTLAT,INTPTLON"));
        assert!(url.contains("returnGeometry=true"));
        assert!(url.contains("resultOffset=500"));
    }

    #[test]
    fn geometry_can_be_disabled() {
        let client = TigerWebClient::new(DEFAULT_TRACTS_URL, Duration::from_secs(5))
            .unwrap()
            .with_geometry(false);
        let env = Envelope::around(site_engine_geography_models::GeoPoint::new(0.0, 0.0), 1.0, 1.0);
        assert!(client.envelope_url(&env, 0).contains("returnGeometry=false"));
    }

    #[test]
    fn truncates_long_bodies() {
        assert_eq!(truncate_for_log("abc", 5), "abc");
        assert_eq!(truncate_for_log("abcdef", 3), "abc...");
    }
}
