//! Census Bureau ACS 5-year data API client.
//!
//! See <https://www.census.gov/data/developers/data-sets/acs-5year.html>

use std::time::Duration;

use site_engine_census_models::AcsVariable;
use site_engine_geography_models::CountyKey;

use crate::CensusError;
use crate::table::AcsRows;

/// Default Census data API root.
pub const DEFAULT_BASE_URL: &str = "https://api.census.gov/data";

/// Maximum length of a response body kept in error messages.
const BODY_PREVIEW_LEN: usize = 300;

/// A source of per-county ACS tract tables.
#[async_trait::async_trait]
pub trait DemographicService: Send + Sync {
    /// Fetches every tract in `county` for the fixed variable set.
    ///
    /// Returns the raw header + data rows.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError`] if the request fails or the body is not a
    /// table.
    async fn fetch_county(&self, county: &CountyKey, survey_year: u16) -> Result<AcsRows, CensusError>;
}

/// HTTP client for the ACS 5-year detailed tables.
pub struct AcsClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl AcsClient {
    /// Creates a client against `base_url` with a per-request `timeout`.
    ///
    /// The API works without a key for low request volumes; supply one to
    /// lift the daily limit.
    ///
    /// # Errors
    ///
    /// Returns [`CensusError`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CensusError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn county_url(&self, county: &CountyKey, survey_year: u16) -> String {
        let mut url = format!(
            "{base}/{survey_year}/acs/acs5\
             ?get={vars}\
             &for=tract:*\
             &in=state:{state}\
             &in=county:{county}",
            base = self.base_url.trim_end_matches('/'),
            vars = AcsVariable::query_list(),
            state = county.state_fips,
            county = county.county_fips,
        );

        if let Some(key) = &self.api_key {
            url.push_str("&key=");
            url.push_str(key);
        }

        url
    }
}

#[async_trait::async_trait]
impl DemographicService for AcsClient {
    async fn fetch_county(&self, county: &CountyKey, survey_year: u16) -> Result<AcsRows, CensusError> {
        let url = self.county_url(county, survey_year);
        log::debug!("Fetching ACS {survey_year} tracts for county {county}...");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(CensusError::Status {
                status: status.as_u16(),
                body: body.chars().take(BODY_PREVIEW_LEN).collect(),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn county() -> CountyKey {
        CountyKey {
            state_fips: "11".to_string(),
            county_fips: "001".to_string(),
        }
    }

    #[test]
    fn builds_county_url() {
        let client = AcsClient::new(DEFAULT_BASE_URL, None, Duration::from_secs(5)).unwrap();
        let url = client.county_url(&county(), 2022);
        assert!(url.starts_with("https://api.census.gov/data/2022/acs/acs5?get=B01003_001E,"));
        assert!(url.contains("&for=tract:*&in=state:11&in=county:001"));
        assert!(!url.contains("key="));
    }

    #[test]
    fn appends_api_key_when_present() {
        let client =
            AcsClient::new("https://example.test/data/", Some("abc".to_string()), Duration::from_secs(5))
                .unwrap();
        let url = client.county_url(&county(), 2017);
        assert!(url.starts_with("https://example.test/data/2017/acs/acs5"));
        assert!(url.ends_with("&key=abc"));
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let client =
            AcsClient::new(DEFAULT_BASE_URL, Some("  ".to_string()), Duration::from_secs(5)).unwrap();
        assert!(!client.county_url(&county(), 2022).contains("key="));
    }
}
