//! US Census Bureau Geocoder client.
//!
//! Uses the one-line address endpoint, which needs no API key:
//! `GET /locations/onelineaddress`.
//!
//! See <https://geocoding.geo.census.gov/geocoder/Geocoding_Services_API.html>

use site_engine_geography_models::GeoPoint;

use crate::{GeocodeError, GeocodedLocation, Geocoder, GeocodingProvider};

/// Default benchmark (address range vintage) for lookups.
pub const DEFAULT_BENCHMARK: &str = "Public_AR_Current";

/// One-line address lookup against the Census Bureau geocoder.
pub struct CensusGeocoder {
    client: reqwest::Client,
    base_url: String,
    benchmark: String,
}

impl CensusGeocoder {
    /// Creates a geocoder against `base_url` (e.g.
    /// `https://geocoding.geo.census.gov/geocoder`).
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        benchmark: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            benchmark: benchmark.into(),
        }
    }
}

#[async_trait::async_trait]
impl Geocoder for CensusGeocoder {
    fn provider(&self) -> GeocodingProvider {
        GeocodingProvider::Census
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        let url = format!(
            "{}/locations/onelineaddress",
            self.base_url.trim_end_matches('/')
        );

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("address", address),
                ("benchmark", self.benchmark.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses the JSON response from the address endpoints.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedLocation>, GeocodeError> {
    let matches =
        body["result"]["addressMatches"]
            .as_array()
            .ok_or_else(|| GeocodeError::Parse {
                message: "Missing addressMatches array".to_string(),
            })?;

    let Some(first) = matches.first() else {
        return Ok(None);
    };

    let x = first["coordinates"]["x"]
        .as_f64()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing x coordinate".to_string(),
        })?;
    let y = first["coordinates"]["y"]
        .as_f64()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing y coordinate".to_string(),
        })?;

    let label = first["matchedAddress"]
        .as_str()
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing matchedAddress".to_string(),
        })?
        .to_string();

    Ok(Some(GeocodedLocation {
        point: GeoPoint::new(y, x),
        label,
        provider: GeocodingProvider::Census,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_match() {
        let body = serde_json::json!({
            "result": {
                "addressMatches": [{
                    "coordinates": { "x": -76.927_487, "y": 38.846_016 },
                    "matchedAddress": "4600 SILVER HILL RD, WASHINGTON, DC, 20233"
                }]
            }
        });
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.point.longitude - -76.927_487).abs() < 1e-6);
        assert!((result.point.latitude - 38.846_016).abs() < 1e-6);
        assert_eq!(result.label, "4600 SILVER HILL RD, WASHINGTON, DC, 20233");
        assert_eq!(result.provider, GeocodingProvider::Census);
    }

    #[test]
    fn parses_single_no_match() {
        let body = serde_json::json!({
            "result": { "addressMatches": [] }
        });
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn missing_result_is_a_parse_error() {
        let body = serde_json::json!({ "errors": ["Address cannot be empty"] });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
