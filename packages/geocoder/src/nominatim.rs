//! Nominatim / OpenStreetMap geocoder client.
//!
//! The public instance allows at most one request per second; a site
//! analysis issues a single lookup, so no client-side throttling is done.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use site_engine_geography_models::GeoPoint;

use crate::{GeocodeError, GeocodedLocation, Geocoder, GeocodingProvider};

/// Free-form Nominatim search.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    country_codes: Option<String>,
}

impl NominatimGeocoder {
    /// Creates a geocoder against `base_url` (the `/search` endpoint).
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            country_codes: None,
        }
    }

    /// Restricts results to the given comma-separated ISO country codes.
    #[must_use]
    pub fn with_country_codes(mut self, country_codes: impl Into<String>) -> Self {
        let codes = country_codes.into();
        self.country_codes = (!codes.trim().is_empty()).then_some(codes);
        self
    }
}

#[async_trait::async_trait]
impl Geocoder for NominatimGeocoder {
    fn provider(&self) -> GeocodingProvider {
        GeocodingProvider::Nominatim
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodedLocation>, GeocodeError> {
        let mut query = vec![("q", address), ("format", "json"), ("limit", "1")];
        if let Some(codes) = &self.country_codes {
            query.push(("countrycodes", codes.as_str()));
        }

        let resp = self.client.get(&self.base_url).query(&query).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        let body: serde_json::Value = resp.error_for_status()?.json().await?;
        parse_response(&body, address)
    }
}

/// Parses a Nominatim JSON response.
///
/// Falls back to the query text as the label when the result has no
/// `display_name`.
fn parse_response(
    body: &serde_json::Value,
    query: &str,
) -> Result<Option<GeocodedLocation>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = coordinate(&first["lat"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lat in Nominatim response".to_string(),
    })?;

    let lon = coordinate(&first["lon"]).ok_or_else(|| GeocodeError::Parse {
        message: "Missing lon in Nominatim response".to_string(),
    })?;

    let label = first["display_name"]
        .as_str()
        .map_or_else(|| query.to_string(), String::from);

    Ok(Some(GeocodedLocation {
        point: GeoPoint::new(lat, lon),
        label,
        provider: GeocodingProvider::Nominatim,
    }))
}

/// Nominatim returns coordinates as strings; accept numbers too.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "38.8977",
            "lon": "-77.0365",
            "display_name": "White House, 1600, Pennsylvania Avenue Northwest, Washington, DC, USA"
        }]);
        let result = parse_response(&body, "1600 Pennsylvania Ave").unwrap().unwrap();
        assert!((result.point.latitude - 38.8977).abs() < 1e-4);
        assert!((result.point.longitude - -77.0365).abs() < 1e-4);
        assert!(result.label.starts_with("White House"));
        assert_eq!(result.provider, GeocodingProvider::Nominatim);
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body, "nowhere").unwrap().is_none());
    }

    #[test]
    fn label_falls_back_to_query() {
        let body = serde_json::json!([{ "lat": 40.0, "lon": -75.0 }]);
        let result = parse_response(&body, "somewhere, PA").unwrap().unwrap();
        assert_eq!(result.label, "somewhere, PA");
    }

    #[test]
    fn rejects_unparseable_coordinates() {
        let body = serde_json::json!([{ "lat": "north", "lon": "-75.0" }]);
        assert!(matches!(
            parse_response(&body, "x"),
            Err(GeocodeError::Parse { .. })
        ));

        let body = serde_json::json!({ "error": "bad request" });
        assert!(parse_response(&body, "x").is_err());
    }
}
