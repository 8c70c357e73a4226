#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic point, envelope and census tract types.
//!
//! These types describe the site being analyzed and the census tracts
//! surrounding it. They are produced fresh for every analysis run and are
//! never persisted.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new point from latitude and longitude.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// An axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Western edge (minimum longitude).
    pub min_lon: f64,
    /// Southern edge (minimum latitude).
    pub min_lat: f64,
    /// Eastern edge (maximum longitude).
    pub max_lon: f64,
    /// Northern edge (maximum latitude).
    pub max_lat: f64,
}

impl Envelope {
    /// Builds an envelope extending `lat_margin` / `lon_margin` degrees in
    /// each direction from `center`.
    #[must_use]
    pub fn around(center: GeoPoint, lat_margin: f64, lon_margin: f64) -> Self {
        Self {
            min_lon: center.longitude - lon_margin,
            min_lat: center.latitude - lat_margin,
            max_lon: center.longitude + lon_margin,
            max_lat: center.latitude + lat_margin,
        }
    }

    /// Formats the envelope as `minLon,minLat,maxLon,maxLat`, the order
    /// `ArcGIS` expects for `esriGeometryEnvelope` queries.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// A census tract resolved around a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tract {
    /// Census GEOID (state FIPS + county FIPS + tract code, e.g. "11001000100").
    pub geoid: String,
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Three-digit county FIPS code.
    pub county_fips: String,
    /// Six-digit tract code.
    pub tract_code: String,
    /// Internal point of the tract.
    pub centroid: GeoPoint,
    /// Great-circle distance from the site to the centroid, in miles.
    pub distance_miles: f64,
    /// Raw boundary geometry as returned by the boundary service, passed
    /// through for map overlays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<serde_json::Value>,
}

impl Tract {
    /// Builds the composite GEOID from its zero-padded components.
    #[must_use]
    pub fn compose_geoid(state_fips: &str, county_fips: &str, tract_code: &str) -> String {
        format!("{state_fips}{county_fips}{tract_code}")
    }

    /// The `(state, county)` pair used to batch demographic requests.
    #[must_use]
    pub fn county_key(&self) -> CountyKey {
        CountyKey {
            state_fips: self.state_fips.clone(),
            county_fips: self.county_fips.clone(),
        }
    }
}

/// Identifies a single county for batched requests.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountyKey {
    /// Two-digit state FIPS code.
    pub state_fips: String,
    /// Three-digit county FIPS code.
    pub county_fips: String,
}

impl std::fmt::Display for CountyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.state_fips, self.county_fips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_around_center() {
        let env = Envelope::around(GeoPoint::new(38.9, -77.0), 0.3, 0.3);
        assert!((env.min_lat - 38.6).abs() < 1e-9);
        assert!((env.max_lat - 39.2).abs() < 1e-9);
        assert!((env.min_lon - -77.3).abs() < 1e-9);
        assert!((env.max_lon - -76.7).abs() < 1e-9);
    }

    #[test]
    fn envelope_query_order_is_lon_lat() {
        let env = Envelope {
            min_lon: -1.5,
            min_lat: 2.0,
            max_lon: -0.5,
            max_lat: 3.0,
        };
        assert_eq!(env.to_query_string(), "-1.5,2,-0.5,3");
    }

    #[test]
    fn county_key_display() {
        let key = CountyKey {
            state_fips: "11".to_string(),
            county_fips: "001".to_string(),
        };
        assert_eq!(key.to_string(), "11001");
        assert_eq!(Tract::compose_geoid("11", "001", "000100"), "11001000100");
    }
}
