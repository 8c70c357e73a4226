#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for site analysis.
//!
//! Turns a free-form address into a point and a canonical label using a
//! multi-provider strategy configured via TOML files in `services/`:
//!
//! 1. **Nominatim / OpenStreetMap** (priority 1): free-form search, the
//!    returned `display_name` becomes the site label.
//! 2. **US Census Bureau Geocoder** (priority 2): one-line address lookup,
//!    used when Nominatim has no match or is unreachable.
//!
//! Providers are loaded from the [`service_registry`] and tried in priority
//! order by a [`chain::ChainGeocoder`].

pub mod census;
pub mod chain;
pub mod nominatim;
pub mod service_registry;

use serde::{Deserialize, Serialize};
use site_engine_geography_models::GeoPoint;
use thiserror::Error;

/// A geocoded site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodedLocation {
    /// Site coordinates (WGS84).
    pub point: GeoPoint,
    /// Canonical address label returned by the provider.
    pub label: String,
    /// Which provider resolved the address.
    pub provider: GeocodingProvider,
}

/// Which geocoding provider resolved an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodingProvider {
    /// Nominatim / `OpenStreetMap`.
    Nominatim,
    /// US Census Bureau Geocoder.
    Census,
}

impl std::fmt::Display for GeocodingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Nominatim => "nominatim",
            Self::Census => "census",
        })
    }
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// No geocoding provider is enabled.
    #[error("No geocoding providers are enabled")]
    NoProviders,
}

/// Resolves a free-form address to a single location.
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Provider identity, for logging.
    fn provider(&self) -> GeocodingProvider;

    /// Returns the best match for `address`, or `None` when the provider
    /// found nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the provider could not be queried or its
    /// response could not be parsed.
    async fn geocode(&self, address: &str) -> Result<Option<GeocodedLocation>, GeocodeError>;
}

/// Builds the shared HTTP client used by the geocoding providers.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the client cannot be built.
pub fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, GeocodeError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("site-engine/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}
