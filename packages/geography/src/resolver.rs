//! Resolves the census tracts surrounding a site.
//!
//! Candidate tracts come from an envelope intersection query. Each feature
//! is normalized into a [`Tract`] with a zero-padded GEOID and its distance
//! from the site; malformed and duplicate features are dropped, and only
//! tracts within `max_radius + buffer` miles are kept.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use site_engine_geography_models::{Envelope, GeoPoint, Tract};

use crate::distance::haversine_miles;
use crate::tigerweb::TractBoundaryService;

/// Fixed envelope margin, in degrees, applied on every side of the site.
pub const DEFAULT_ENVELOPE_MARGIN_DEGREES: f64 = 0.3;

/// Extra distance beyond the largest radius within which tracts are kept.
///
/// Tracts whose internal point sits just outside a radius can still
/// overlap it.
pub const DEFAULT_DISTANCE_BUFFER_MILES: f64 = 1.5;

/// Approximate length of one degree of latitude, in miles.
const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// How far the query envelope extends from the site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvelopeMargin {
    /// The same margin in degrees on both axes, regardless of radius.
    ///
    /// Under-covers very large radii and over-fetches for small ones.
    Fixed {
        /// Margin in degrees.
        degrees: f64,
    },
    /// Sized from the largest radius plus the distance buffer.
    RadiusDerived,
}

impl Default for EnvelopeMargin {
    fn default() -> Self {
        Self::Fixed {
            degrees: DEFAULT_ENVELOPE_MARGIN_DEGREES,
        }
    }
}

/// Tuning for [`resolve_tracts`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ResolverOptions {
    /// Envelope sizing strategy.
    pub margin: EnvelopeMargin,
    /// Distance, in miles, added to the largest radius when filtering.
    pub distance_buffer_miles: f64,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            margin: EnvelopeMargin::default(),
            distance_buffer_miles: DEFAULT_DISTANCE_BUFFER_MILES,
        }
    }
}

/// Builds the query envelope around `center` for the given largest radius.
#[must_use]
pub fn build_envelope(center: GeoPoint, max_radius_miles: f64, options: &ResolverOptions) -> Envelope {
    match options.margin {
        EnvelopeMargin::Fixed { degrees } => Envelope::around(center, degrees, degrees),
        EnvelopeMargin::RadiusDerived => {
            let reach = max_radius_miles + options.distance_buffer_miles;
            let lat_margin = reach / MILES_PER_DEGREE_LAT;
            // Clamp near the poles where a degree of longitude collapses.
            let cos_lat = center.latitude.to_radians().cos().max(0.01);
            let lon_margin = reach / (MILES_PER_DEGREE_LAT * cos_lat);
            Envelope::around(center, lat_margin, lon_margin)
        }
    }
}

/// Reads a numeric FIPS component from a feature attribute and zero-pads
/// it to `width` digits.
///
/// `ArcGIS` returns these either as strings (`"001"`) or as numbers (`1`).
fn fips_component(value: &serde_json::Value, width: usize) -> Option<String> {
    let digits = match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
                return None;
            }
            s.to_string()
        }
        serde_json::Value::Number(n) => n.as_u64()?.to_string(),
        _ => return None,
    };

    if digits.len() > width {
        return None;
    }

    Some(format!("{digits:0>width$}"))
}

/// Reads a coordinate attribute, accepting `"+38.8951"` strings or numbers.
fn coordinate(value: &serde_json::Value) -> Option<f64> {
    value
        .as_str()
        .and_then(|s| s.trim().parse::<f64>().ok())
        .or_else(|| value.as_f64())
        .filter(|v| v.is_finite())
}

/// Normalizes a single raw feature into a [`Tract`].
///
/// Returns `None` when STATE, COUNTY, TRACT or the internal point is
/// missing or malformed.
#[must_use]
pub fn parse_feature(feature: &serde_json::Value, center: GeoPoint) -> Option<Tract> {
    let attrs = feature
        .get("attributes")
        .or_else(|| feature.get("properties"))?;

    let state_fips = fips_component(&attrs["STATE"], 2)?;
    let county_fips = fips_component(&attrs["COUNTY"], 3)?;
    let tract_code = fips_component(&attrs["TRACT"], 6)?;

    let centroid = GeoPoint::new(coordinate(&attrs["INTPTLAT"])?, coordinate(&attrs["INTPTLON"])?);

    let geometry = feature
        .get("geometry")
        .filter(|g| !g.is_null())
        .cloned();

    Some(Tract {
        geoid: Tract::compose_geoid(&state_fips, &county_fips, &tract_code),
        state_fips,
        county_fips,
        tract_code,
        centroid,
        distance_miles: haversine_miles(center, centroid),
        geometry,
    })
}

/// Normalizes raw features, dropping malformed ones and duplicate GEOIDs
/// (first occurrence wins), and keeps tracts within `max_distance_miles`.
///
/// The result is ordered by distance from the site, then GEOID.
#[must_use]
pub fn normalize_tracts(
    features: &[serde_json::Value],
    center: GeoPoint,
    max_distance_miles: f64,
) -> Vec<Tract> {
    let mut seen = BTreeSet::new();
    let mut malformed = 0usize;
    let mut duplicates = 0usize;

    let mut tracts: Vec<Tract> = features
        .iter()
        .filter_map(|feature| {
            let Some(tract) = parse_feature(feature, center) else {
                malformed += 1;
                return None;
            };
            if !seen.insert(tract.geoid.clone()) {
                duplicates += 1;
                return None;
            }
            Some(tract)
        })
        .filter(|tract| tract.distance_miles <= max_distance_miles)
        .collect();

    if malformed > 0 || duplicates > 0 {
        log::debug!("Dropped {malformed} malformed and {duplicates} duplicate tract features");
    }

    tracts.sort_by(|a, b| {
        a.distance_miles
            .total_cmp(&b.distance_miles)
            .then_with(|| a.geoid.cmp(&b.geoid))
    });

    tracts
}

/// Resolves every tract within `max_radius_miles` (plus the configured
/// buffer) of `center`.
///
/// Never fails: an unreachable service or an empty response yields an
/// empty set, which downstream aggregation turns into zero-valued
/// summaries.
pub async fn resolve_tracts(
    service: &dyn TractBoundaryService,
    center: GeoPoint,
    max_radius_miles: f64,
    options: &ResolverOptions,
) -> Vec<Tract> {
    let envelope = build_envelope(center, max_radius_miles, options);

    let features = match service.tracts_in_envelope(&envelope).await {
        Ok(features) => features,
        Err(e) => {
            log::warn!("Tract boundary query failed, continuing with no tracts: {e}");
            return Vec::new();
        }
    };

    if features.is_empty() {
        log::warn!(
            "Tract boundary service returned no features for envelope {}",
            envelope.to_query_string()
        );
        return Vec::new();
    }

    let max_distance = max_radius_miles + options.distance_buffer_miles;
    let tracts = normalize_tracts(&features, center, max_distance);

    log::info!(
        "Resolved {} tracts within {max_distance:.1} mi of ({:.5}, {:.5}) from {} features",
        tracts.len(),
        center.latitude,
        center.longitude,
        features.len()
    );

    tracts
}
