#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Radius summary types produced by the demographic aggregation engine.
//!
//! One [`RadiusSummary`] is produced per requested radius. Radii are
//! inclusive bands around the site, so a larger radius always covers every
//! tract of a smaller one.

use serde::{Deserialize, Serialize};

/// Annual population growth assumed when neither survey year has data.
pub const DEFAULT_POPULATION_GROWTH_RATE: f64 = 0.012;

/// Annual income growth assumed when neither survey year has data.
pub const DEFAULT_INCOME_GROWTH_RATE: f64 = 0.024;

/// Years between the baseline and current ACS vintages.
pub const GROWTH_PERIOD_YEARS: u32 = 5;

/// Near-term projection horizon, in years past the current survey year.
pub const NEAR_TERM_YEARS: u32 = 3;

/// Long-term projection horizon, in years past the current survey year.
pub const LONG_TERM_YEARS: u32 = 8;

/// A value extrapolated to the near-term and long-term horizons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection<T> {
    /// Value [`NEAR_TERM_YEARS`] after the current survey year.
    pub near_term: T,
    /// Value [`LONG_TERM_YEARS`] after the current survey year.
    pub long_term: T,
}

/// Share of occupied housing units that are renter vs owner occupied.
///
/// Units in other tenure categories are in neither share, so the two can
/// sum to less than 100.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenureSplit {
    /// Renter-occupied percentage (0-100).
    pub renter_pct: f64,
    /// Owner-occupied percentage (0-100).
    pub owner_pct: f64,
}

impl TenureSplit {
    /// Renter share as a one-decimal percentage, e.g. `"41.3%"`.
    #[must_use]
    pub fn renter_label(&self) -> String {
        format!("{:.1}%", self.renter_pct)
    }

    /// Owner share as a one-decimal percentage, e.g. `"58.7%"`.
    #[must_use]
    pub fn owner_label(&self) -> String {
        format!("{:.1}%", self.owner_pct)
    }
}

impl std::fmt::Display for TenureSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {}", self.renter_label(), self.owner_label())
    }
}

/// Population count for one age cohort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeCohort {
    /// Cohort label (e.g. "20-34").
    pub label: String,
    /// Estimated persons in the cohort.
    pub count: u64,
}

/// Aggregated demographics for all tracts within one radius of the site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiusSummary {
    /// Band boundary in miles (inclusive).
    pub radius_miles: f64,
    /// Number of tracts whose internal point is within the radius.
    pub tract_count: usize,
    /// Total population in the current survey year.
    pub population: u64,
    /// Household-weighted median household income.
    pub median_income: f64,
    /// Household-weighted median home value.
    pub median_home_value: f64,
    /// Household-weighted median year structures were built.
    pub median_year_built: f64,
    /// Renter vs owner occupancy.
    pub tenure: TenureSplit,
    /// Aggregate vehicles divided by households.
    pub vehicles_per_household: f64,
    /// Household-weighted average household size.
    pub avg_household_size: f64,
    /// Compound annual population growth rate.
    pub population_growth_rate: f64,
    /// Compound annual growth rate of the weighted median income.
    pub income_growth_rate: f64,
    /// Projected population.
    pub projected_population: Projection<u64>,
    /// Projected weighted median income.
    pub projected_income: Projection<f64>,
    /// Population by age cohort; only populated for the smallest radius.
    pub age_distribution: Vec<AgeCohort>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenure_labels_use_one_decimal() {
        let split = TenureSplit {
            renter_pct: 41.26,
            owner_pct: 55.0,
        };
        assert_eq!(split.renter_label(), "41.3%");
        assert_eq!(split.owner_label(), "55.0%");
        assert_eq!(split.to_string(), "41.3% / 55.0%");
    }

    #[test]
    fn projection_serializes_camel_case() {
        let projection = Projection {
            near_term: 10u64,
            long_term: 12,
        };
        let json = serde_json::to_value(projection).unwrap();
        assert_eq!(json, serde_json::json!({ "nearTerm": 10, "longTerm": 12 }));
    }
}
