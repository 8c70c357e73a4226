#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! American Community Survey variable and record types.
//!
//! Defines the fixed set of ACS 5-year detailed-table variables the site
//! analysis needs, and the per-tract record produced for a survey year.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Value the Census API uses for "estimate not available" and similar
/// annotations. Any non-positive value is treated as absent.
pub const UNAVAILABLE_SENTINEL: i64 = -666_666_666;

/// An ACS 5-year detailed-table estimate requested for every tract.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum AcsVariable {
    /// Total population.
    #[strum(serialize = "B01003_001E")]
    #[serde(rename = "B01003_001E")]
    Population,
    /// Number of households.
    #[strum(serialize = "B11001_001E")]
    #[serde(rename = "B11001_001E")]
    Households,
    /// Median household income (dollars).
    #[strum(serialize = "B19013_001E")]
    #[serde(rename = "B19013_001E")]
    MedianHouseholdIncome,
    /// Median value of owner-occupied housing units (dollars).
    #[strum(serialize = "B25077_001E")]
    #[serde(rename = "B25077_001E")]
    MedianHomeValue,
    /// Median year structure built.
    #[strum(serialize = "B25035_001E")]
    #[serde(rename = "B25035_001E")]
    MedianYearBuilt,
    /// Average household size of occupied housing units.
    #[strum(serialize = "B25010_001E")]
    #[serde(rename = "B25010_001E")]
    AverageHouseholdSize,
    /// Occupied housing units (tenure universe).
    #[strum(serialize = "B25003_001E")]
    #[serde(rename = "B25003_001E")]
    TenureTotal,
    /// Owner-occupied housing units.
    #[strum(serialize = "B25003_002E")]
    #[serde(rename = "B25003_002E")]
    OwnerOccupied,
    /// Renter-occupied housing units.
    #[strum(serialize = "B25003_003E")]
    #[serde(rename = "B25003_003E")]
    RenterOccupied,
    /// Aggregate number of vehicles available.
    #[strum(serialize = "B25046_001E")]
    #[serde(rename = "B25046_001E")]
    AggregateVehicles,
}

impl AcsVariable {
    /// Returns every variable in request order.
    #[must_use]
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Comma-separated variable codes for the `get=` query parameter.
    #[must_use]
    pub fn query_list() -> String {
        Self::iter()
            .map(|v| v.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Human-readable label for logs and table output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Population => "Population",
            Self::Households => "Households",
            Self::MedianHouseholdIncome => "Median household income",
            Self::MedianHomeValue => "Median home value",
            Self::MedianYearBuilt => "Median year built",
            Self::AverageHouseholdSize => "Average household size",
            Self::TenureTotal => "Occupied units",
            Self::OwnerOccupied => "Owner occupied",
            Self::RenterOccupied => "Renter occupied",
            Self::AggregateVehicles => "Aggregate vehicles",
        }
    }
}

/// Raw ACS estimates for one tract in one survey year.
///
/// Values are kept as the strings the API returned; callers decide how to
/// treat non-numeric and sentinel values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicRecord {
    /// Census tract GEOID.
    pub geoid: String,
    /// ACS 5-year vintage (e.g. 2022 for 2018-2022 estimates).
    pub survey_year: u16,
    /// Raw value per variable.
    pub values: BTreeMap<AcsVariable, String>,
}

impl DemographicRecord {
    /// Returns the raw string value of `variable`, if present.
    #[must_use]
    pub fn raw(&self, variable: AcsVariable) -> Option<&str> {
        self.values.get(&variable).map(String::as_str)
    }

    /// Returns `variable` as a strictly positive number.
    ///
    /// Missing, unparseable, zero, negative and sentinel values all yield
    /// `None`.
    #[must_use]
    pub fn positive(&self, variable: AcsVariable) -> Option<f64> {
        self.raw(variable)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v > 0.0)
    }

    /// Variables the API reported as [`UNAVAILABLE_SENTINEL`].
    #[must_use]
    pub fn unavailable(&self) -> Vec<AcsVariable> {
        AcsVariable::all()
            .into_iter()
            .filter(|v| {
                self.raw(*v)
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    == Some(UNAVAILABLE_SENTINEL)
            })
            .collect()
    }
}

/// All records for one survey year, keyed by GEOID.
pub type DemographicTable = BTreeMap<String, DemographicRecord>;

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(AcsVariable, &str)]) -> DemographicRecord {
        DemographicRecord {
            geoid: "11001000100".to_string(),
            survey_year: 2022,
            values: pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect(),
        }
    }

    #[test]
    fn codes_roundtrip() {
        for var in AcsVariable::all() {
            let code = var.to_string();
            assert_eq!(code.parse::<AcsVariable>().unwrap(), var);
        }
        assert_eq!(
            "B19013_001E".parse::<AcsVariable>().unwrap(),
            AcsVariable::MedianHouseholdIncome
        );
        assert!("NAME".parse::<AcsVariable>().is_err());
    }

    #[test]
    fn query_list_has_every_code() {
        let list = AcsVariable::query_list();
        assert_eq!(list.split(',').count(), 10);
        assert!(list.starts_with("B01003_001E,"));
        assert!(list.ends_with("B25046_001E"));
    }

    #[test]
    fn positive_rejects_sentinels_and_non_numbers() {
        let r = record(&[
            (AcsVariable::Population, "1200"),
            (AcsVariable::MedianHouseholdIncome, "-666666666"),
            (AcsVariable::MedianHomeValue, "0"),
            (AcsVariable::MedianYearBuilt, "null"),
        ]);
        assert_eq!(r.positive(AcsVariable::Population), Some(1200.0));
        assert_eq!(r.positive(AcsVariable::MedianHouseholdIncome), None);
        assert_eq!(r.positive(AcsVariable::MedianHomeValue), None);
        assert_eq!(r.positive(AcsVariable::MedianYearBuilt), None);
        assert_eq!(r.positive(AcsVariable::Households), None);
        assert_eq!(r.raw(AcsVariable::MedianHouseholdIncome), Some("-666666666"));
    }

    #[test]
    fn lists_unavailable_variables() {
        let r = record(&[
            (AcsVariable::Population, "1200"),
            (AcsVariable::MedianHouseholdIncome, "-666666666"),
            (AcsVariable::TenureTotal, " -666666666"),
            (AcsVariable::MedianHomeValue, "0"),
        ]);
        assert_eq!(
            r.unavailable(),
            vec![AcsVariable::MedianHouseholdIncome, AcsVariable::TenureTotal]
        );
        assert!(record(&[]).unavailable().is_empty());
    }
}
