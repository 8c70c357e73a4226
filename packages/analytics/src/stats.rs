//! Cleaning, weighting and growth primitives.
//!
//! ACS estimates use large negative sentinels for "not available", and a
//! zero tract says nothing useful about a median. Every primitive here
//! therefore treats non-positive values as absent rather than as numbers.

use site_engine_analytics_models::GROWTH_PERIOD_YEARS;
use site_engine_census_models::{AcsVariable, DemographicRecord};

/// Sums the strictly positive values of `variable` across `records`.
#[must_use]
pub fn sum_clean(records: &[&DemographicRecord], variable: AcsVariable) -> f64 {
    records
        .iter()
        .filter_map(|r| r.positive(variable))
        .sum()
}

/// Average of `value` weighted by `weight`, over records where both are
/// strictly positive.
///
/// Returns 0 when no record carries weight.
#[must_use]
pub fn weighted_average(
    records: &[&DemographicRecord],
    value: AcsVariable,
    weight: AcsVariable,
) -> f64 {
    let (weighted_sum, total_weight) = records
        .iter()
        .filter_map(|r| Some((r.positive(value)?, r.positive(weight)?)))
        .fold((0.0, 0.0), |(sum, total), (v, w)| (v.mul_add(w, sum), total + w));

    if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
#[must_use]
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// `numerator / denominator`, dividing by 1 when the denominator is 0.
#[must_use]
pub fn ratio_or_raw(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        numerator
    }
}

/// Compound annual growth rate between the baseline and current values
/// over [`GROWTH_PERIOD_YEARS`].
///
/// A missing baseline falls back to the current value, giving a rate of 0.
/// `default_rate` applies only when both values are missing. A baseline
/// with no current value yields -1.
#[must_use]
pub fn growth_rate(current: f64, baseline: f64, default_rate: f64) -> f64 {
    let baseline = if baseline > 0.0 { baseline } else { current };
    if baseline <= 0.0 {
        return default_rate;
    }

    (current.max(0.0) / baseline).powf(1.0 / f64::from(GROWTH_PERIOD_YEARS)) - 1.0
}

/// Extrapolates `value` forward `years` years at `annual_rate`.
#[must_use]
pub fn project(value: f64, annual_rate: f64, years: u32) -> f64 {
    #[allow(clippy::cast_possible_wrap)]
    let exponent = years as i32;
    value * (1.0 + annual_rate).powi(exponent)
}

/// Rounds a non-negative estimate to a whole count.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use site_engine_analytics_models::{DEFAULT_INCOME_GROWTH_RATE, DEFAULT_POPULATION_GROWTH_RATE};

    use super::*;

    fn record(pairs: &[(AcsVariable, &str)]) -> DemographicRecord {
        DemographicRecord {
            geoid: "11001000100".to_string(),
            survey_year: 2022,
            values: pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect(),
        }
    }

    #[test]
    fn sum_clean_ignores_sentinels() {
        let a = record(&[(AcsVariable::Population, "-666666666")]);
        let b = record(&[(AcsVariable::Population, "100")]);
        assert!((sum_clean(&[&a, &b], AcsVariable::Population) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sum_clean_ignores_zero_missing_and_garbage() {
        let a = record(&[(AcsVariable::Population, "0")]);
        let b = record(&[]);
        let c = record(&[(AcsVariable::Population, "N/A")]);
        let d = record(&[(AcsVariable::Population, "42")]);
        assert!((sum_clean(&[&a, &b, &c, &d], AcsVariable::Population) - 42.0).abs() < f64::EPSILON);
        assert!(sum_clean(&[], AcsVariable::Population).abs() < f64::EPSILON);
    }

    #[test]
    fn weighted_average_of_nothing_is_zero() {
        let avg = weighted_average(&[], AcsVariable::MedianHouseholdIncome, AcsVariable::Households);
        assert!(avg.abs() < f64::EPSILON);
        assert!(!avg.is_nan());
    }

    #[test]
    fn weighted_average_skips_unweighted_and_sentinel_values() {
        let a = record(&[
            (AcsVariable::MedianHouseholdIncome, "50000"),
            (AcsVariable::Households, "400"),
        ]);
        let b = record(&[
            (AcsVariable::MedianHouseholdIncome, "60000"),
            (AcsVariable::Households, "600"),
        ]);
        let sentinel = record(&[
            (AcsVariable::MedianHouseholdIncome, "-666666666"),
            (AcsVariable::Households, "5000"),
        ]);
        let no_households = record(&[
            (AcsVariable::MedianHouseholdIncome, "1000000"),
            (AcsVariable::Households, "0"),
        ]);

        let avg = weighted_average(
            &[&a, &b, &sentinel, &no_households],
            AcsVariable::MedianHouseholdIncome,
            AcsVariable::Households,
        );
        assert!((avg - 56_000.0).abs() < 1e-6);
    }

    #[test]
    fn growth_rate_is_compound_annual() {
        let rate = growth_rate(110.0, 100.0, DEFAULT_POPULATION_GROWTH_RATE);
        assert!((rate - 0.019_245).abs() < 1e-5, "got {rate}");
    }

    #[test]
    fn missing_baseline_means_no_growth() {
        assert!(growth_rate(500.0, 0.0, DEFAULT_POPULATION_GROWTH_RATE).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_both_uses_default() {
        assert!(
            (growth_rate(0.0, 0.0, DEFAULT_POPULATION_GROWTH_RATE) - 0.012).abs() < f64::EPSILON
        );
        assert!((growth_rate(0.0, 0.0, DEFAULT_INCOME_GROWTH_RATE) - 0.024).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_current_with_baseline_is_total_decline() {
        let rate = growth_rate(0.0, 1000.0, DEFAULT_POPULATION_GROWTH_RATE);
        assert!((rate + 1.0).abs() < f64::EPSILON, "got {rate}");
        let rate = growth_rate(0.0, 56_000.0, DEFAULT_INCOME_GROWTH_RATE);
        assert!((rate + 1.0).abs() < f64::EPSILON, "got {rate}");
    }

    #[test]
    fn projects_compound_growth() {
        assert!((project(1000.0, 0.1, 2) - 1210.0).abs() < 1e-9);
        assert!((project(1000.0, 0.0, 8) - 1000.0).abs() < 1e-9);
        assert!((project(1000.0, 0.05, 0) - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn ratio_is_zero_without_denominator() {
        assert!((ratio(30.0, 120.0) - 0.25).abs() < f64::EPSILON);
        assert!(ratio(30.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_divides_by_one_without_denominator() {
        assert!((ratio_or_raw(30.0, 10.0) - 3.0).abs() < f64::EPSILON);
        assert!((ratio_or_raw(30.0, 0.0) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rounds_counts() {
        assert_eq!(round_count(2.5), 3);
        assert_eq!(round_count(-4.0), 0);
        assert_eq!(round_count(f64::NAN), 0);
    }
}
