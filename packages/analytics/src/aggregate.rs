//! Per-radius rollups.
//!
//! Each radius selects the tracts whose internal point lies within it,
//! collects their current and baseline records (a tract missing from a
//! year is simply left out of that year) and computes the summary.

use site_engine_analytics_models::{
    DEFAULT_INCOME_GROWTH_RATE, DEFAULT_POPULATION_GROWTH_RATE, LONG_TERM_YEARS, NEAR_TERM_YEARS,
    Projection, RadiusSummary, TenureSplit,
};
use site_engine_census_models::{AcsVariable, DemographicRecord, DemographicTable};
use site_engine_geography_models::Tract;

use crate::AnalyticsError;
use crate::age::age_distribution;
use crate::stats::{
    growth_rate, project, ratio, ratio_or_raw, round_count, sum_clean, weighted_average,
};

/// Validates radii, then sorts ascending and removes duplicates.
///
/// # Errors
///
/// Returns [`AnalyticsError::NoRadii`] for an empty list and
/// [`AnalyticsError::InvalidRadius`] for any non-finite or non-positive
/// radius.
pub fn normalize_radii(radii: &[f64]) -> Result<Vec<f64>, AnalyticsError> {
    if radii.is_empty() {
        return Err(AnalyticsError::NoRadii);
    }

    if let Some(&value) = radii.iter().find(|r| !r.is_finite() || **r <= 0.0) {
        return Err(AnalyticsError::InvalidRadius { value });
    }

    let mut sorted = radii.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();

    Ok(sorted)
}

/// Tracts within `radius_miles` of the site.
#[must_use]
pub fn tracts_within(tracts: &[Tract], radius_miles: f64) -> Vec<&Tract> {
    tracts
        .iter()
        .filter(|t| t.distance_miles <= radius_miles)
        .collect()
}

/// Looks up the record of each member tract, skipping tracts without one.
fn member_records<'a>(members: &[&Tract], table: &'a DemographicTable) -> Vec<&'a DemographicRecord> {
    members
        .iter()
        .filter_map(|t| table.get(&t.geoid))
        .collect()
}

/// Renter and owner shares over the records that report a tenure total,
/// so numerators and denominator cover the same tracts.
fn tenure_split(records: &[&DemographicRecord]) -> TenureSplit {
    let reporting: Vec<&DemographicRecord> = records
        .iter()
        .copied()
        .filter(|r| r.positive(AcsVariable::TenureTotal).is_some())
        .collect();
    let total = sum_clean(&reporting, AcsVariable::TenureTotal);

    TenureSplit {
        renter_pct: ratio(sum_clean(&reporting, AcsVariable::RenterOccupied), total) * 100.0,
        owner_pct: ratio(sum_clean(&reporting, AcsVariable::OwnerOccupied), total) * 100.0,
    }
}

/// Builds the summary for a single radius.
#[must_use]
pub fn summarize_radius(
    radius_miles: f64,
    tracts: &[Tract],
    current: &DemographicTable,
    baseline: &DemographicTable,
    include_age_distribution: bool,
) -> RadiusSummary {
    let members = tracts_within(tracts, radius_miles);
    let now = member_records(&members, current);
    let then = member_records(&members, baseline);

    let population = sum_clean(&now, AcsVariable::Population);
    let baseline_population = sum_clean(&then, AcsVariable::Population);
    let population_growth_rate =
        growth_rate(population, baseline_population, DEFAULT_POPULATION_GROWTH_RATE);

    let income = weighted_average(&now, AcsVariable::MedianHouseholdIncome, AcsVariable::Households);
    let baseline_income =
        weighted_average(&then, AcsVariable::MedianHouseholdIncome, AcsVariable::Households);
    let income_growth_rate = growth_rate(income, baseline_income, DEFAULT_INCOME_GROWTH_RATE);

    let households = sum_clean(&now, AcsVariable::Households);
    let tenure = tenure_split(&now);

    let summary = RadiusSummary {
        radius_miles,
        tract_count: members.len(),
        population: round_count(population),
        median_income: income,
        median_home_value: weighted_average(&now, AcsVariable::MedianHomeValue, AcsVariable::Households),
        median_year_built: weighted_average(&now, AcsVariable::MedianYearBuilt, AcsVariable::Households),
        tenure,
        vehicles_per_household: ratio_or_raw(sum_clean(&now, AcsVariable::AggregateVehicles), households),
        avg_household_size: weighted_average(
            &now,
            AcsVariable::AverageHouseholdSize,
            AcsVariable::Households,
        ),
        population_growth_rate,
        income_growth_rate,
        projected_population: Projection {
            near_term: round_count(project(population, population_growth_rate, NEAR_TERM_YEARS)),
            long_term: round_count(project(population, population_growth_rate, LONG_TERM_YEARS)),
        },
        projected_income: Projection {
            near_term: project(income, income_growth_rate, NEAR_TERM_YEARS),
            long_term: project(income, income_growth_rate, LONG_TERM_YEARS),
        },
        age_distribution: if include_age_distribution {
            age_distribution(population)
        } else {
            Vec::new()
        },
    };

    log::debug!(
        "{radius_miles} mi: {} tracts ({} current / {} baseline records), population {}",
        summary.tract_count,
        now.len(),
        then.len(),
        summary.population
    );

    summary
}

/// Builds one summary per distinct radius, in ascending radius order.
///
/// Only the smallest radius carries an age distribution. Zero tracts
/// produce zero-valued summaries rather than an error.
///
/// # Errors
///
/// Returns [`AnalyticsError`] if the radius list is empty or contains an
/// invalid radius.
pub fn aggregate_radii(
    radii: &[f64],
    tracts: &[Tract],
    current: &DemographicTable,
    baseline: &DemographicTable,
) -> Result<Vec<RadiusSummary>, AnalyticsError> {
    let radii = normalize_radii(radii)?;

    Ok(radii
        .iter()
        .enumerate()
        .map(|(i, &radius)| summarize_radius(radius, tracts, current, baseline, i == 0))
        .collect())
}

#[cfg(test)]
mod tests {
    use site_engine_geography_models::GeoPoint;

    use super::*;

    fn tract(code: &str, distance_miles: f64) -> Tract {
        Tract {
            geoid: Tract::compose_geoid("11", "001", code),
            state_fips: "11".to_string(),
            county_fips: "001".to_string(),
            tract_code: code.to_string(),
            centroid: GeoPoint::new(0.0, 0.0),
            distance_miles,
            geometry: None,
        }
    }

    fn insert(table: &mut DemographicTable, code: &str, year: u16, pairs: &[(AcsVariable, &str)]) {
        let geoid = Tract::compose_geoid("11", "001", code);
        table.insert(
            geoid.clone(),
            DemographicRecord {
                geoid,
                survey_year: year,
                values: pairs.iter().map(|(k, v)| (*k, (*v).to_string())).collect(),
            },
        );
    }

    /// Two tracts within a mile and one between 3 and 5 miles.
    fn scenario() -> (Vec<Tract>, DemographicTable, DemographicTable) {
        let tracts = vec![tract("000100", 0.4), tract("000200", 0.9), tract("000300", 4.2)];

        let mut current = DemographicTable::new();
        insert(
            &mut current,
            "000100",
            2022,
            &[
                (AcsVariable::Population, "1000"),
                (AcsVariable::MedianHouseholdIncome, "50000"),
                (AcsVariable::Households, "400"),
                (AcsVariable::TenureTotal, "400"),
                (AcsVariable::RenterOccupied, "100"),
                (AcsVariable::OwnerOccupied, "280"),
                (AcsVariable::AggregateVehicles, "600"),
            ],
        );
        insert(
            &mut current,
            "000200",
            2022,
            &[
                (AcsVariable::Population, "2000"),
                (AcsVariable::MedianHouseholdIncome, "60000"),
                (AcsVariable::Households, "600"),
                (AcsVariable::TenureTotal, "600"),
                (AcsVariable::RenterOccupied, "300"),
                (AcsVariable::OwnerOccupied, "300"),
                (AcsVariable::AggregateVehicles, "900"),
            ],
        );
        insert(
            &mut current,
            "000300",
            2022,
            &[
                (AcsVariable::Population, "4000"),
                (AcsVariable::MedianHouseholdIncome, "-666666666"),
                (AcsVariable::Households, "1500"),
            ],
        );

        let mut baseline = DemographicTable::new();
        insert(&mut baseline, "000100", 2017, &[(AcsVariable::Population, "900")]);
        insert(&mut baseline, "000200", 2017, &[(AcsVariable::Population, "1800")]);

        (tracts, current, baseline)
    }

    #[test]
    fn normalizes_radii() {
        assert_eq!(normalize_radii(&[5.0, 1.0, 3.0, 1.0]).unwrap(), vec![1.0, 3.0, 5.0]);
        assert!(matches!(normalize_radii(&[]), Err(AnalyticsError::NoRadii)));
        assert!(matches!(
            normalize_radii(&[1.0, -2.0]),
            Err(AnalyticsError::InvalidRadius { .. })
        ));
        assert!(matches!(
            normalize_radii(&[f64::NAN]),
            Err(AnalyticsError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn end_to_end_scenario() {
        let (tracts, current, baseline) = scenario();
        let summaries = aggregate_radii(&[1.0, 3.0, 5.0], &tracts, &current, &baseline).unwrap();

        assert_eq!(summaries.len(), 3);

        let one = &summaries[0];
        assert_eq!(one.tract_count, 2);
        assert_eq!(one.population, 3000);
        assert!((one.median_income - 56_000.0).abs() < 1e-6);
        assert_eq!(one.age_distribution.len(), 5);

        let three = &summaries[1];
        assert_eq!(three.population, 3000);
        assert!(three.age_distribution.is_empty());

        let five = &summaries[2];
        assert_eq!(five.tract_count, 3);
        assert_eq!(five.population, 7000);
        // The far tract has households but a sentinel income; it must not
        // drag the weighted average.
        assert!((five.median_income - 56_000.0).abs() < 1e-6);
        assert!(five.age_distribution.is_empty());
    }

    #[test]
    fn output_is_sorted_and_deduplicated() {
        let (tracts, current, baseline) = scenario();
        let summaries =
            aggregate_radii(&[5.0, 1.0, 5.0, 3.0, 1.0], &tracts, &current, &baseline).unwrap();
        let radii: Vec<f64> = summaries.iter().map(|s| s.radius_miles).collect();
        assert_eq!(radii, vec![1.0, 3.0, 5.0]);
        assert_eq!(summaries[0].age_distribution.len(), 5);
    }

    #[test]
    fn membership_is_monotonic() {
        let (tracts, _, _) = scenario();
        let radii = [0.5, 1.0, 3.0, 5.0, 10.0];
        for pair in radii.windows(2) {
            let smaller: Vec<&str> = tracts_within(&tracts, pair[0])
                .into_iter()
                .map(|t| t.geoid.as_str())
                .collect();
            let larger: Vec<&str> = tracts_within(&tracts, pair[1])
                .into_iter()
                .map(|t| t.geoid.as_str())
                .collect();
            assert!(smaller.iter().all(|id| larger.contains(id)));
        }
    }

    #[test]
    fn population_growth_and_projections() {
        let (tracts, current, baseline) = scenario();
        let one = summarize_radius(1.0, &tracts, &current, &baseline, true);

        let expected_rate = (3000.0_f64 / 2700.0).powf(0.2) - 1.0;
        assert!((one.population_growth_rate - expected_rate).abs() < 1e-12);
        assert_eq!(
            one.projected_population.near_term,
            round_count(3000.0 * (1.0 + expected_rate).powi(3))
        );
        assert_eq!(
            one.projected_population.long_term,
            round_count(3000.0 * (1.0 + expected_rate).powi(8))
        );

        // No baseline income: falls back to the current value.
        assert!(one.income_growth_rate.abs() < f64::EPSILON);
        assert!((one.projected_income.long_term - 56_000.0).abs() < 1e-6);
    }

    #[test]
    fn derived_ratios() {
        let (tracts, current, baseline) = scenario();
        let one = summarize_radius(1.0, &tracts, &current, &baseline, true);

        assert!((one.tenure.renter_pct - 40.0).abs() < 1e-9);
        assert!((one.tenure.owner_pct - 58.0).abs() < 1e-9);
        assert!(one.tenure.renter_pct + one.tenure.owner_pct <= 100.0);
        assert!((one.vehicles_per_household - 1.5).abs() < 1e-9);
    }

    #[test]
    fn tenure_ignores_tracts_without_a_tenure_total() {
        let tracts = vec![tract("000100", 0.5), tract("000200", 0.8)];
        let mut current = DemographicTable::new();
        insert(
            &mut current,
            "000100",
            2022,
            &[
                (AcsVariable::TenureTotal, "-666666666"),
                (AcsVariable::RenterOccupied, "300"),
                (AcsVariable::OwnerOccupied, "100"),
            ],
        );
        let baseline = DemographicTable::new();

        let only_sentinel = summarize_radius(1.0, &tracts[..1], &current, &baseline, false);
        assert!(only_sentinel.tenure.renter_pct.abs() < f64::EPSILON);
        assert!(only_sentinel.tenure.owner_pct.abs() < f64::EPSILON);

        insert(
            &mut current,
            "000200",
            2022,
            &[
                (AcsVariable::TenureTotal, "200"),
                (AcsVariable::RenterOccupied, "50"),
                (AcsVariable::OwnerOccupied, "150"),
            ],
        );
        let mixed = summarize_radius(1.0, &tracts, &current, &baseline, false);
        assert!((mixed.tenure.renter_pct - 25.0).abs() < 1e-9);
        assert!((mixed.tenure.owner_pct - 75.0).abs() < 1e-9);
        assert!(mixed.tenure.renter_pct + mixed.tenure.owner_pct <= 100.0 + 1e-9);
    }

    #[test]
    fn current_year_gap_is_reported_as_decline() {
        let tracts = vec![tract("000100", 0.5)];
        let current = DemographicTable::new();
        let mut baseline = DemographicTable::new();
        insert(&mut baseline, "000100", 2017, &[(AcsVariable::Population, "900")]);

        let one = summarize_radius(1.0, &tracts, &current, &baseline, false);
        assert!((one.population_growth_rate + 1.0).abs() < f64::EPSILON);
        assert_eq!(one.projected_population.long_term, 0);
    }

    #[test]
    fn zero_tracts_give_zero_summaries() {
        let empty = DemographicTable::new();
        let summaries = aggregate_radii(&[1.0, 3.0], &[], &empty, &empty).unwrap();
        assert_eq!(summaries.len(), 2);

        let s = &summaries[0];
        assert_eq!(s.population, 0);
        assert_eq!(s.tract_count, 0);
        assert!(s.median_income.abs() < f64::EPSILON);
        assert!(s.tenure.renter_pct.abs() < f64::EPSILON);
        assert!(s.vehicles_per_household.abs() < f64::EPSILON);
        assert!((s.population_growth_rate - DEFAULT_POPULATION_GROWTH_RATE).abs() < f64::EPSILON);
        assert!((s.income_growth_rate - DEFAULT_INCOME_GROWTH_RATE).abs() < f64::EPSILON);
        assert_eq!(s.projected_population.long_term, 0);
        assert!(s.age_distribution.iter().all(|c| c.count == 0));
    }

    #[test]
    fn tracts_missing_from_a_year_are_excluded_not_zeroed() {
        let (tracts, current, mut baseline) = scenario();
        baseline.remove(&Tract::compose_geoid("11", "001", "000200"));

        let one = summarize_radius(1.0, &tracts, &current, &baseline, false);
        // Baseline is now only tract 000100 (900) against 3000 current.
        let expected_rate = (3000.0_f64 / 900.0).powf(0.2) - 1.0;
        assert!((one.population_growth_rate - expected_rate).abs() < 1e-12);
        assert_eq!(one.population, 3000);
    }
}
