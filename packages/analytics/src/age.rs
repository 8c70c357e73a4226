//! Age cohort breakdown for the innermost radius.
//!
//! The breakdown is a fixed proportional split of total population, not an
//! aggregation of the ACS age-bracket tables.
// TODO: aggregate B01001 sex-by-age brackets per tract and drop the fixed shares.

use site_engine_analytics_models::AgeCohort;

use crate::stats::round_count;

/// Cohort labels and their share of total population.
pub const AGE_COHORT_SHARES: [(&str, f64); 5] = [
    ("Under 20", 0.22),
    ("20-34", 0.25),
    ("35-49", 0.20),
    ("50-64", 0.18),
    ("65+", 0.15),
];

/// Splits `population` into the fixed cohorts, rounding each count.
#[must_use]
pub fn age_distribution(population: f64) -> Vec<AgeCohort> {
    AGE_COHORT_SHARES
        .iter()
        .map(|(label, share)| AgeCohort {
            label: (*label).to_string(),
            count: round_count(population * share),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_cover_the_whole_population() {
        let total: f64 = AGE_COHORT_SHARES.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn splits_in_order() {
        let cohorts = age_distribution(3000.0);
        let counts: Vec<u64> = cohorts.iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![660, 750, 600, 540, 450]);
        assert_eq!(cohorts[0].label, "Under 20");
        assert_eq!(cohorts[4].label, "65+");
    }

    #[test]
    fn zero_population_gives_zero_cohorts() {
        assert!(age_distribution(0.0).iter().all(|c| c.count == 0));
    }
}
