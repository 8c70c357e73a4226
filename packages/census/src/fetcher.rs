//! Batched, partial-failure tolerant demographic fetches.

use std::collections::BTreeSet;
use std::time::Duration;

use futures::future::join_all;
use site_engine_census_models::DemographicTable;
use site_engine_geography_models::{CountyKey, Tract};

use crate::CensusError;
use crate::client::DemographicService;
use crate::table::parse_acs_table;

/// Result of fetching one survey year.
#[derive(Debug, Clone, Default)]
pub struct DemographicFetch {
    /// Survey year the records belong to.
    pub survey_year: u16,
    /// Records for every tract in every successfully fetched county.
    pub table: DemographicTable,
    /// Counties that failed or timed out and contributed nothing.
    pub failed_counties: Vec<CountyKey>,
}

/// Distinct `(state, county)` pairs covering `tracts`, in sorted order.
#[must_use]
pub fn distinct_counties(tracts: &[Tract]) -> Vec<CountyKey> {
    tracts
        .iter()
        .map(Tract::county_key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fetches one county, bounding the call with `timeout`.
async fn fetch_county_with_timeout(
    service: &dyn DemographicService,
    county: &CountyKey,
    survey_year: u16,
    timeout: Duration,
) -> Result<DemographicTable, CensusError> {
    let rows = tokio::time::timeout(timeout, service.fetch_county(county, survey_year))
        .await
        .map_err(|_| CensusError::Timeout {
            seconds: timeout.as_secs(),
        })??;

    Ok(parse_acs_table(&rows, survey_year))
}

/// Fetches ACS records for every county touched by `tracts`.
///
/// Counties are requested concurrently. A county that errors or exceeds
/// `timeout` is logged and skipped; the others still contribute.
pub async fn fetch_demographics(
    service: &dyn DemographicService,
    tracts: &[Tract],
    survey_year: u16,
    timeout: Duration,
) -> DemographicFetch {
    let counties = distinct_counties(tracts);

    if counties.is_empty() {
        return DemographicFetch {
            survey_year,
            ..DemographicFetch::default()
        };
    }

    log::info!(
        "Fetching ACS {survey_year} estimates for {} counties...",
        counties.len()
    );

    let results = join_all(
        counties
            .iter()
            .map(|county| fetch_county_with_timeout(service, county, survey_year, timeout)),
    )
    .await;

    let mut table = DemographicTable::new();
    let mut failed_counties = Vec::new();

    for (county, result) in counties.into_iter().zip(results) {
        match result {
            Ok(county_table) => {
                let unavailable: usize = county_table
                    .values()
                    .map(|r| r.unavailable().len())
                    .sum();
                log::debug!(
                    "ACS {survey_year}: county {county} returned {} tracts ({unavailable} unavailable estimates)",
                    county_table.len()
                );
                table.extend(county_table);
            }
            Err(e) => {
                log::warn!("ACS {survey_year}: county {county} failed, skipping: {e}");
                failed_counties.push(county);
            }
        }
    }

    log::info!(
        "ACS {survey_year}: {} tract records loaded ({} counties failed)",
        table.len(),
        failed_counties.len()
    );

    DemographicFetch {
        survey_year,
        table,
        failed_counties,
    }
}
