#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! End-to-end site analysis.
//!
//! Wires the stages together: geocode the address, resolve the census
//! tracts around it, fetch two ACS survey years concurrently and aggregate
//! them per radius. The safety narrative runs alongside the tract and
//! demographic stages and never blocks or fails them.
//!
//! External services sit behind traits ([`Services`]) so the pipeline can
//! run against in-memory fakes.

pub mod config;
pub mod events;
pub mod session;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use site_engine_ai::intel::{IntelReport, fetch_safety_intel};
use site_engine_ai::providers::{LlmProvider, create_provider_from_env};
use site_engine_analytics::aggregate::{aggregate_radii, normalize_radii};
use site_engine_analytics_models::RadiusSummary;
use site_engine_census::CensusError;
use site_engine_census::client::{AcsClient, DemographicService};
use site_engine_census::fetcher::{DemographicFetch, fetch_demographics};
use site_engine_geocoder::chain::ChainGeocoder;
use site_engine_geocoder::{GeocodeError, Geocoder, GeocodingProvider};
use site_engine_geography::GeoError;
use site_engine_geography::resolver::resolve_tracts;
use site_engine_geography::tigerweb::{TigerWebClient, TractBoundaryService};
use site_engine_geography_models::{GeoPoint, Tract};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::{AnalysisConfig, ConfigError};
use crate::events::{AnalysisEvent, emit};
use crate::session::{AnalysisSession, RunTicket};

/// Shortest address accepted for analysis, in characters.
pub const MIN_ADDRESS_LEN: usize = 5;

/// Errors that abort an analysis.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The address is too short to geocode meaningfully.
    #[error("Address must be at least {min_len} characters")]
    AddressTooShort {
        /// Minimum length.
        min_len: usize,
    },

    /// The requested radii are empty or invalid.
    #[error("Invalid radii: {message}")]
    InvalidRadius {
        /// What was wrong.
        message: String,
    },

    /// No provider could locate the address.
    #[error("Location not found: {address}")]
    LocationNotFound {
        /// Address as submitted.
        address: String,
    },

    /// Geocoding failed outright.
    #[error("Geocoding failed: {0}")]
    Geocode(#[from] GeocodeError),

    /// Geocoding did not finish in time.
    #[error("Geocoding timed out after {seconds}s")]
    GeocodeTimeout {
        /// Timeout that elapsed.
        seconds: u64,
    },

    /// A newer run started; this run's result was dropped.
    #[error("Superseded by a newer analysis")]
    Superseded,

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A tract boundary client could not be built.
    #[error("Tract service setup failed: {0}")]
    Geo(#[from] GeoError),

    /// A demographic client could not be built.
    #[error("Demographic service setup failed: {0}")]
    Census(#[from] CensusError),
}

/// One analysis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Free-form street address.
    pub address: String,
    /// Radii in miles; the configured defaults when `None`.
    #[serde(default)]
    pub radii: Option<Vec<f64>>,
}

impl AnalysisRequest {
    /// Request for `address` with the default radii.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            radii: None,
        }
    }

    /// Overrides the radii.
    #[must_use]
    pub fn with_radii(mut self, radii: Vec<f64>) -> Self {
        self.radii = Some(radii);
        self
    }
}

/// ACS vintages compared by a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyYears {
    /// Current vintage.
    pub current: u16,
    /// Baseline vintage.
    pub baseline: u16,
}

/// Complete result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Run id.
    pub run_id: Uuid,
    /// Address as submitted.
    pub address: String,
    /// Canonical label from the geocoder.
    pub label: String,
    /// Site coordinates.
    pub center: GeoPoint,
    /// Provider that resolved the address.
    pub geocoder: GeocodingProvider,
    /// One summary per distinct radius, ascending.
    pub summaries: Vec<RadiusSummary>,
    /// Tracts resolved around the site, nearest first.
    pub tracts: Vec<Tract>,
    /// Survey years used.
    pub survey_years: SurveyYears,
    /// Counties whose current or baseline data could not be fetched.
    pub failed_counties: Vec<String>,
    /// Safety narrative and its provenance.
    pub intel: IntelReport,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
}

impl AnalysisReport {
    /// Number of resolved tracts.
    #[must_use]
    pub fn tract_count(&self) -> usize {
        self.tracts.len()
    }
}

/// External collaborators used by the pipeline.
pub struct Services {
    /// Address geocoder.
    pub geocoder: Box<dyn Geocoder>,
    /// Tract boundary service.
    pub tracts: Box<dyn TractBoundaryService>,
    /// ACS service.
    pub demographics: Box<dyn DemographicService>,
    /// Narrative provider; the sample payload is used when `None`.
    pub llm: Option<Box<dyn LlmProvider>>,
}

impl Services {
    /// Builds the real HTTP clients described by `config`.
    ///
    /// The LLM provider comes from the environment; when none is configured
    /// the narrative falls back to the sample payload.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if an HTTP client cannot be built.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, PipelineError> {
        let timeout = config.timeouts.request();

        let geocoder = ChainGeocoder::from_registry(timeout)?;
        let tracts = TigerWebClient::new(config.tigerweb.url.clone(), timeout)?
            .with_max_retries(config.tigerweb.max_retries)
            .with_geometry(config.tigerweb.return_geometry);
        let demographics = AcsClient::new(
            config.census.base_url.clone(),
            config.census.api_key.clone(),
            timeout,
        )?;

        let llm = match create_provider_from_env(config.timeouts.intel()) {
            Ok(provider) => {
                log::info!("Safety intel provider: {}", provider.name());
                Some(provider)
            }
            Err(e) => {
                log::warn!("Safety intel will use the sample payload: {e}");
                None
            }
        };

        Ok(Self {
            geocoder: Box::new(geocoder),
            tracts: Box::new(tracts),
            demographics: Box::new(demographics),
            llm,
        })
    }
}

/// Runs analyses against a fixed configuration and set of services.
pub struct SiteAnalyzer {
    config: AnalysisConfig,
    services: Services,
}

/// Validates the address and returns it trimmed.
///
/// # Errors
///
/// Returns [`PipelineError::AddressTooShort`] for addresses under
/// [`MIN_ADDRESS_LEN`] characters.
pub fn validate_address(address: &str) -> Result<&str, PipelineError> {
    let address = address.trim();
    if address.chars().count() < MIN_ADDRESS_LEN {
        return Err(PipelineError::AddressTooShort {
            min_len: MIN_ADDRESS_LEN,
        });
    }
    Ok(address)
}

impl SiteAnalyzer {
    /// Creates an analyzer.
    #[must_use]
    pub const fn new(config: AnalysisConfig, services: Services) -> Self {
        Self { config, services }
    }

    /// Loads configuration from the environment and builds the real
    /// services.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if configuration is invalid or a client
    /// cannot be built.
    pub fn from_env() -> Result<Self, PipelineError> {
        let config = AnalysisConfig::load()?;
        let services = Services::from_config(&config)?;
        Ok(Self::new(config, services))
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Validated, sorted, de-duplicated radii for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRadius`] for an empty list or any
    /// non-positive or non-finite radius.
    pub fn resolve_radii(&self, request: &AnalysisRequest) -> Result<Vec<f64>, PipelineError> {
        let radii = request
            .radii
            .as_deref()
            .unwrap_or(&self.config.default_radii);

        normalize_radii(radii).map_err(|e| PipelineError::InvalidRadius {
            message: e.to_string(),
        })
    }

    /// Runs one analysis within `session`, streaming progress to `events`.
    ///
    /// Invalid input is rejected before a run ticket is taken. Every failure
    /// is also reported as an `error` event.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the input is invalid, geocoding fails,
    /// or a newer run in `session` supersedes this one.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        session: &AnalysisSession,
        events: Option<&mpsc::Sender<AnalysisEvent>>,
    ) -> Result<AnalysisReport, PipelineError> {
        let result = self.run(request, session, events).await;

        if let Err(e) = &result {
            emit(
                events,
                AnalysisEvent::Error {
                    message: e.to_string(),
                },
            )
            .await;
        }

        result
    }

    async fn run(
        &self,
        request: &AnalysisRequest,
        session: &AnalysisSession,
        events: Option<&mpsc::Sender<AnalysisEvent>>,
    ) -> Result<AnalysisReport, PipelineError> {
        let address = validate_address(&request.address)?;
        let radii = self.resolve_radii(request)?;
        let max_radius = radii.last().copied().unwrap_or_default();

        let ticket = session.begin();
        log::info!("Analyzing '{address}' at radii {radii:?} (run {})", ticket.run_id);
        emit(
            events,
            AnalysisEvent::Started {
                run_id: ticket.run_id,
                address: address.to_string(),
                radii: radii.clone(),
            },
        )
        .await;

        let timeout = self.config.timeouts.request();
        let location = tokio::time::timeout(timeout, self.services.geocoder.geocode(address))
            .await
            .map_err(|_| PipelineError::GeocodeTimeout {
                seconds: timeout.as_secs(),
            })??
            .ok_or_else(|| PipelineError::LocationNotFound {
                address: address.to_string(),
            })?;

        session.ensure_current(&ticket)?;
        emit(
            events,
            AnalysisEvent::Geocoded {
                label: location.label.clone(),
                center: location.point,
            },
        )
        .await;

        let intel = fetch_safety_intel(
            self.services.llm.as_deref(),
            &location.label,
            self.config.timeouts.intel(),
        );
        let data = self.gather(location.point, max_radius, session, &ticket, events);
        let (intel, data) = tokio::join!(intel, data);
        let (tracts, current, baseline) = data?;

        session.ensure_current(&ticket)?;

        let summaries = aggregate_radii(&radii, &tracts, &current.table, &baseline.table)
            .map_err(|e| PipelineError::InvalidRadius {
                message: e.to_string(),
            })?;

        let mut failed_counties: Vec<String> = current
            .failed_counties
            .iter()
            .chain(&baseline.failed_counties)
            .map(ToString::to_string)
            .collect();
        failed_counties.sort();
        failed_counties.dedup();

        let report = AnalysisReport {
            run_id: ticket.run_id,
            address: address.to_string(),
            label: location.label,
            center: location.point,
            geocoder: location.provider,
            summaries,
            tracts,
            survey_years: SurveyYears {
                current: current.survey_year,
                baseline: baseline.survey_year,
            },
            failed_counties,
            intel,
            generated_at: Utc::now(),
        };

        session.commit(&ticket, report.clone())?;

        log::info!(
            "Run {} complete: {} tracts, {} radii",
            report.run_id,
            report.tract_count(),
            report.summaries.len()
        );

        emit(
            events,
            AnalysisEvent::DataReady {
                report: Box::new(report.clone()),
            },
        )
        .await;

        Ok(report)
    }

    /// Resolves tracts, then fetches both survey years concurrently.
    async fn gather(
        &self,
        center: GeoPoint,
        max_radius: f64,
        session: &AnalysisSession,
        ticket: &RunTicket,
        events: Option<&mpsc::Sender<AnalysisEvent>>,
    ) -> Result<(Vec<Tract>, DemographicFetch, DemographicFetch), PipelineError> {
        let timeout = self.config.timeouts.request();

        let resolve = resolve_tracts(
            self.services.tracts.as_ref(),
            center,
            max_radius,
            &self.config.resolver,
        );
        let tracts = tokio::time::timeout(timeout, resolve)
            .await
            .unwrap_or_else(|_| {
                log::warn!(
                    "Tract resolution timed out after {}s, continuing with no tracts",
                    timeout.as_secs()
                );
                Vec::new()
            });

        session.ensure_current(ticket)?;
        emit(
            events,
            AnalysisEvent::TractsResolved {
                count: tracts.len(),
            },
        )
        .await;

        let survey = self.config.survey;
        let demographics = self.services.demographics.as_ref();
        let (current, baseline) = tokio::join!(
            fetch_demographics(demographics, &tracts, survey.current_year, timeout),
            fetch_demographics(demographics, &tracts, survey.baseline_year, timeout),
        );

        session.ensure_current(ticket)?;
        for fetch in [&current, &baseline] {
            emit(
                events,
                AnalysisEvent::DemographicsFetched {
                    survey_year: fetch.survey_year,
                    records: fetch.table.len(),
                    failed_counties: fetch.failed_counties.iter().map(ToString::to_string).collect(),
                },
            )
            .await;
        }

        Ok((tracts, current, baseline))
    }
}
