#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the site analysis server.
//!
//! These types are serialized to JSON for the REST API. [`ApiAnalysis`]
//! turns an [`AnalysisReport`] into display-ready values: KPI cards, one
//! formatted row per radius and the chart series, alongside the raw
//! summaries for clients that format on their own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use site_engine_ai::intel::IntelReport;
use site_engine_analytics::stats::round_count;
use site_engine_analytics_models::{GROWTH_PERIOD_YEARS, RadiusSummary};
use site_engine_geography_models::{GeoPoint, Tract};
use site_engine_pipeline::{AnalysisReport, SurveyYears};
use uuid::Uuid;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// Body of the analyze endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Free-form street address.
    pub address: String,
    /// Radii in miles; server defaults when absent.
    #[serde(default)]
    pub radii: Option<Vec<f64>>,
    /// Client session. A new analysis in the same session supersedes any
    /// run still in flight.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable message.
    pub error: String,
}

/// A headline metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiCard {
    /// Card title.
    pub label: String,
    /// Formatted value.
    pub value: String,
    /// Caption under the value.
    pub caption: String,
}

/// Formatted metrics for one radius.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRadiusRow {
    /// e.g. `"3 Mi"`.
    pub radius_label: String,
    /// Member tracts.
    pub tract_count: usize,
    /// Near-term projected population.
    pub population_near_term: String,
    /// Long-term projected population.
    pub population_long_term: String,
    /// Five-year population growth.
    pub population_growth: String,
    /// Median household income.
    pub median_income: String,
    /// Long-term projected median household income.
    pub income_long_term: String,
    /// Five-year compounded income growth.
    pub income_growth: String,
    /// Median home value.
    pub median_home_value: String,
    /// Median year built.
    pub median_year_built: String,
    /// `"renter% / owner%"`.
    pub rent_vs_own: String,
    /// Vehicles per household, two decimals.
    pub vehicles_per_household: String,
    /// Average household size, two decimals.
    pub avg_household_size: String,
}

/// One bar pair of the population momentum chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationBar {
    /// e.g. `"1 Mi"`.
    pub radius_label: String,
    /// Near-term projected population.
    pub near_term: u64,
    /// Long-term projected population.
    pub long_term: u64,
}

/// One bar of the age cohort chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeBar {
    /// Cohort label.
    pub name: String,
    /// Persons in the cohort.
    pub value: u64,
}

/// Full analysis response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAnalysis {
    /// Run id.
    pub run_id: Uuid,
    /// Address as submitted.
    pub address: String,
    /// Canonical location label.
    pub label: String,
    /// Site coordinates.
    pub center: GeoPoint,
    /// Survey years compared.
    pub survey_years: SurveyYears,
    /// Number of resolved tracts.
    pub tract_count: usize,
    /// Counties with missing data.
    pub failed_counties: Vec<String>,
    /// Headline metrics for the innermost radius.
    pub kpis: Vec<KpiCard>,
    /// One formatted row per radius, ascending.
    pub rows: Vec<ApiRadiusRow>,
    /// Population momentum chart series.
    pub population_chart: Vec<PopulationBar>,
    /// Age cohort chart series for the innermost radius.
    pub age_chart: Vec<AgeBar>,
    /// Raw summaries.
    pub summaries: Vec<RadiusSummary>,
    /// Resolved tracts for map overlays.
    pub tracts: Vec<Tract>,
    /// Safety narrative and its provenance.
    pub intel: IntelReport,
    /// When the report was produced.
    pub generated_at: DateTime<Utc>,
}

/// Inserts thousands separators: `1234567` becomes `"1,234,567"`.
#[must_use]
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

/// Whole-dollar currency: `56000.4` becomes `"$56,000"`.
#[must_use]
pub fn format_currency(value: f64) -> String {
    format!("${}", group_thousands(round_count(value)))
}

/// One-decimal percentage of a value already scaled to 0-100.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

/// Radius label: `1.0` becomes `"1 Mi"`, `2.5` becomes `"2.5 Mi"`.
#[must_use]
pub fn radius_label(radius_miles: f64) -> String {
    format!("{radius_miles} Mi")
}

/// Simple five-year population growth, in percent.
#[must_use]
pub fn five_year_population_growth(annual_rate: f64) -> f64 {
    annual_rate * f64::from(GROWTH_PERIOD_YEARS) * 100.0
}

/// Compounded five-year income growth, in percent.
#[must_use]
pub fn five_year_income_growth(annual_rate: f64) -> f64 {
    ((1.0 + annual_rate).powf(f64::from(GROWTH_PERIOD_YEARS)) - 1.0) * 100.0
}

impl From<&RadiusSummary> for ApiRadiusRow {
    fn from(summary: &RadiusSummary) -> Self {
        Self {
            radius_label: radius_label(summary.radius_miles),
            tract_count: summary.tract_count,
            population_near_term: group_thousands(summary.projected_population.near_term),
            population_long_term: group_thousands(summary.projected_population.long_term),
            population_growth: format_percent(five_year_population_growth(
                summary.population_growth_rate,
            )),
            median_income: format_currency(summary.median_income),
            income_long_term: format_currency(summary.projected_income.long_term),
            income_growth: format_percent(five_year_income_growth(summary.income_growth_rate)),
            median_home_value: format_currency(summary.median_home_value),
            median_year_built: round_count(summary.median_year_built).to_string(),
            rent_vs_own: summary.tenure.to_string(),
            vehicles_per_household: format!("{:.2}", summary.vehicles_per_household),
            avg_household_size: format!("{:.2}", summary.avg_household_size),
        }
    }
}

/// Headline cards for the innermost radius. Empty when there are no
/// summaries.
#[must_use]
pub fn kpi_cards(summaries: &[RadiusSummary]) -> Vec<KpiCard> {
    let Some(inner) = summaries.first() else {
        return Vec::new();
    };

    let radius = inner.radius_miles;
    let card = |label: String, value: String, caption: &str| KpiCard {
        label,
        value,
        caption: caption.to_string(),
    };

    vec![
        card(
            format!("{radius} Mile Population"),
            group_thousands(inner.projected_population.near_term),
            "Near-term estimate",
        ),
        card(
            format!("{radius} Mile Median HH Income"),
            format_currency(inner.median_income),
            "Spending power",
        ),
        card(
            format!("{radius} Mile Median Home Value"),
            format_currency(inner.median_home_value),
            "Market asset value",
        ),
        card(
            format!("{radius} Mile Pop Growth Rate (5yr)"),
            format_percent(five_year_population_growth(inner.population_growth_rate)),
            "Momentum",
        ),
    ]
}

impl From<&AnalysisReport> for ApiAnalysis {
    fn from(report: &AnalysisReport) -> Self {
        let summaries = &report.summaries;

        Self {
            run_id: report.run_id,
            address: report.address.clone(),
            label: report.label.clone(),
            center: report.center,
            survey_years: report.survey_years,
            tract_count: report.tract_count(),
            failed_counties: report.failed_counties.clone(),
            kpis: kpi_cards(summaries),
            rows: summaries.iter().map(ApiRadiusRow::from).collect(),
            population_chart: summaries
                .iter()
                .map(|s| PopulationBar {
                    radius_label: radius_label(s.radius_miles),
                    near_term: s.projected_population.near_term,
                    long_term: s.projected_population.long_term,
                })
                .collect(),
            age_chart: summaries
                .first()
                .map(|s| {
                    s.age_distribution
                        .iter()
                        .map(|c| AgeBar {
                            name: c.label.clone(),
                            value: c.count,
                        })
                        .collect()
                })
                .unwrap_or_default(),
            summaries: summaries.clone(),
            tracts: report.tracts.clone(),
            intel: report.intel.clone(),
            generated_at: report.generated_at,
        }
    }
}
