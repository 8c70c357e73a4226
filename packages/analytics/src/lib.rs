#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Multi-radius demographic aggregation engine.
//!
//! Joins two ACS survey years per tract, filters tracts into concentric
//! radius bands around the site and rolls the raw estimates up into
//! [`RadiusSummary`](site_engine_analytics_models::RadiusSummary) values:
//! clean sums, household-weighted averages, compound annual growth rates
//! and forward projections.

pub mod age;
pub mod aggregate;
pub mod stats;

use thiserror::Error;

/// Errors that can occur during aggregation.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// No radii were requested.
    #[error("At least one radius is required")]
    NoRadii,

    /// A radius was zero, negative or not a finite number.
    #[error("Invalid radius: {value}")]
    InvalidRadius {
        /// The offending value.
        value: f64,
    },
}
