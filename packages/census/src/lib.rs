#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! American Community Survey data retrieval.
//!
//! Fetches ACS 5-year tract estimates from the Census Bureau data API one
//! county at a time and merges them into a table keyed by tract GEOID. A
//! county that fails to load simply contributes no records.

pub mod client;
pub mod fetcher;
pub mod table;

use thiserror::Error;

/// Errors that can occur while fetching census data.
#[derive(Debug, Error)]
pub enum CensusError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status.
    #[error("Census API returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Census API request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout in seconds.
        seconds: u64,
    },
}
