#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! LLM provider abstraction and the neighborhood safety narrative.
//!
//! Supports Anthropic Claude, `OpenAI` (and any `OpenAI`-compatible server
//! via `AI_BASE_URL`) and Google Gemini. The [`intel`] module asks the
//! provider for a crime-grade summary of a location, validates the reply
//! against a strict schema and substitutes a fixed sample payload whenever
//! anything goes wrong, so the narrative can never fail an analysis.

pub mod intel;
pub mod providers;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to LLM provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
