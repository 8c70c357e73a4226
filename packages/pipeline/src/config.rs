//! Analysis configuration.
//!
//! Defaults are embedded from `config/default.toml`. A TOML file named by
//! `SITE_ENGINE_CONFIG` is merged over them key by key, then individual
//! environment variables are applied on top.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use site_engine_geography::resolver::ResolverOptions;
use thiserror::Error;

const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Environment variable naming an override config file.
pub const CONFIG_PATH_ENV: &str = "SITE_ENGINE_CONFIG";

/// Errors loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Override file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Override file is not valid TOML or does not match the schema.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// An environment variable could not be parsed.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv {
        /// Variable name.
        name: String,
        /// Offending value.
        value: String,
    },

    /// The configuration is internally inconsistent.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// ACS vintages to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyConfig {
    /// Current ACS 5-year vintage.
    pub current_year: u16,
    /// Baseline vintage growth is measured from.
    pub baseline_year: u16,
}

/// Census Data API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusConfig {
    /// API root, e.g. `https://api.census.gov/data`.
    pub base_url: String,
    /// Optional API key.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// `TIGERweb` tract layer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TigerWebConfig {
    /// Layer query endpoint.
    pub url: String,
    /// Request tract boundary geometry for map overlays.
    pub return_geometry: bool,
    /// Attempts per page.
    pub max_retries: u32,
}

/// Timeouts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Bound on every geocoding, tract and ACS request.
    pub request_secs: u64,
    /// Bound on the safety narrative request.
    pub intel_secs: u64,
}

impl TimeoutConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    /// Narrative timeout as a [`Duration`].
    #[must_use]
    pub const fn intel(&self) -> Duration {
        Duration::from_secs(self.intel_secs)
    }
}

/// Complete analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Radii used when a request does not name any.
    pub default_radii: Vec<f64>,
    /// Survey years.
    pub survey: SurveyConfig,
    /// Census Data API.
    pub census: CensusConfig,
    /// Tract boundaries.
    pub tigerweb: TigerWebConfig,
    /// Tract resolution tuning.
    #[serde(default)]
    pub resolver: ResolverOptions,
    /// Timeouts.
    pub timeouts: TimeoutConfig,
}

impl Default for AnalysisConfig {
    /// The embedded defaults.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `config/default.toml` is malformed (this is a
    /// compile-time guarantee since the file is embedded).
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default config: {e}"))
    }
}

/// Recursively merges `overlay` into `base`; overlay values win.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Parses a comma-separated radius list such as `"1, 3,5"`.
///
/// Returns `None` if any entry is not a number.
#[must_use]
pub fn parse_radii_list(value: &str) -> Option<Vec<f64>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect()
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}

impl AnalysisConfig {
    /// Parses `overlay` (TOML text) over the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if the overlay is not valid TOML or the
    /// merged result does not match the schema.
    pub fn from_overlay_str(overlay: &str) -> Result<Self, ConfigError> {
        let mut base: toml::Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        let overlay: toml::Table = toml::from_str(overlay)?;
        merge_tables(&mut base, overlay);

        let config: Self = toml::Value::Table(base).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads defaults, the optional override file and environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the override file cannot be read or
    /// parsed, or an environment variable is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                log::info!("Loading config overrides from {path}");
                Self::from_file(Path::new(&path))?
            }
            _ => Self::default(),
        };

        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;

        log::debug!(
            "Config: ACS {} vs {}, radii {:?}, timeout {}s",
            config.survey.current_year,
            config.survey.baseline_year,
            config.default_radii,
            config.timeouts.request_secs
        );

        Ok(config)
    }

    /// Reads an override file and merges it over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_overlay_str(&text)
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// Recognized: `ACS_CURRENT_YEAR`, `ACS_BASELINE_YEAR`,
    /// `CENSUS_API_KEY`, `SITE_ENGINE_TIMEOUT_SECS`, `SITE_ENGINE_RADII`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] for unparseable values.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("ACS_CURRENT_YEAR") {
            self.survey.current_year = parse_env("ACS_CURRENT_YEAR", &v)?;
        }
        if let Some(v) = lookup("ACS_BASELINE_YEAR") {
            self.survey.baseline_year = parse_env("ACS_BASELINE_YEAR", &v)?;
        }
        if let Some(v) = lookup("CENSUS_API_KEY") {
            self.census.api_key = Some(v).filter(|k| !k.trim().is_empty());
        }
        if let Some(v) = lookup("SITE_ENGINE_TIMEOUT_SECS") {
            let secs: u64 = parse_env("SITE_ENGINE_TIMEOUT_SECS", &v)?;
            self.timeouts.request_secs = secs;
            self.timeouts.intel_secs = secs;
        }
        if let Some(v) = lookup("SITE_ENGINE_RADII") {
            self.default_radii = parse_radii_list(&v).ok_or_else(|| ConfigError::InvalidEnv {
                name: "SITE_ENGINE_RADII".to_string(),
                value: v.clone(),
            })?;
        }
        Ok(())
    }

    /// Checks cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the baseline year is not before
    /// the current year, no default radii are configured, or a timeout is
    /// zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid { message });

        if self.survey.baseline_year >= self.survey.current_year {
            return invalid(format!(
                "baseline year {} must precede current year {}",
                self.survey.baseline_year, self.survey.current_year
            ));
        }
        if self.default_radii.is_empty() {
            return invalid("default_radii must not be empty".to_string());
        }
        if self.timeouts.request_secs == 0 || self.timeouts.intel_secs == 0 {
            return invalid("timeouts must be at least one second".to_string());
        }
        if self.survey.current_year - self.survey.baseline_year != 5 {
            log::warn!(
                "ACS years {} and {} are not five years apart; growth rates still annualize over five",
                self.survey.baseline_year,
                self.survey.current_year
            );
        }

        Ok(())
    }
}
