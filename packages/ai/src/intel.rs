//! Neighborhood safety narrative.
//!
//! The provider is asked for letter crime grades around the site. Its reply
//! is parsed into [`SafetyIntel`] by [`parse_intel`], which rejects missing
//! fields and anything that is not a letter grade. Every failure path ends
//! in [`fallback_intel`], so consumers only ever see validated data.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::providers::LlmProvider;

/// Summary shown with the sample payload.
pub const FALLBACK_SUMMARY: &str = "No API key / fetch failed - showing fallback sample.";

const SYSTEM_PROMPT: &str = "You are a real-estate site analyst. You report neighborhood \
crime grades as published by CrimeGrade.org. Answer with a single JSON object and nothing else.";

/// Letter grades for the site overall and per crime category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grades {
    /// Overall grade.
    pub overall: String,
    /// Violent crime grade.
    pub violent: String,
    /// Property crime grade.
    pub property: String,
    /// Other crime grade.
    pub other: String,
}

/// Grade for one crime type (e.g. "Assault").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeTypeGrade {
    /// Crime type.
    #[serde(rename = "type")]
    pub crime_type: String,
    /// Letter grade.
    pub grade: String,
}

/// Per-type grades grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Violent crime types.
    pub violent: Vec<CrimeTypeGrade>,
    /// Property crime types.
    pub property: Vec<CrimeTypeGrade>,
    /// Other crime types.
    pub other: Vec<CrimeTypeGrade>,
}

/// Grade per compass sector around the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sectors {
    /// North.
    pub n: String,
    /// South.
    pub s: String,
    /// East.
    pub e: String,
    /// West.
    pub w: String,
    /// Northeast.
    pub ne: String,
    /// Northwest.
    pub nw: String,
    /// Southeast.
    pub se: String,
    /// Southwest.
    pub sw: String,
}

impl Sectors {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("n", self.n.as_str()),
            ("s", self.s.as_str()),
            ("e", self.e.as_str()),
            ("w", self.w.as_str()),
            ("ne", self.ne.as_str()),
            ("nw", self.nw.as_str()),
            ("se", self.se.as_str()),
            ("sw", self.sw.as_str()),
        ]
        .into_iter()
    }
}

/// A nearby school.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    /// School name.
    pub name: String,
    /// Published rating, if any.
    #[serde(default)]
    pub rating: Option<String>,
    /// Latitude, if known.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude, if known.
    #[serde(default)]
    pub lon: Option<f64>,
}

/// Validated safety narrative for a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyIntel {
    /// One-paragraph summary.
    pub safety_summary: String,
    /// Headline grades.
    pub grades: Grades,
    /// Per-type grades.
    pub breakdown: Breakdown,
    /// Per-sector grades.
    pub sectors: Sectors,
    /// Nearby schools; providers frequently omit these.
    #[serde(default)]
    pub schools: Vec<School>,
}

/// Where the narrative came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IntelSource {
    /// Validated reply from the named provider.
    Provider {
        /// Provider name.
        name: String,
    },
    /// Sample payload substituted after a failure.
    Fallback {
        /// Why the provider result was not used.
        reason: String,
    },
}

/// Narrative plus its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelReport {
    /// The narrative shown to the user.
    pub intel: SafetyIntel,
    /// Provider or fallback.
    pub source: IntelSource,
}

impl IntelReport {
    /// Wraps [`fallback_intel`] with the reason it was used.
    #[must_use]
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            intel: fallback_intel(),
            source: IntelSource::Fallback {
                reason: reason.into(),
            },
        }
    }

    /// Whether the sample payload was substituted.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self.source, IntelSource::Fallback { .. })
    }
}

/// A provider reply that does not match the [`SafetyIntel`] schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Safety intel schema mismatch: {message}")]
pub struct SchemaMismatch {
    /// What was wrong with the reply.
    pub message: String,
}

impl SchemaMismatch {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Whether `grade` is a letter grade `A`-`F` (no `E`) with an optional
/// `+` or `-`.
#[must_use]
pub fn is_valid_grade(grade: &str) -> bool {
    let mut chars = grade.chars();
    let letter_ok = matches!(chars.next(), Some('A' | 'B' | 'C' | 'D' | 'F'));
    let suffix_ok = matches!(chars.next(), None | Some('+' | '-'));
    letter_ok && suffix_ok && chars.next().is_none()
}

/// Removes Markdown code fences the model may wrap its JSON in, and any
/// prose around the outermost object.
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim(),
    }
}

fn check_grade(field: &str, grade: &str) -> Result<(), SchemaMismatch> {
    if is_valid_grade(grade) {
        Ok(())
    } else {
        Err(SchemaMismatch::new(format!(
            "{field}: '{grade}' is not a letter grade"
        )))
    }
}

fn validate(intel: &SafetyIntel) -> Result<(), SchemaMismatch> {
    if intel.safety_summary.trim().is_empty() {
        return Err(SchemaMismatch::new("safety_summary is empty"));
    }

    let g = &intel.grades;
    check_grade("grades.overall", &g.overall)?;
    check_grade("grades.violent", &g.violent)?;
    check_grade("grades.property", &g.property)?;
    check_grade("grades.other", &g.other)?;

    for (category, entries) in [
        ("violent", &intel.breakdown.violent),
        ("property", &intel.breakdown.property),
        ("other", &intel.breakdown.other),
    ] {
        for entry in entries {
            if entry.crime_type.trim().is_empty() {
                return Err(SchemaMismatch::new(format!(
                    "breakdown.{category}: entry without a type"
                )));
            }
            check_grade(&format!("breakdown.{category}.{}", entry.crime_type), &entry.grade)?;
        }
    }

    for (sector, grade) in intel.sectors.iter() {
        check_grade(&format!("sectors.{sector}"), grade)?;
    }

    Ok(())
}

/// Parses and validates a provider reply.
///
/// # Errors
///
/// Returns [`SchemaMismatch`] if the reply is not JSON, lacks a required
/// field, or carries anything other than letter grades.
pub fn parse_intel(text: &str) -> Result<SafetyIntel, SchemaMismatch> {
    let intel: SafetyIntel = serde_json::from_str(strip_fences(text))
        .map_err(|e| SchemaMismatch::new(e.to_string()))?;

    validate(&intel)?;

    Ok(intel)
}

/// The fixed sample payload shown when no validated narrative is available.
#[must_use]
pub fn fallback_intel() -> SafetyIntel {
    let entry = |crime_type: &str, grade: &str| CrimeTypeGrade {
        crime_type: crime_type.to_string(),
        grade: grade.to_string(),
    };

    SafetyIntel {
        safety_summary: FALLBACK_SUMMARY.to_string(),
        grades: Grades {
            overall: "B-".to_string(),
            violent: "C".to_string(),
            property: "D".to_string(),
            other: "B+".to_string(),
        },
        breakdown: Breakdown {
            violent: vec![entry("Assault", "C"), entry("Robbery", "B")],
            property: vec![entry("Theft", "D"), entry("Burglary", "F")],
            other: vec![entry("Vandalism", "B")],
        },
        sectors: Sectors {
            n: "D".to_string(),
            s: "C".to_string(),
            e: "B".to_string(),
            w: "A".to_string(),
            ne: "D".to_string(),
            nw: "D".to_string(),
            se: "B".to_string(),
            sw: "B".to_string(),
        },
        schools: Vec::new(),
    }
}

/// Prompt asking for the narrative of `location`.
#[must_use]
pub fn build_prompt(location: &str) -> String {
    format!(
        "Collect the published CrimeGrade.org data for the address: {location}.\n\
         Return strictly JSON with these keys:\n\
         - safety_summary: string\n\
         - grades: {{ overall, violent, property, other }} letter grades A-F with optional +/-\n\
         - breakdown: {{ violent, property, other }}, each a list of {{ type, grade }}\n\
         - sectors: {{ n, s, e, w, ne, nw, se, sw }} letter grades\n\
         - schools: list of {{ name, rating, lat, lon }}"
    )
}

/// Fetches the narrative for `location`, falling back to the sample payload
/// when there is no provider, the call fails or times out, or the reply
/// does not validate.
pub async fn fetch_safety_intel(
    provider: Option<&dyn LlmProvider>,
    location: &str,
    timeout: Duration,
) -> IntelReport {
    let Some(provider) = provider else {
        log::info!("No AI provider configured; using sample safety intel");
        return IntelReport::fallback("no AI provider configured");
    };

    let prompt = build_prompt(location);

    let text = match tokio::time::timeout(timeout, provider.complete(SYSTEM_PROMPT, &prompt)).await
    {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            log::warn!("{}: safety intel request failed: {e}", provider.name());
            return IntelReport::fallback(e.to_string());
        }
        Err(_) => {
            log::warn!(
                "{}: safety intel timed out after {}s",
                provider.name(),
                timeout.as_secs()
            );
            return IntelReport::fallback(format!("timed out after {}s", timeout.as_secs()));
        }
    };

    match parse_intel(&text) {
        Ok(intel) => {
            log::info!(
                "{}: safety intel overall grade {}",
                provider.name(),
                intel.grades.overall
            );
            IntelReport {
                intel,
                source: IntelSource::Provider {
                    name: provider.name().to_string(),
                },
            }
        }
        Err(e) => {
            log::warn!("{}: {e}", provider.name());
            log::debug!("Rejected safety intel reply: {text}");
            IntelReport::fallback(e.to_string())
        }
    }
}
