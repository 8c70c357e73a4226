//! LLM provider abstraction and implementations.
//!
//! Supports Anthropic Claude, `OpenAI` and Google Gemini via a common trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::time::Duration;

use crate::AiError;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and report metadata.
    fn name(&self) -> &'static str;

    /// Sends a single-turn completion request and returns the text of the
    /// reply.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the reply has no text.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError>;
}

/// Builds the HTTP client shared by the providers.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, AiError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Creates an LLM provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials:
///
/// 1. `ANTHROPIC_API_KEY` set -> Anthropic Claude
/// 2. `OPENAI_API_KEY` set -> `OpenAI`
/// 3. `GEMINI_API_KEY` set -> Gemini
///
/// `AI_MODEL` overrides the provider's default model and `AI_BASE_URL`
/// points the `OpenAI` provider at a compatible self-hosted server.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env(timeout: Duration) -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = std::env::var("AI_PROVIDER").unwrap_or_else(|_| detect_provider());
    let model = std::env::var("AI_MODEL").ok().filter(|m| !m.trim().is_empty());
    let client = http_client(timeout)?;

    match provider.to_lowercase().as_str() {
        "anthropic" | "claude" => {
            let api_key = require_env("ANTHROPIC_API_KEY")?;
            let model = model.unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string());
            Ok(Box::new(anthropic::AnthropicProvider::new(
                client, api_key, model,
            )))
        }
        "openai" | "gpt" => {
            let base_url = std::env::var("AI_BASE_URL")
                .unwrap_or_else(|_| openai::DEFAULT_BASE_URL.to_string());
            // Local servers typically accept any key.
            let api_key = std::env::var("OPENAI_API_KEY").or_else(|e| {
                if base_url == openai::DEFAULT_BASE_URL {
                    Err(e)
                } else {
                    Ok(String::new())
                }
            });
            let api_key = api_key.map_err(|_| AiError::Config {
                message: "OPENAI_API_KEY environment variable not set".to_string(),
            })?;
            let model = model.unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            Ok(Box::new(
                openai::OpenAiProvider::new(client, api_key, model).with_base_url(base_url),
            ))
        }
        "gemini" | "google" => {
            let api_key = require_env("GEMINI_API_KEY")?;
            let model = model.unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
            Ok(Box::new(gemini::GeminiProvider::new(client, api_key, model)))
        }
        other => Err(AiError::Config {
            message: format!(
                "Unknown AI provider: {other}. Use 'anthropic', 'openai', or 'gemini'."
            ),
        }),
    }
}

fn require_env(name: &str) -> Result<String, AiError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AiError::Config {
            message: format!("{name} environment variable not set"),
        })
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_provider_from_env`].
fn detect_provider() -> String {
    if std::env::var("ANTHROPIC_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
        return "anthropic".to_string();
    }

    if std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("AI_BASE_URL").is_ok() {
        log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY or AI_BASE_URL found)");
        return "openai".to_string();
    }

    if std::env::var("GEMINI_API_KEY").is_ok() {
        log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY found)");
        return "gemini".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set one of: ANTHROPIC_API_KEY, OPENAI_API_KEY, \
         GEMINI_API_KEY. You can also set AI_PROVIDER explicitly. \
         Safety intel will use the sample payload."
    );

    // Falls through to a clear missing-key error.
    "gemini".to_string()
}

/// Concatenates text parts, failing when there are none.
pub(crate) fn join_text<'a>(
    provider: &str,
    parts: impl Iterator<Item = &'a str>,
) -> Result<String, AiError> {
    let text = parts.collect::<Vec<_>>().join("");
    if text.trim().is_empty() {
        return Err(AiError::Provider {
            message: format!("{provider} returned no text content"),
        });
    }
    Ok(text)
}
