//! Google Gemini `generateContent` provider implementation.
//!
//! Requests are grounded with the Google Search tool so the model can look
//! up published crime grades for the location.

use serde::{Deserialize, Serialize};

use super::{LlmProvider, join_text};
use crate::AiError;

/// Model used when `AI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

const API_ROOT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Gemini API provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    search_grounding: bool,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider with search grounding enabled.
    #[must_use]
    pub const fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            search_grounding: true,
            client,
        }
    }

    /// Enables or disables the Google Search grounding tool.
    #[must_use]
    pub const fn with_search_grounding(mut self, enabled: bool) -> Self {
        self.search_grounding = enabled;
        self
    }

    fn request_body(&self, system_prompt: &str, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            system_instruction: GeminiContent {
                parts: vec![GeminiPart {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            tools: if self.search_grounding {
                vec![serde_json::json!({ "google_search": {} })]
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Default)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

fn response_text(body: &str) -> Result<String, AiError> {
    let response: GeminiResponse = serde_json::from_str(body)?;

    join_text(
        "Gemini",
        response
            .candidates
            .first()
            .into_iter()
            .flat_map(|c| c.content.parts.iter().map(|p| p.text.as_str())),
    )
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError> {
        let url = format!("{API_ROOT}/{}:generateContent", self.model);

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(system_prompt, prompt))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(AiError::Provider {
                message: format!("HTTP {status}: {body}"),
            });
        }

        response_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_includes_search_tool() {
        let provider = GeminiProvider::new(reqwest::Client::new(), "k".into(), "m".into());
        let body = serde_json::to_value(provider.request_body("sys", "hello")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "sys");
        assert!(body["tools"][0].get("google_search").is_some());

        let provider = provider.with_search_grounding(false);
        let body = serde_json::to_value(provider.request_body("sys", "hello")).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn extracts_candidate_text() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "```json\n{}\n```" }] }
            }]
        })
        .to_string();
        assert_eq!(response_text(&body).unwrap(), "```json\n{}\n```");
    }

    #[test]
    fn blocked_reply_is_an_error() {
        let body = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } }).to_string();
        assert!(response_text(&body).is_err());
    }
}
