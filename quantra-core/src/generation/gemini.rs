use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{config::GeminiConfig, util::truncate_body};

use super::{GenerationError, PromptTurn, Speaker, TextGenerator};

const NO_CANDIDATES: &str = "No candidates returned by Gemini";
const NO_TEXT: &str = "No text generated by Gemini";

/// Gemini `generateContent` REST client.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: Client,
}

// Keeps the key out of debug output.
impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

impl<'a> GeminiRequest<'a> {
    fn new(turns: &'a [PromptTurn]) -> Self {
        let contents = turns
            .iter()
            .map(|t| GeminiContent {
                role: t.speaker,
                parts: vec![GeminiPart { text: &t.text }],
            })
            .collect();

        Self { contents }
    }
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: Speaker,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize, Debug)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    #[serde(default)]
    code: u32,
    message: String,
    #[serde(default)]
    status: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &GeminiConfig) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to create Gemini HTTP client")?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// `models/gemini-2.5-flash` and `gemini-2.5-flash` address the same endpoint.
    fn api_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    async fn send(&self, model: &str, turns: &[PromptTurn]) -> Result<String, GenerationError> {
        let request = GeminiRequest::new(turns);

        let response = self
            .http
            .post(self.api_url(model))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error("Failed to send request to Gemini", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| request_error("Failed to read Gemini response", e))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<GeminiErrorResponse>(&body) {
                Ok(err) => format!(
                    "Gemini API error: {} (code: {}, status: {})",
                    err.error.message, err.error.code, err.error.status
                ),
                Err(_) => format!(
                    "Gemini request failed with status {}: {}",
                    status,
                    truncate_body(&body, 200)
                ),
            };
            return Err(GenerationError::Request(message));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| request_error("Failed to parse Gemini response", e))?;

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            return Err(GenerationError::Request(NO_CANDIDATES.into()));
        };

        if let Some(reason) = candidate.finish_reason.as_deref().filter(|r| *r != "STOP") {
            warn!(model, reason, "Gemini finished early");
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::Request(NO_TEXT.into()));
        }

        Ok(text)
    }
}

fn request_error(what: &str, e: impl std::fmt::Display) -> GenerationError {
    GenerationError::Request(format!("{what}: {e}"))
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, model: &str, turns: &[PromptTurn]) -> Result<String, GenerationError> {
        debug!(model, turns = turns.len(), "Calling Gemini");
        self.send(model, turns).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> GeminiClient {
        let cfg = GeminiConfig {
            base_url: base.to_string(),
            ..GeminiConfig::default()
        };
        GeminiClient::new("KEY", &cfg).unwrap()
    }

    #[test]
    fn api_url_accepts_prefixed_and_bare_models() {
        let c = client("https://example.test/v1beta/");
        assert_eq!(
            c.api_url("models/gemini-2.5-flash"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            c.api_url("gemini-2.5-flash"),
            c.api_url("models/gemini-2.5-flash")
        );
    }

    #[test]
    fn debug_output_hides_key() {
        let rendered = format!("{:?}", client("https://example.test"));
        assert!(!rendered.contains("KEY"));
    }

    #[test]
    fn request_serializes_provider_roles() {
        let turns = [PromptTurn::user("hi"), PromptTurn::model("HELLO")];
        let request = GeminiRequest::new(&turns);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][1]["parts"][0]["text"], "HELLO");
    }
}
