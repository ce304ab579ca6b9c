//! Gemini API client (generateContent, non-streaming).

use crate::config::{self, Config};
use crate::llm::TextGenerator;
use crate::persona::Persona;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Finish reasons for which the service withholds the text.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Client for the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    generation: GenerationConfig,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("gemini API key not configured")]
    MissingApiKey,
    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gemini api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("gemini response was blocked: {0}")]
    Blocked(String),
}

impl GeminiClient {
    pub fn new(
        base_url: Option<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        generation: GenerationConfig,
        timeout: Option<Duration>,
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| config::DEFAULT_GEMINI_BASE_URL.to_string());
        let client = match timeout {
            Some(t) => reqwest::Client::builder()
                .timeout(t)
                .build()
                .unwrap_or_else(|e| {
                    log::warn!("gemini: could not apply request timeout ({}), using defaults", e);
                    reqwest::Client::new()
                }),
            None => reqwest::Client::new(),
        };
        Self {
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            generation,
            client,
        }
    }

    /// Build from resolved config: API key, model and base URL from `gemini`, sampling parameters from the persona.
    pub fn from_config(config: &Config, persona: &Persona) -> Self {
        Self::new(
            Some(config::resolve_gemini_base_url(config)),
            config::resolve_gemini_api_key(config),
            config::resolve_gemini_model(config),
            GenerationConfig {
                temperature: persona.temperature,
                max_output_tokens: persona.max_output_tokens,
            },
            config.gemini.timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// POST /models/{model}:generateContent — returns the first candidate's text, or None when
    /// the response carries no text at all.
    pub async fn generate_content(&self, prompt: &str) -> Result<Option<String>, GeminiError> {
        let api_key = self.api_key.as_deref().ok_or(GeminiError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: self.generation,
        };
        log::debug!(
            "gemini: calling {} (prompt {} bytes)",
            self.model,
            prompt.len()
        );
        let res = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status,
                message: api_error_message(&body),
            });
        }
        let data: GenerateContentResponse = res.json().await?;
        data.into_text()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<Option<String>, GeminiError> {
        self.generate_content(prompt).await
    }
}

/// Pull `error.message` out of a Gemini error body; fall back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string())
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<Option<String>, GeminiError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GeminiError::Blocked(format!("prompt blocked due to {}", reason)));
        }
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Ok(None);
        };
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if !text.is_empty() {
            return Ok(Some(text));
        }
        match candidate.finish_reason.as_deref() {
            Some(reason) if BLOCKING_FINISH_REASONS.contains(&reason) => Err(GeminiError::Blocked(
                format!("response blocked due to {}", reason),
            )),
            _ => Ok(None),
        }
    }
}
