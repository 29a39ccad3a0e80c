//! Google Gemini `generateContent` client.
//!
//! Auth via `?key=API_KEY` query parameter. The request asks for
//! `application/json` output so the reply text can be parsed as-is.

use serde::{Deserialize, Serialize};

use super::{AnalysisError, TextGenerator};
use crate::config::GeminiSettings;

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

/// Blocking Gemini client. Each call is one request, no retry.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Build a client, reading the API key from the configured environment variable.
    pub fn from_settings(settings: &GeminiSettings) -> Result<Self, AnalysisError> {
        let api_key = settings
            .api_key()
            .ok_or_else(|| AnalysisError::MissingKey(settings.api_key_env.clone()))?;
        Self::with_key(settings, api_key)
    }

    /// Build a client with an explicitly provided API key.
    pub fn with_key(settings: &GeminiSettings, api_key: String) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| AnalysisError::Network(format!("building HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key,
        })
    }

    fn endpoint_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        log::debug!("POST {} (model {})", self.endpoint_url(), self.model);
        let response = self
            .client
            .post(self.endpoint_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .map_err(|e| AnalysisError::Network(e.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| AnalysisError::Network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &body));
        }
        extract_text(&body)
    }
}

/// Prefer the API's own error message over the raw body.
fn api_error(status: u16, body: &str) -> AnalysisError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());
    AnalysisError::Api { status, message }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, AnalysisError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::InvalidResponse(format!("invalid JSON envelope: {e}")))?;

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::InvalidResponse("no candidates in response".into()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AnalysisError::InvalidResponse("candidate has no text".into()));
    }
    Ok(text)
}
