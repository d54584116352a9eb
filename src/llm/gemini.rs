//! Google Gemini `generateContent` backend.

use futures::{FutureExt, future::BoxFuture};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::CloudSettings;
use crate::llm::{LLMResult, SendRequest, error::LLMError, traits::Provider};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Sent as a header, never in the query string.
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl Gemini {
    /// Gemini with the key from `GEMINI_API_KEY`.
    pub fn new() -> Self {
        Self::build(std::env::var("GEMINI_API_KEY").ok(), GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL)
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::build(Some(api_key.into()), GEMINI_BASE_URL, GEMINI_DEFAULT_MODEL)
    }

    pub fn from_settings(settings: &CloudSettings) -> Self {
        Self::build(
            settings.resolve_api_key(),
            settings.base_url.as_deref().unwrap_or(GEMINI_BASE_URL),
            settings.model.as_deref().unwrap_or(GEMINI_DEFAULT_MODEL),
        )
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build(api_key: Option<String>, base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn build_request_body(&self, request: &SendRequest) -> Value {
        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.user_content() }]
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_tokens,
            }
        });
        if !request.system_prompt.is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": request.system_prompt }] });
        }
        body
    }
}

impl Default for Gemini {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for Gemini {
    fn name(&self) -> &str {
        "gemini"
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn send<'a>(&'a self, request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        async move {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or_else(|| LLMError::NotConfigured("gemini".to_string()))?;
            let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
            tracing::debug!(model = %self.model, "sending gemini request");

            let response = self
                .client
                .post(&url)
                .header(API_KEY_HEADER, api_key)
                .json(&self.build_request_body(request))
                .send()
                .await?;

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let error_text = response.text().await.unwrap_or_default();
                return Err(LLMError::RateLimitExceeded(error_text));
            }
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(LLMError::Api {
                    status: status.as_u16(),
                    message: error_text,
                });
            }

            let parsed: GeminiResponse = response
                .json()
                .await
                .map_err(|e| LLMError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
            let text = parsed
                .candidates
                .into_iter()
                .next()
                .and_then(|candidate| candidate.content.parts)
                .unwrap_or_default()
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>();
            if text.trim().is_empty() {
                return Err(LLMError::EmptyResponse("gemini".to_string()));
            }
            Ok(text)
        }
        .boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        async move {
            let Some(api_key) = self.api_key.as_deref() else {
                return false;
            };
            let url = format!("{}/models/{}", self.base_url, self.model);
            match self.client.get(&url).header(API_KEY_HEADER, api_key).send().await {
                Ok(response) => response.status().is_success(),
                Err(err) => {
                    tracing::warn!(%err, "gemini connection test failed");
                    false
                }
            }
        }
        .boxed()
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    text: Option<String>,
}
