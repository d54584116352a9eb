use super::ollama::OllamaError;

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Ollama error: {0}")]
    Ollama(#[from] OllamaError),

    #[error("OpenAI error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("JSON error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("provider '{0}' returned an empty reply")]
    EmptyResponse(String),

    #[error("provider call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("provider '{0}' is not configured")]
    NotConfigured(String),

    #[error("no provider available (tried: {tried})")]
    NoProviderAvailable { tried: String },
}

impl LLMError {
    /// Configuration faults cannot heal between attempts.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, LLMError::NotConfigured(_) | LLMError::NoProviderAvailable { .. })
    }
}
