//! Local backend served by an Ollama daemon.

use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};

use crate::config::LocalSettings;
use crate::llm::{LLMResult, SendRequest, error::LLMError, traits::Provider};

/// Default model name used when no model is specified.
/// Adjust this to match the model name you have installed in your local Ollama.
/// Common names: "llama3.2", "llama3", "qwen2.5", or custom names from `ollama list`.
pub const DEFAULT_MODEL: &str = "llama3.2";

pub use ollama_rs::{
    Ollama as OllamaClient,
    error::OllamaError,
    generation::chat::{ChatMessage, request::ChatMessageRequest},
    models::ModelOptions,
};

#[derive(Debug, Clone)]
pub struct Ollama {
    pub(crate) client: Arc<OllamaClient>,
    pub(crate) model: String,
    pub(crate) enabled: bool,
}

impl Ollama {
    /// Create an `Ollama` wrapper using the provided client and the default model.
    ///
    /// If your local Ollama uses a different default model name, change
    /// `DEFAULT_MODEL` or call `Ollama::with_model`.
    pub fn new(client: Arc<OllamaClient>) -> Self {
        Self {
            client,
            model: DEFAULT_MODEL.to_string(),
            enabled: true,
        }
    }

    /// Build from `[providers.local]`. The backend only counts as available
    /// when `enabled = true` and the host parses; availability never probes
    /// the daemon.
    pub fn from_settings(settings: &LocalSettings) -> Self {
        let (client, enabled) = match settings.endpoint() {
            Ok(url) => (OllamaClient::from_url(url), settings.enabled),
            Err(err) => {
                tracing::warn!(%err, "local backend disabled");
                (OllamaClient::default(), false)
            }
        };
        Self {
            client: Arc::new(client),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            enabled,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn generate_request(&self, request: &SendRequest) -> ChatMessageRequest {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatMessage::system(request.system_prompt.clone()));
        }
        messages.push(ChatMessage::user(request.user_content()));
        let options = ModelOptions::default()
            .temperature(request.temperature)
            .num_predict(i32::try_from(request.max_tokens).unwrap_or(i32::MAX));
        ChatMessageRequest::new(self.model.clone(), messages).options(options)
    }
}

impl Default for Ollama {
    fn default() -> Self {
        let client = Arc::new(OllamaClient::default());
        Ollama::new(client)
    }
}

impl Provider for Ollama {
    fn name(&self) -> &str {
        "local"
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    fn send<'a>(&'a self, request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        async move {
            if !self.enabled {
                return Err(LLMError::NotConfigured("local".to_string()));
            }
            tracing::debug!(model = %self.model, "sending ollama chat request");
            let response = self.client.send_chat_messages(self.generate_request(request)).await?;
            let content = response.message.content;
            if content.trim().is_empty() {
                return Err(LLMError::EmptyResponse("local".to_string()));
            }
            Ok(content)
        }
        .boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        async move {
            match self.client.list_local_models().await {
                Ok(models) => {
                    let found = models.iter().any(|m| m.name.starts_with(&self.model));
                    if !found {
                        tracing::warn!(model = %self.model, "ollama is up but the model is not pulled");
                    }
                    true
                }
                Err(err) => {
                    tracing::warn!(%err, "ollama connection test failed");
                    false
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_backend_is_unavailable() {
        let local = Ollama::default().enabled(false);
        assert!(!local.is_available());
        assert_eq!(local.name(), "local");
    }

    #[test]
    fn unparsable_host_disables_instead_of_panicking() {
        let settings = LocalSettings {
            enabled: true,
            host: "http://".to_string(),
            ..LocalSettings::default()
        };
        let local = Ollama::from_settings(&settings);
        assert!(!local.is_available());

        let settings = LocalSettings {
            enabled: true,
            ..LocalSettings::default()
        };
        let local = Ollama::from_settings(&settings);
        assert!(local.is_available());
        assert_eq!(local.client.url().as_str(), "http://localhost:11434/");
    }

    #[tokio::test]
    async fn disabled_backend_refuses_to_send() {
        let local = Ollama::default().enabled(false);
        let err = local.send(&SendRequest::new("", "", "hi")).await.unwrap_err();
        assert!(matches!(err, LLMError::NotConfigured(_)));
    }
}
