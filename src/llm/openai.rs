//! OpenAI-compatible chat completions backend (OpenAI, DeepSeek).
// see: https://github.com/64bit/async-openai/tree/main/examples/chat
pub use async_openai::{
    Client,
    config::{Config, OpenAIConfig},
};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use futures::{FutureExt, future::BoxFuture};

use crate::config::CloudSettings;
use crate::llm::{LLMResult, SendRequest, error::LLMError, traits::Provider};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_DEFAULT_MODEL: &str = "deepseek-chat";

/// Chat-completions provider. The same wire format serves OpenAI and DeepSeek;
/// only base URL, model and key differ.
#[derive(Debug, Clone)]
pub struct OpenAI {
    name: String,
    client: Client<OpenAIConfig>,
    model: String,
    has_key: bool,
}

impl OpenAI {
    /// OpenAI with the key from `OPENAI_API_KEY`.
    pub fn new() -> Self {
        Self::build("openai", std::env::var("OPENAI_API_KEY").ok(), OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL)
    }

    /// DeepSeek with the key from `DEEPSEEK_API_KEY`.
    pub fn deepseek() -> Self {
        Self::build(
            "deepseek",
            std::env::var("DEEPSEEK_API_KEY").ok(),
            DEEPSEEK_BASE_URL,
            DEEPSEEK_DEFAULT_MODEL,
        )
    }

    pub fn with_api_key(name: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self::build(name, Some(api_key.into()), OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL)
    }

    /// Build from a `[providers.<name>]` table, falling back to the given defaults.
    pub fn from_settings(
        name: impl Into<String>,
        settings: &CloudSettings,
        default_base_url: &str,
        default_model: &str,
    ) -> Self {
        Self::build(
            name,
            settings.resolve_api_key(),
            settings.base_url.as_deref().unwrap_or(default_base_url),
            settings.model.as_deref().unwrap_or(default_model),
        )
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build(name: impl Into<String>, api_key: Option<String>, base_url: &str, model: &str) -> Self {
        let api_key = api_key.filter(|key| !key.trim().is_empty());
        let config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key.clone().unwrap_or_default());
        Self {
            name: name.into(),
            client: Client::with_config(config),
            model: model.to_string(),
            has_key: api_key.is_some(),
        }
    }

    fn generate_request(&self, request: &SendRequest) -> LLMResult<CreateChatCompletionRequest> {
        let mut messages = Vec::with_capacity(2);
        if !request.system_prompt.is_empty() {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(request.system_prompt.clone())
                    .build()?,
            ));
        }
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_content())
                .build()?,
        ));

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(request.temperature);
        // DeepSeek only understands the legacy field
        #[allow(deprecated)]
        builder.max_tokens(request.max_tokens);
        Ok(builder.build()?)
    }
}

impl Default for OpenAI {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.has_key
    }

    fn send<'a>(&'a self, request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        async move {
            if !self.has_key {
                return Err(LLMError::NotConfigured(self.name.clone()));
            }
            let body = self.generate_request(request)?;
            tracing::debug!(provider = %self.name, model = %self.model, "sending chat completion");

            let response = self.client.chat().create(body).await?;
            let content = response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default();
            if content.trim().is_empty() {
                return Err(LLMError::EmptyResponse(self.name.clone()));
            }
            Ok(content)
        }
        .boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        async move {
            if !self.has_key {
                return false;
            }
            match self.client.models().list().await {
                Ok(_) => true,
                Err(err) => {
                    tracing::warn!(provider = %self.name, %err, "connection test failed");
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

    fn provider_for(server: &mockito::ServerGuard) -> OpenAI {
        OpenAI::build("deepseek", Some("sk-test".into()), &server.url(), "deepseek-chat")
    }

    #[tokio::test]
    async fn sends_chat_completion() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJsonString(
                r#"{"model": "deepseek-chat", "max_tokens": 500}"#.to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "id": "chatcmpl-1",
                    "object": "chat.completion",
                    "created": 1700000000,
                    "model": "deepseek-chat",
                    "choices": [{
                        "index": 0,
                        "message": {"role": "assistant", "content": "[ANSWER]: All quiet."},
                        "finish_reason": "stop"
                    }]
                }"#,
            )
            .create_async()
            .await;

        let provider = provider_for(&server);
        let reply = provider
            .send(&SendRequest::new("You narrate a colony.", "", "status?"))
            .await
            .unwrap();
        assert_eq!(reply, "[ANSWER]: All quiet.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let provider = OpenAI::build("openai", Some("  ".into()), OPENAI_BASE_URL, OPENAI_DEFAULT_MODEL);
        assert!(!provider.is_available());
        let err = provider.send(&SendRequest::new("", "", "hi")).await.unwrap_err();
        assert!(matches!(err, LLMError::NotConfigured(name) if name == "openai"));
    }
}
