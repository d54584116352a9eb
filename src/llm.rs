pub mod traits;
pub mod error;
pub mod openai;
pub mod gemini;
pub mod ollama;
pub mod factory;

use serde::{Deserialize, Serialize};

pub use error::LLMError;
pub use factory::ProviderFactory;
pub use traits::Provider;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// One `send` call: system prompt, an opaque context blob, the user-facing
/// message and sampling settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SendRequest {
    pub system_prompt: String,
    #[serde(default)]
    pub context: String,
    pub message: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl SendRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            context: context.into(),
            message: message.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// The user turn as sent to chat backends: context blob, blank line, message.
    pub fn user_content(&self) -> String {
        if self.context.trim().is_empty() {
            self.message.clone()
        } else {
            format!("{}\n\n{}", self.context, self.message)
        }
    }
}

/// Result type for LLM operations.
pub type LLMResult<T> = std::result::Result<T, error::LLMError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_prepended_to_message() {
        let req = SendRequest::new("sys", "Colony: 3 colonists", "How are we doing?");
        assert_eq!(req.user_content(), "Colony: 3 colonists\n\nHow are we doing?");
        assert_eq!(SendRequest::new("sys", " ", "hi").user_content(), "hi");
    }
}
