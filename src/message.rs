
use serde::{Serialize, Deserialize};

/// Who produced a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,           // Runtime notes injected by the agent
    User,             // Caller input
    Assistant,        // Model output (thought, action, answer)
    Observation,      // Tool result fed back to the model
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Observation => "observation",
        }
    }
}

/// One entry of an agent's conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,  // Tool name for observations
}


impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            name: None,
        }
    }

    pub fn observation(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Observation,
            content: content.into(),
            name: Some(name.into()),
        }
    }

    /// Plain-text line used when the history is replayed to the model.
    pub fn render(&self) -> &str {
        &self.content
    }
}
