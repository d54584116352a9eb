use crate::llm::error::LLMError;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent '{0}' is already running")]
    Busy(String),

    #[error("loop limit reached after {iterations} iterations without an answer")]
    LoopLimitReached { iterations: usize },

    #[error("LLM error: {0}")]
    Provider(#[from] LLMError),

    #[error("agent '{0}' was stopped")]
    Stopped(String),
}

impl AgentError {
    /// Stable reason code for callers and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::Busy(_) => "busy",
            AgentError::LoopLimitReached { .. } => "loop_limit",
            AgentError::Provider(LLMError::EmptyResponse(_)) => "empty_response",
            AgentError::Provider(_) => "provider",
            AgentError::Stopped(_) => "stopped",
        }
    }
}
