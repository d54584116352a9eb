use super::types::AgentExecuteResult;

/// Trait describing runtime operations an agent can perform.
#[async_trait::async_trait]
pub trait AgentRunner: Send + Sync {
    /// Run one user turn to a final answer or a classified failure.
    async fn execute(&self, user_message: &str) -> AgentExecuteResult;
}

/// Supplies relevance-filtered memory text for the `{MEMORY}` slot.
#[async_trait::async_trait]
pub trait MemorySource: Send + Sync {
    async fn relevant_context(&self, query: &str) -> String;

    /// Called with each finished exchange. Defaults to doing nothing.
    async fn record(&self, _speaker: &str, _text: &str) {}
}

/// Supplies the persona/style block for the `{PERSONA}` slot.
#[async_trait::async_trait]
pub trait PersonaSource: Send + Sync {
    async fn persona(&self) -> String;
}
