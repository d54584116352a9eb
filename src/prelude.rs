pub use crate::agent::{
    error::AgentError,
    traits::{AgentRunner, MemorySource, PersonaSource},
    types::{ActionResult, Agent, AgentResult, AgentState, AgentStats},
};
pub use crate::concurrency::{ConcurrencyManager, ConcurrencyStats, GatedProvider, RetryPolicy};
pub use crate::config::{AgentConfig, ResponseFormat, RuntimeConfig};
pub use crate::llm::{
    LLMResult, SendRequest, error::LLMError, factory::ProviderFactory, traits::Provider,
};
pub use crate::message::{Message, MessageRole};
pub use crate::parser::{ActionArg, ActionCall, ParsedResponse};
pub use crate::tools::{
    ArgSchema, FnTool, SnapshotCell, SnapshotTool, Tool, ToolError, ToolParams, ToolRegistry, ToolResult,
};
pub use crate::tool;
