use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::context::Conversation;
use super::error::AgentError;
use super::traits::{MemorySource, PersonaSource};
use crate::concurrency::ConcurrencyManager;
use crate::config::AgentConfig;
use crate::llm::traits::Provider;
use crate::tools::ToolRegistry;

/// Lifecycle of an [`Agent`]. `Running` is exclusive: a second run is
/// refused with [`AgentError::Busy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentState {
    #[default]
    Idle,
    Running,
    Error,
    Stopped,
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            AgentState::Idle => "Idle",
            AgentState::Running => "Running",
            AgentState::Error => "Error",
            AgentState::Stopped => "Stopped",
        };
        f.write_str(text)
    }
}

/// Driver of one logical conversation: a ReAct loop against a provider,
/// dispatching tool calls through a shared registry.
pub struct Agent {
    pub(crate) id: String,

    pub(crate) provider: Arc<dyn Provider>,

    /// Every provider call goes through this gate. Private to the agent
    /// unless shared with `with_gate`.
    pub(crate) gate: Arc<ConcurrencyManager>,

    /// Shared tool catalogue, injected rather than global.
    pub(crate) tools: Arc<ToolRegistry>,

    pub(crate) config: AgentConfig,

    pub(crate) memory: Option<Arc<dyn MemorySource>>,
    pub(crate) persona: Option<Arc<dyn PersonaSource>>,

    /// System prompt template with `{TOOLS}`, `{MEMORY}` and `{PERSONA}` slots.
    pub(crate) system_prompt: RwLock<String>,

    pub(crate) state: Mutex<AgentState>,
    pub(crate) conversation: Mutex<Conversation>,
    pub(crate) stop_requested: AtomicBool,
    pub(crate) counters: Counters,
    pub(crate) diagnostics: Mutex<Diagnostics>,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) total: AtomicU64,
    pub(crate) succeeded: AtomicU64,
    pub(crate) failed: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Diagnostics {
    pub(crate) last_prompt: String,
    pub(crate) last_response: String,
    pub(crate) last_action_results: Vec<ActionResult>,
}

/// One tool call executed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub tool_name: String,
    /// Observation text as fed back to the model (possibly truncated).
    pub result: String,
    pub success: bool,
}

/// Successful outcome of [`AgentRunner::execute`](super::traits::AgentRunner::execute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    pub answer: String,
    /// Provider round trips used, the answering one included.
    pub iterations: usize,
    pub actions: Vec<ActionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub state: AgentState,
    pub total_requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub history_len: usize,
}

pub type AgentExecuteResult = Result<AgentResult, AgentError>;
