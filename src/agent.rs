use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::concurrency::ConcurrencyManager;
use crate::config::AgentConfig;
use crate::llm::{SendRequest, error::LLMError, traits::Provider};
use crate::message::Message;
use crate::parser;
use crate::tools::ToolRegistry;

pub mod types;
pub mod error;
pub mod traits;
pub mod context;
pub mod prompt;

use context::Conversation;
use error::AgentError;
use traits::{AgentRunner, MemorySource, PersonaSource};
use types::{ActionResult, Agent, AgentExecuteResult, AgentResult, AgentState, AgentStats, Counters, Diagnostics};

impl Agent {
    /// Create an agent with the multi-turn ReAct preset and a private
    /// [`ConcurrencyManager`] with default capacity and retry policy.
    pub fn new(id: impl Into<String>, provider: Arc<dyn Provider>, tools: Arc<ToolRegistry>) -> Self {
        let config = AgentConfig::react();
        Self {
            id: id.into(),
            provider,
            gate: Arc::new(ConcurrencyManager::default()),
            tools,
            system_prompt: RwLock::new(prompt::default_template(config.format).to_string()),
            conversation: Mutex::new(Conversation::new(config.history_limit)),
            config,
            memory: None,
            persona: None,
            state: Mutex::new(AgentState::Idle),
            stop_requested: AtomicBool::new(false),
            counters: Counters::default(),
            diagnostics: Mutex::new(Diagnostics::default()),
        }
    }

    /// Replace the loop settings. Resets the prompt template to the one
    /// matching `config.format` and re-caps the history.
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        *self.system_prompt.get_mut() = prompt::default_template(config.format).to_string();
        self.conversation = Mutex::new(Conversation::new(config.history_limit));
        self.config = config;
        self
    }

    /// Share `gate` with other agents instead of the private default one.
    pub fn with_gate(mut self, gate: Arc<ConcurrencyManager>) -> Self {
        self.gate = gate;
        self
    }

    pub fn gate(&self) -> &Arc<ConcurrencyManager> {
        &self.gate
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemorySource>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_persona(mut self, persona: Arc<dyn PersonaSource>) -> Self {
        self.persona = Some(persona);
        self
    }

    pub fn with_system_prompt(self, template: impl Into<String>) -> Self {
        self.set_system_prompt(template);
        self
    }

    /// Set or replace the prompt template. Takes effect on the next run.
    pub fn set_system_prompt(&self, template: impl Into<String>) {
        *self.system_prompt.write() = template.into();
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> AgentState {
        *self.state.lock()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn history(&self) -> Vec<Message> {
        self.conversation.lock().iter().cloned().collect()
    }

    /// Ask a running loop to stop before its next provider call.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Clear history, counters and diagnostics. Identity and prompt stay.
    pub fn reset(&self) -> Result<(), AgentError> {
        let mut state = self.state.lock();
        if *state == AgentState::Running {
            return Err(AgentError::Busy(self.id.clone()));
        }
        self.conversation.lock().clear();
        *self.diagnostics.lock() = Diagnostics::default();
        self.counters.total.store(0, Ordering::SeqCst);
        self.counters.succeeded.store(0, Ordering::SeqCst);
        self.counters.failed.store(0, Ordering::SeqCst);
        *state = AgentState::Idle;
        Ok(())
    }

    pub fn clear_history(&self) {
        self.conversation.lock().clear();
    }

    pub fn stats(&self) -> AgentStats {
        AgentStats {
            state: self.state(),
            total_requests: self.counters.total.load(Ordering::SeqCst),
            succeeded: self.counters.succeeded.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
            history_len: self.conversation.lock().len(),
        }
    }

    pub fn last_prompt(&self) -> String {
        self.diagnostics.lock().last_prompt.clone()
    }

    pub fn last_response(&self) -> String {
        self.diagnostics.lock().last_response.clone()
    }

    pub fn last_action_results(&self) -> Vec<ActionResult> {
        self.diagnostics.lock().last_action_results.clone()
    }

    pub fn debug_info(&self) -> String {
        let stats = self.stats();
        format!(
            "Agent: {}\nState: {}\nProvider: {}\nTools: {}\nHistory: {} messages\nStats: {}/{} successful",
            self.id,
            stats.state,
            self.provider.name(),
            self.tools.names().join(", "),
            stats.history_len,
            stats.succeeded,
            stats.total_requests
        )
    }

    fn begin_run(&self) -> Result<RunGuard<'_>, AgentError> {
        let mut state = self.state.lock();
        if *state == AgentState::Running {
            tracing::warn!(agent = %self.id, "rejected run, agent busy");
            return Err(AgentError::Busy(self.id.clone()));
        }
        *state = AgentState::Running;
        Ok(RunGuard { agent: self })
    }

    fn record(&self, message: Message) {
        self.conversation.lock().push(message);
    }

    async fn build_system_prompt(&self, query: &str) -> String {
        let tools = if self.tools.is_empty() {
            "(no tools available)".to_string()
        } else {
            self.tools.catalogue()
        };
        let memory = match &self.memory {
            Some(source) => source.relevant_context(query).await,
            None => String::new(),
        };
        let memory = if memory.trim().is_empty() { "(none)".to_string() } else { memory };
        let persona = match &self.persona {
            Some(source) => source.persona().await,
            None => String::new(),
        };
        let template = self.system_prompt.read().clone();
        prompt::render(&template, &tools, &memory, &persona)
    }

    async fn run_loop(&self, request: &str) -> AgentExecuteResult {
        self.record(Message::user(request));
        let system_prompt = self.build_system_prompt(request).await;
        let mut actions: Vec<ActionResult> = Vec::new();

        let outcome = self.iterate(request, &system_prompt, &mut actions).await;
        self.diagnostics.lock().last_action_results = actions.clone();
        let (answer, iterations) = outcome?;
        Ok(self.finish(request, answer, iterations, actions).await)
    }

    /// The loop body. Returns the answer and the iteration it arrived in;
    /// executed tool calls accumulate in `actions` on every exit path.
    async fn iterate(
        &self,
        request: &str,
        system_prompt: &str,
        actions: &mut Vec<ActionResult>,
    ) -> Result<(String, usize), AgentError> {
        for iteration in 1..=self.config.max_iterations {
            if self.stop_requested.load(Ordering::SeqCst) {
                return Err(AgentError::Stopped(self.id.clone()));
            }

            let rolling = {
                let conversation = self.conversation.lock();
                context::fit_context(
                    &conversation.render_window(self.config.context_window),
                    request,
                    self.config.max_context_chars,
                )
            };
            let send = SendRequest::new(system_prompt, "", rolling)
                .with_temperature(self.config.temperature)
                .with_max_tokens(self.config.max_tokens);
            self.diagnostics.lock().last_prompt =
                format!("--- System Prompt ---\n{}\n\n--- Context ---\n{}", send.system_prompt, send.message);

            tracing::debug!(agent = %self.id, iteration, "calling provider");
            let reply = self.gate.execute(|| self.provider.send(&send)).await?;
            if reply.trim().is_empty() {
                return Err(LLMError::EmptyResponse(self.provider.name().to_string()).into());
            }
            self.diagnostics.lock().last_response = reply.clone();

            let parsed = parser::parse_or_answer(&reply);
            if let Some(thought) = &parsed.thought {
                self.record(Message::assistant(format!("[THOUGHT]: {}", thought)));
            }

            if let Some(answer) = parsed.answer {
                self.record(Message::assistant(format!("[ANSWER]: {}", answer)));
                return Ok((answer, iteration));
            }

            if let Some(call) = parsed.action {
                self.record(Message::assistant(format!("[ACTION]: {}", call)));
                let result = self.tools.dispatch(&call).await;
                let observation =
                    context::truncate_observation(&result.to_observation(), self.config.max_observation_chars);
                self.record(Message::observation(
                    call.name.clone(),
                    format!("[OBSERVATION]: {}", observation),
                ));
                actions.push(ActionResult {
                    tool_name: call.name,
                    result: observation,
                    success: result.is_success(),
                });
                continue;
            }

            if parsed.thought.is_none() {
                // nothing usable in the reply: take it verbatim
                let answer = reply.trim().to_string();
                self.record(Message::assistant(format!("[ANSWER]: {}", answer)));
                return Ok((answer, iteration));
            }
        }

        tracing::warn!(agent = %self.id, iterations = self.config.max_iterations, "loop limit reached");
        Err(AgentError::LoopLimitReached {
            iterations: self.config.max_iterations,
        })
    }

    async fn finish(&self, request: &str, answer: String, iterations: usize, actions: Vec<ActionResult>) -> AgentResult {
        if let Some(memory) = &self.memory {
            memory.record("user", request).await;
            memory.record(&self.id, &answer).await;
        }
        AgentResult {
            answer,
            iterations,
            actions,
        }
    }
}

/// Marks the agent `Running` for the lifetime of one run. A run whose future
/// is dropped before [`RunGuard::finish`] leaves the agent `Stopped` and is
/// counted as failed.
struct RunGuard<'a> {
    agent: &'a Agent,
}

impl RunGuard<'_> {
    fn finish(self, next: AgentState) {
        *self.agent.state.lock() = next;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.agent.state.lock();
        if *state == AgentState::Running {
            *state = AgentState::Stopped;
            self.agent.counters.failed.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(agent = %self.agent.id, "run dropped before completion");
        }
    }
}

#[async_trait::async_trait]
impl AgentRunner for Agent {
    async fn execute(&self, user_message: &str) -> AgentExecuteResult {
        let guard = self.begin_run()?;
        self.stop_requested.store(false, Ordering::SeqCst);
        self.counters.total.fetch_add(1, Ordering::SeqCst);
        tracing::info!(agent = %self.id, "run started");

        let outcome = self.run_loop(user_message.trim()).await;

        let next = match &outcome {
            Ok(result) => {
                self.counters.succeeded.fetch_add(1, Ordering::SeqCst);
                tracing::info!(agent = %self.id, iterations = result.iterations, "run finished");
                AgentState::Idle
            }
            Err(err) => {
                self.counters.failed.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(agent = %self.id, code = err.code(), %err, "run failed");
                match err {
                    AgentError::LoopLimitReached { .. } | AgentError::Busy(_) => AgentState::Idle,
                    AgentError::Stopped(_) => AgentState::Stopped,
                    AgentError::Provider(_) => AgentState::Error,
                }
            }
        };
        guard.finish(next);
        outcome
    }
}
