#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{FutureExt, future::BoxFuture};
use parking_lot::Mutex;
use rimagent::prelude::*;
use serde_json::Value;
use tokio::time::Instant;

/// Provider replaying canned replies; once the script runs out it repeats
/// `fallback` (or fails when there is none).
pub struct ScriptedProvider {
    name: String,
    replies: Mutex<VecDeque<String>>,
    fallback: Option<String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<SendRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            name: "scripted".to_string(),
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fallback: None,
            delay: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that answers `reply` forever.
    pub fn repeating(reply: &str) -> Self {
        Self {
            fallback: Some(reply.to_string()),
            ..Self::new(&[])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        true
    }

    fn send<'a>(&'a self, request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.replies.lock().pop_front();
            next.or_else(|| self.fallback.clone())
                .ok_or_else(|| LLMError::InvalidResponse("script exhausted".into()))
        }
        .boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }
}

/// Fails `failures` times, then answers `reply`. Records when each attempt
/// started, on the tokio clock.
pub struct FlakyProvider {
    failures: usize,
    reply: String,
    pub attempts: Mutex<Vec<Instant>>,
}

impl FlakyProvider {
    pub fn new(failures: usize, reply: &str) -> Self {
        Self {
            failures,
            reply: reply.to_string(),
            attempts: Mutex::new(Vec::new()),
        }
    }
}

impl Provider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn send<'a>(&'a self, _request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        async move {
            let attempt = {
                let mut attempts = self.attempts.lock();
                attempts.push(Instant::now());
                attempts.len()
            };
            if attempt <= self.failures {
                Err(LLMError::Api {
                    status: 503,
                    message: format!("overloaded (attempt {})", attempt),
                })
            } else {
                Ok(self.reply.clone())
            }
        }
        .boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        async { true }.boxed()
    }
}

/// Stand-in availability probe for factory tests.
pub struct StaticProvider {
    pub name: &'static str,
    pub available: bool,
}

impl Provider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn send<'a>(&'a self, _request: &'a SendRequest) -> BoxFuture<'a, LLMResult<String>> {
        let reply = format!("[ANSWER]: hello from {}", self.name);
        async move { Ok(reply) }.boxed()
    }

    fn test_connection(&self) -> BoxFuture<'_, bool> {
        let available = self.available;
        async move { available }.boxed()
    }
}

/// Tool that always throws.
pub struct PanickingTool;

#[async_trait::async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "scan_map"
    }

    fn description(&self) -> &str {
        "Scan the map for resources"
    }

    async fn execute(&self, _params: ToolParams) -> Result<Value, ToolError> {
        panic!("map grid not initialised")
    }
}

pub fn colony_tools() -> Arc<ToolRegistry> {
    let tools = Arc::new(ToolRegistry::new());
    tools.register_tool(FnTool::new(
        "get_colonists",
        "List colonists with their names",
        Vec::new(),
        |_| async { Ok(serde_json::json!([{"name": "Ava"}])) },
    ));
    tools
}
