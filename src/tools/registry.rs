use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::RwLock;

use crate::parser::{ActionArg, ActionCall};

use super::error::ToolError;
use super::params::ToolParams;
use super::result::ToolResult;
use super::schema::ToolSchema;
use super::traits::Tool;

struct RegisteredTool {
    name: String,
    tool: Arc<dyn Tool>,
    /// Declared parameter names, read once at registration.
    param_names: Vec<String>,
}

/// Shared catalogue of tools, keyed by case-insensitive name.
///
/// Registration takes the write lock; lookups and dispatch only hold the read
/// lock long enough to clone the `Arc`, so a slow tool never blocks other
/// callers. Inject one registry per agent group (or per test) instead of a
/// process-wide static.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the tool stored under `name`. Last writer wins.
    pub fn register(&self, name: impl Into<String>, tool: Arc<dyn Tool>) -> &Self {
        let name = name.into();
        let param_names = tool.params().into_iter().map(|arg| arg.name).collect();
        let replaced = self
            .tools
            .write()
            .insert(
                name.to_lowercase(),
                RegisteredTool {
                    name: name.clone(),
                    tool,
                    param_names,
                },
            )
            .is_some();
        if replaced {
            tracing::info!(tool = %name, "replaced registered tool");
        } else {
            tracing::info!(tool = %name, "registered tool");
        }
        self
    }

    /// Register `tool` under its own name.
    pub fn register_tool<T: Tool + 'static>(&self, tool: T) -> &Self {
        let name = tool.name().to_string();
        self.register(name, Arc::new(tool))
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.write().remove(&name.to_lowercase()).map(|entry| entry.tool)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(&name.to_lowercase()).map(|entry| entry.tool.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.read().contains_key(&name.to_lowercase())
    }

    /// Registered names as given at registration, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.read().values().map(|entry| entry.name.clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .read()
            .values()
            .map(|entry| ToolSchema::from_tool(entry.name.clone(), entry.tool.as_ref()))
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    /// Deterministic catalogue for the system prompt, one line per tool.
    pub fn catalogue(&self) -> String {
        self.schemas()
            .iter()
            .map(ToolSchema::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Bind call arguments onto `name`'s declared parameters.
    ///
    /// Named arguments are taken as-is. Positional argument `i` fills the
    /// `i`-th declared parameter unless a named argument already set it;
    /// anything left over is kept under `arg{i}`.
    pub fn bind(&self, name: &str, args: &[ActionArg]) -> ToolParams {
        let declared = self
            .tools
            .read()
            .get(&name.to_lowercase())
            .map(|entry| entry.param_names.clone())
            .unwrap_or_default();

        let mut params = ToolParams::new();
        for arg in args {
            if let ActionArg::Named { key, value } = arg {
                params.insert(key.clone(), value.clone());
            }
        }

        let positional = args.iter().filter_map(|arg| match arg {
            ActionArg::Positional(value) => Some(value),
            ActionArg::Named { .. } => None,
        });
        for (i, value) in positional.enumerate() {
            let key = match declared.get(i) {
                Some(param) if !params.contains(param) => param.clone(),
                _ => format!("arg{}", i),
            };
            params.insert(key, value.clone());
        }
        params
    }

    /// Run the tool registered as `name`. Never fails: unknown names, tool
    /// errors and panics all come back as [`ToolResult::Failure`].
    pub async fn execute(&self, name: &str, params: ToolParams) -> ToolResult {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = %name, "dispatch to unknown tool");
            return ToolResult::failure(ToolError::ToolNotFound(name.to_string()).to_string());
        };

        match AssertUnwindSafe(tool.execute(params)).catch_unwind().await {
            Ok(Ok(data)) => {
                tracing::debug!(tool = %name, "tool succeeded");
                ToolResult::success(data)
            }
            Ok(Err(err)) => {
                tracing::warn!(tool = %name, %err, "tool failed");
                ToolResult::failure(err.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                tracing::warn!(tool = %name, %reason, "tool panicked");
                ToolResult::failure(
                    ToolError::Panicked {
                        name: name.to_string(),
                        reason,
                    }
                    .to_string(),
                )
            }
        }
    }

    /// Bind `call`'s arguments and execute it.
    pub async fn dispatch(&self, call: &ActionCall) -> ToolResult {
        let params = self.bind(&call.name, &call.args);
        self.execute(&call.name, params).await
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ArgSchema, FnTool};
    use serde_json::{json, Value};

    struct Echo;

    #[async_trait::async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the bound parameters back"
        }
        fn params(&self) -> Vec<ArgSchema> {
            vec![
                ArgSchema::new("target", "string", "who"),
                ArgSchema::new("amount", "integer", "how many").optional(),
            ]
        }
        async fn execute(&self, params: ToolParams) -> Result<Value, ToolError> {
            Ok(params.into_value())
        }
    }

    struct Broken;

    #[async_trait::async_trait]
    impl Tool for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        fn description(&self) -> &str {
            "Always panics"
        }
        async fn execute(&self, _params: ToolParams) -> Result<Value, ToolError> {
            panic!("map not loaded")
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_a_failure_result() {
        let registry = ToolRegistry::new();
        let result = registry.execute("summon_dragon", ToolParams::new()).await;
        assert_eq!(result.error(), Some("unknown tool: summon_dragon"));
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let registry = ToolRegistry::new();
        registry.register_tool(Broken);
        let result = registry.execute("broken", ToolParams::new()).await;
        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("map not loaded"));
    }

    #[tokio::test]
    async fn lookup_ignores_case_and_last_writer_wins() {
        let registry = ToolRegistry::new();
        registry.register("Echo", Arc::new(Echo));
        assert!(registry.contains("ECHO"));

        let replacement = FnTool::new("echo", "stub", Vec::new(), |_| async { Ok(json!("stubbed")) });
        registry.register("echo", Arc::new(replacement));
        assert_eq!(registry.len(), 1);
        let result = registry.execute("echo", ToolParams::new()).await;
        assert_eq!(result.data(), Some(&json!("stubbed")));
    }

    #[test]
    fn positional_overflow_keeps_synthetic_keys() {
        let registry = ToolRegistry::new();
        registry.register_tool(Echo);
        let args = vec![
            ActionArg::positional("Ava"),
            ActionArg::positional("3"),
            ActionArg::positional("extra"),
        ];
        let params = registry.bind("echo", &args);
        assert_eq!(params.get_str("target"), Some("Ava"));
        assert_eq!(params.get_str("amount"), Some("3"));
        assert_eq!(params.get_str("arg2"), Some("extra"));
    }

    #[test]
    fn named_argument_wins_over_positional_slot() {
        let registry = ToolRegistry::new();
        registry.register_tool(Echo);
        let args = vec![ActionArg::positional("Bo"), ActionArg::named("target", "Ava")];
        let params = registry.bind("echo", &args);
        assert_eq!(params.get_str("target"), Some("Ava"));
        assert_eq!(params.get_str("arg0"), Some("Bo"));
    }

    #[test]
    fn catalogue_is_sorted() {
        let registry = ToolRegistry::new();
        registry.register_tool(Echo);
        registry.register_tool(Broken);
        assert_eq!(
            registry.catalogue(),
            "- broken: Always panics\n- echo(target, amount?): Echo the bound parameters back"
        );
    }

    #[tokio::test]
    async fn panic_failure_names_the_tool() {
        let registry = ToolRegistry::new();
        registry.register_tool(Broken);
        let result = registry.execute("broken", ToolParams::new()).await;
        assert_eq!(result.error(), Some("Tool 'broken' panicked: map not loaded"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn registration_and_dispatch_run_concurrently() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register_tool(Echo);

        let mut handles = Vec::new();
        for i in 0..16 {
            let writer = registry.clone();
            handles.push(tokio::spawn(async move {
                let name = format!("zone_{}", i);
                writer.register_tool(FnTool::new(name.clone(), "Zone report", Vec::new(), move |_| {
                    let name = name.clone();
                    async move { Ok(json!(name)) }
                }));
                ToolResult::success(json!("registered"))
            }));
            let reader = registry.clone();
            handles.push(tokio::spawn(async move {
                let call = ActionCall::new("echo").with_arg(ActionArg::positional(format!("pawn-{}", i)));
                reader.dispatch(&call).await
            }));
        }

        for handle in handles {
            let result = handle.await.expect("task panicked");
            assert!(result.is_success(), "{:?}", result);
        }
        assert_eq!(registry.len(), 17);
        for i in 0..16 {
            let result = registry.execute(&format!("ZONE_{}", i), ToolParams::new()).await;
            assert_eq!(result.data(), Some(&json!(format!("zone_{}", i))));
        }
    }
}
