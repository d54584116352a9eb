use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::error::ToolError;
use super::params::ToolParams;
use super::schema::ArgSchema;
use super::traits::Tool;

type Handler = dyn Fn(ToolParams) -> BoxFuture<'static, anyhow::Result<Value>> + Send + Sync;

/// A tool backed by an async closure.
///
/// ```ignore
/// let tool = FnTool::new("get_colonists", "List colonists", Vec::new(), move |_| {
///     let names = snapshot.clone();
///     async move { Ok(serde_json::to_value(&*names)?) }
/// });
/// ```
#[derive(Clone)]
pub struct FnTool {
    name: String,
    description: String,
    params: Vec<ArgSchema>,
    handler: Arc<Handler>,
}

impl FnTool {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<ArgSchema>,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            params,
            handler: Arc::new(move |params| handler(params).boxed()),
        }
    }

    pub fn with_param(mut self, param: ArgSchema) -> Self {
        self.params.push(param);
        self
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn params(&self) -> Vec<ArgSchema> {
        self.params.clone()
    }

    async fn execute(&self, params: ToolParams) -> Result<Value, ToolError> {
        (self.handler)(params).await.map_err(|err| ToolError::ExecutionError {
            name: self.name.clone(),
            reason: format!("{:#}", err),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn closure_errors_keep_context() {
        let tool = FnTool::new("stockpile", "Count an item", Vec::new(), |params: ToolParams| async move {
            let item: String = params.get_as("item")?;
            anyhow::ensure!(item == "wood", "no stockpile entry for {}", item);
            Ok(json!(120))
        })
        .with_param(ArgSchema::new("item", "string", "item def name"));

        assert_eq!(tool.params().len(), 1);
        let ok = tool.execute(ToolParams::new().with("item", "wood")).await.unwrap();
        assert_eq!(ok, json!(120));

        let err = tool.execute(ToolParams::new().with("item", "steel")).await.unwrap_err();
        assert!(err.to_string().contains("no stockpile entry for steel"));
    }
}
