//! Read-only tools over state captured on the owning thread.
//!
//! A host simulation publishes an immutable snapshot from its own thread
//! (e.g. once per tick); tools running on async tasks only ever read the last
//! published `Arc<S>` and never touch the live state.

use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use super::error::ToolError;
use super::params::ToolParams;
use super::schema::ArgSchema;
use super::traits::Tool;

/// Holder of the most recently published snapshot.
#[derive(Debug)]
pub struct SnapshotCell<S> {
    current: RwLock<Arc<S>>,
}

impl<S> SnapshotCell<S> {
    pub fn new(initial: S) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Replace the snapshot. Call from the thread that owns the live state.
    pub fn publish(&self, snapshot: S) {
        *self.current.write() = Arc::new(snapshot);
    }

    pub fn current(&self) -> Arc<S> {
        self.current.read().clone()
    }
}

impl<S: Default> Default for SnapshotCell<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

type Accessor<S> = dyn Fn(&S, &ToolParams) -> anyhow::Result<Value> + Send + Sync;

/// A tool answering from a [`SnapshotCell`] through a pure accessor.
pub struct SnapshotTool<S> {
    name: String,
    description: String,
    params: Vec<ArgSchema>,
    cell: Arc<SnapshotCell<S>>,
    accessor: Box<Accessor<S>>,
}

impl<S> SnapshotTool<S>
where
    S: Send + Sync + 'static,
{
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        cell: Arc<SnapshotCell<S>>,
        accessor: F,
    ) -> Self
    where
        F: Fn(&S, &ToolParams) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            cell,
            accessor: Box::new(accessor),
        }
    }

    pub fn with_param(mut self, param: ArgSchema) -> Self {
        self.params.push(param);
        self
    }
}

#[async_trait::async_trait]
impl<S> Tool for SnapshotTool<S>
where
    S: Send + Sync + 'static,
{
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
        let snapshot = self.cell.current();
        (self.accessor)(&snapshot, &params).map_err(|err| ToolError::ExecutionError {
            name: self.name.clone(),
            reason: format!("{:#}", err),
        })
    }
}
