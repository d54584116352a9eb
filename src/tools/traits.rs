use serde_json::Value;

use super::error::ToolError;
use super::params::ToolParams;

// re-export ArgSchema for macros use
pub use super::schema::ArgSchema;

/// A named capability the model can invoke.
///
/// `params` is the declared, ordered parameter list. Positional arguments
/// from a tag-form call are bound onto these names, so it is read once when
/// the tool is registered.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn params(&self) -> Vec<ArgSchema> {
        Vec::new()
    }
    async fn execute(&self, params: ToolParams) -> Result<Value, ToolError>;
}
