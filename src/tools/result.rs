use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform outcome of one dispatched tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResult {
    Success { data: Value },
    Failure { error: String },
}

impl ToolResult {
    pub fn success(data: impl Into<Value>) -> Self {
        ToolResult::Success { data: data.into() }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        ToolResult::Failure { error: error.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ToolResult::Success { data } => Some(data),
            ToolResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ToolResult::Success { .. } => None,
            ToolResult::Failure { error } => Some(error),
        }
    }

    /// Text fed back to the model. String payloads pass through untouched,
    /// anything else is compact JSON; failures read `Error: <reason>`.
    pub fn to_observation(&self) -> String {
        match self {
            ToolResult::Success { data: Value::String(text) } => text.clone(),
            ToolResult::Success { data } => data.to_string(),
            ToolResult::Failure { error } => format!("Error: {}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn observation_text() {
        assert_eq!(ToolResult::success("plain").to_observation(), "plain");
        assert_eq!(
            ToolResult::success(json!([{"name": "Ava"}])).to_observation(),
            r#"[{"name":"Ava"}]"#
        );
        assert_eq!(ToolResult::failure("no map").to_observation(), "Error: no map");
    }
}
