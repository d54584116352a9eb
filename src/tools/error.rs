

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    ToolNotFound(String),

    #[error("Tool execution error in '{name}': {reason}")]
    ExecutionError {
        name: String,
        reason: String,
    },

    #[error("Tool '{name}' panicked: {reason}")]
    Panicked {
        name: String,
        reason: String,
    },

    #[error("Tool parameters do not match: {0}")]
    ParamsNotMatched(String),

    #[error("Tool output is not serializable: {0}")]
    Serialization(#[from] serde_json::Error),
}
