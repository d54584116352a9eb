use serde::{Serialize, Deserialize};

use super::traits::Tool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgSchema {
    pub name: String,
    pub arg_type: String,
    pub description: String,
    pub required: bool,
}

impl ArgSchema {
    pub fn new(name: impl Into<String>, arg_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type: arg_type.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgSchema>,
}

impl ToolSchema {
    pub fn from_tool(name: impl Into<String>, tool: &dyn Tool) -> Self {
        Self {
            name: name.into(),
            description: tool.description().to_string(),
            args: tool.params(),
        }
    }

    /// One catalogue line: `- name(a, b?): description`.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            return format!("- {}: {}", self.name, self.description);
        }
        let args = self
            .args
            .iter()
            .map(|arg| if arg.required { arg.name.clone() } else { format!("{}?", arg.name) })
            .collect::<Vec<_>>()
            .join(", ");
        format!("- {}({}): {}", self.name, args, self.description)
    }
}
