//! Structured-response parser.
//!
//! Turns one raw model reply into a [`ParsedResponse`]. Two grammars are
//! accepted and picked by sniffing the reply:
//!
//! * a JSON envelope `{"thought": .., "action": {"name": .., "args": ..}, "response": ..}`,
//!   optionally inside a fenced code block, when the (unfenced) text starts with `{`;
//! * tag-delimited segments `[THOUGHT]: ..`, `[ACTION]: name(a, key=value)`,
//!   `[ANSWER]: ..` otherwise.
//!
//! [`parse_or_answer`] never fails: a reply neither grammar understands becomes
//! the final answer verbatim, so the agent loop always makes progress.

pub mod tags;
pub mod envelope;
pub mod error;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use error::ParseError;

/// One argument of a requested tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionArg {
    Positional(Value),
    Named { key: String, value: Value },
}

impl ActionArg {
    pub fn positional(value: impl Into<Value>) -> Self {
        ActionArg::Positional(value.into())
    }

    pub fn named(key: impl Into<String>, value: impl Into<Value>) -> Self {
        ActionArg::Named {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for ActionArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionArg::Positional(value) => write!(f, "{}", render_value(value)),
            ActionArg::Named { key, value } => write!(f, "{}={}", key, render_value(value)),
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) if text.contains(',') || text.contains(')') => format!("{:?}", text),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ActionArg>,
}

impl ActionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: ActionArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn positional(&self) -> impl Iterator<Item = &Value> {
        self.args.iter().filter_map(|arg| match arg {
            ActionArg::Positional(value) => Some(value),
            ActionArg::Named { .. } => None,
        })
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.args.iter().filter_map(|arg| match arg {
            ActionArg::Named { key, value } => Some((key.as_str(), value)),
            ActionArg::Positional(_) => None,
        })
    }
}

impl fmt::Display for ActionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{}({})", self.name, args)
    }
}

/// Per-turn parse result. At most one of `action` / `answer` drives the loop;
/// the loop checks `answer` first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub thought: Option<String>,
    pub action: Option<ActionCall>,
    pub answer: Option<String>,
}

impl ParsedResponse {
    pub fn answer(text: impl Into<String>) -> Self {
        Self {
            answer: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.thought.is_none() && self.action.is_none() && self.answer.is_none()
    }
}

/// Which grammar a reply was read with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
    Tags,
    JsonEnvelope,
}

/// Pick the grammar for `raw`: JSON envelope when the fence-stripped text starts with `{`.
pub fn sniff(raw: &str) -> Grammar {
    if envelope::strip_code_fence(raw).trim_start().starts_with('{') {
        Grammar::JsonEnvelope
    } else {
        Grammar::Tags
    }
}

pub fn parse_response(raw: &str) -> Result<ParsedResponse, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    match sniff(raw) {
        Grammar::JsonEnvelope => envelope::parse(envelope::strip_code_fence(raw)),
        Grammar::Tags => tags::parse(raw),
    }
}

/// Parse `raw`, falling back to the whole trimmed reply as the answer.
pub fn parse_or_answer(raw: &str) -> ParsedResponse {
    match parse_response(raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::debug!(%err, "unstructured model reply, using it as the answer");
            ParsedResponse::answer(raw.trim())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_grammar() {
        assert_eq!(sniff("{\"response\": \"hi\"}"), Grammar::JsonEnvelope);
        assert_eq!(sniff("```json\n{\"response\": \"hi\"}\n```"), Grammar::JsonEnvelope);
        assert_eq!(sniff("[ANSWER]: hi"), Grammar::Tags);
        assert_eq!(sniff("just prose"), Grammar::Tags);
    }

    #[test]
    fn unstructured_reply_becomes_answer() {
        let parsed = parse_or_answer("  The colony is doing fine.  ");
        assert_eq!(parsed.answer.as_deref(), Some("The colony is doing fine."));
        assert!(parsed.action.is_none());
        assert!(parsed.thought.is_none());
    }

    #[test]
    fn broken_json_becomes_answer() {
        let raw = "{\"thought\": \"unterminated";
        let parsed = parse_or_answer(raw);
        assert_eq!(parsed.answer.as_deref(), Some(raw));
    }

    #[test]
    fn action_renders_back_to_call_syntax() {
        let call = ActionCall::new("command")
            .with_arg(ActionArg::positional("BatchChopWood"))
            .with_arg(ActionArg::named("note", "a, b"))
            .with_arg(ActionArg::named("limit", 5));
        assert_eq!(call.to_string(), r#"command(BatchChopWood, note="a, b", limit=5)"#);
    }
}
