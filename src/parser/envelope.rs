//! JSON envelope grammar.
//!
//! ```json
//! {"thought": "...", "action": {"name": "command", "args": {"target": "Ava"}}, "response": "..."}
//! ```
//!
//! `dialogue` is accepted as an alias of `response`.

use serde::Deserialize;
use serde_json::Value;

use super::{ActionArg, ActionCall, ParseError, ParsedResponse, tags};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    thought: Option<String>,
    #[serde(default)]
    action: Option<EnvelopeAction>,
    #[serde(default, alias = "dialogue")]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeAction {
    name: String,
    #[serde(default)]
    args: Value,
}

/// Strip a surrounding ```` ```json ```` (or bare ```` ``` ````) fence. Text
/// without a leading fence is returned trimmed.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // skip the info string (`json`, `JSON`, ...) up to the first newline
    let body = match after_open.find('\n') {
        Some(idx) if after_open[..idx].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            &after_open[idx + 1..]
        }
        _ => after_open,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse(text: &str) -> Result<ParsedResponse, ParseError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let action = envelope.action.and_then(|EnvelopeAction { name, args }| {
        let name = name.trim();
        (!name.is_empty()).then(|| ActionCall {
            name: name.to_string(),
            args: args_from_value(args),
        })
    });

    Ok(ParsedResponse {
        thought: non_blank(envelope.thought),
        action,
        answer: non_blank(envelope.response),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn args_from_value(args: Value) -> Vec<ActionArg> {
    match args {
        Value::Null => Vec::new(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| ActionArg::Named { key, value })
            .collect(),
        Value::Array(items) => items.into_iter().map(ActionArg::Positional).collect(),
        Value::String(text) => tags::parse_call(&format!("_({})", text))
            .map(|call| call.args)
            .unwrap_or_default(),
        scalar => vec![ActionArg::Positional(scalar)],
    }
}
