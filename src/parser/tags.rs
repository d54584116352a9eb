//! Tag-delimited grammar: `[THOUGHT]:`, `[ACTION]:`, `[ANSWER]:`.
//!
//! Markers are matched case-insensitively; each segment runs until the next
//! marker (including a model-hallucinated `[OBSERVATION]:`) or end of text.

use serde_json::Value;

use super::{ActionArg, ActionCall, ParseError, ParsedResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    Answer,
    Observation,
}

const LABELS: [(Marker, &str); 4] = [
    (Marker::Thought, "THOUGHT"),
    (Marker::Action, "ACTION"),
    (Marker::Answer, "ANSWER"),
    (Marker::Observation, "OBSERVATION"),
];

struct Found {
    marker: Marker,
    start: usize,
    body_start: usize,
}

pub fn parse(text: &str) -> Result<ParsedResponse, ParseError> {
    let markers = find_markers(text);
    if markers.is_empty() {
        return Err(ParseError::NoMarkers);
    }

    let mut parsed = ParsedResponse::default();
    for (idx, found) in markers.iter().enumerate() {
        let body_end = markers.get(idx + 1).map_or(text.len(), |next| next.start);
        let body = text[found.body_start..body_end].trim();
        match found.marker {
            Marker::Thought if parsed.thought.is_none() && !body.is_empty() => {
                parsed.thought = Some(body.to_string());
            }
            Marker::Action if parsed.action.is_none() => {
                parsed.action = parse_call(body);
            }
            Marker::Answer if parsed.answer.is_none() && !body.is_empty() => {
                parsed.answer = Some(body.to_string());
            }
            _ => {}
        }
    }
    Ok(parsed)
}

fn find_markers(text: &str) -> Vec<Found> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            if let Some((marker, body_start)) = marker_at(text, i) {
                found.push(Found { marker, start: i, body_start });
                i = body_start;
                continue;
            }
        }
        i += 1;
    }
    found
}

/// `start` points at a `[`; returns the marker and where its body begins.
fn marker_at(text: &str, start: usize) -> Option<(Marker, usize)> {
    let rest = &text[start + 1..];
    for (marker, label) in LABELS {
        let Some(head) = rest.as_bytes().get(..label.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(label.as_bytes()) {
            continue;
        }
        let Some(after) = rest[label.len()..].strip_prefix(']') else {
            continue;
        };
        let spaced = after.trim_start_matches([' ', '\t']);
        let remaining = spaced.strip_prefix(':').unwrap_or(after);
        return Some((marker, text.len() - remaining.len()));
    }
    None
}

/// Parse `name(arg, key=value, ...)`. A bare `name` is a call without arguments.
pub fn parse_call(body: &str) -> Option<ActionCall> {
    let body = body.trim_start();
    let name_len = body
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    if name_len == 0 {
        return None;
    }
    let name = &body[..name_len];
    let rest = body[name_len..].trim_start();
    let Some(inner) = rest.strip_prefix('(') else {
        return Some(ActionCall::new(name));
    };
    let args_text = match closing_paren(inner) {
        Some(end) => &inner[..end],
        None => inner.trim_end(),
    };

    Some(ActionCall {
        name: name.to_string(),
        args: split_arguments(args_text).iter().map(|token| classify(token)).collect(),
    })
}

fn closing_paren(inner: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;
    for (idx, c) in inner.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' if depth == 0 => return Some(idx),
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

/// Split an argument list on top-level commas. Commas inside quotes or
/// brackets are kept. A single quote only opens a quoted value at the start of
/// a token or right after `=`, so apostrophes in bare text stay literal.
pub fn split_arguments(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    for c in text.chars() {
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' => quote = Some(c),
            '\'' => {
                let head = current.trim_end();
                if head.trim_start().is_empty() || head.ends_with('=') {
                    quote = Some(c);
                }
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current.trim().to_string());
    parts.retain(|part| !part.is_empty());
    parts
}

fn classify(token: &str) -> ActionArg {
    if let Some((key, value)) = token.split_once('=') {
        let key = key.trim();
        if !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return ActionArg::Named {
                key: key.to_string(),
                value: Value::String(strip_quotes(value.trim())),
            };
        }
    }
    ActionArg::Positional(Value::String(strip_quotes(token)))
}

fn strip_quotes(raw: &str) -> String {
    let mut chars = raw.chars();
    let (Some(first), Some(last)) = (chars.next(), raw.chars().last()) else {
        return raw.to_string();
    };
    if raw.len() < 2 || !(first == '"' || first == '\'') || last != first {
        return raw.to_string();
    }
    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    if escaped {
        out.push('\\');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_arguments_respecting_quotes() {
        let call = parse_call(r#"action(Foo, note="a, b", limit=5)"#).unwrap();
        assert_eq!(call.name, "action");
        assert_eq!(
            call.args,
            vec![
                ActionArg::Positional(json!("Foo")),
                ActionArg::named("note", "a, b"),
                ActionArg::named("limit", "5"),
            ]
        );
    }

    #[test]
    fn full_reply_with_thought_and_action() {
        let reply = "[THOUGHT]: I should look at the colonists first.\n[ACTION]: get_colonists()";
        let parsed = parse(reply).unwrap();
        assert_eq!(parsed.thought.as_deref(), Some("I should look at the colonists first."));
        let action = parsed.action.unwrap();
        assert_eq!(action.name, "get_colonists");
        assert!(action.args.is_empty());
        assert!(parsed.answer.is_none());
    }

    #[test]
    fn answer_runs_to_next_marker() {
        let reply = "[ANSWER]: There is one colonist, Ava.\n[OBSERVATION]: hallucinated";
        let parsed = parse(reply).unwrap();
        assert_eq!(parsed.answer.as_deref(), Some("There is one colonist, Ava."));
    }

    #[test]
    fn markers_are_case_insensitive() {
        let parsed = parse("[thought]: hmm [answer]: done").unwrap();
        assert_eq!(parsed.thought.as_deref(), Some("hmm"));
        assert_eq!(parsed.answer.as_deref(), Some("done"));
    }

    #[test]
    fn quoted_parenthesis_does_not_close_call() {
        let call = parse_call(r#"command(TriggerEvent, raid, comment="Let's fight (together), warrior!")"#).unwrap();
        assert_eq!(call.args.len(), 3);
        assert_eq!(call.args[2], ActionArg::named("comment", "Let's fight (together), warrior!"));
    }

    #[test]
    fn apostrophe_in_bare_text_is_literal() {
        assert_eq!(split_arguments("Ava's bed, 3"), vec!["Ava's bed", "3"]);
        assert_eq!(split_arguments("note='a, b', x"), vec!["note='a, b'", "x"]);
    }

    #[test]
    fn quoted_positional_with_equals_stays_positional() {
        let call = parse_call(r#"search("x=y")"#).unwrap();
        assert_eq!(call.args, vec![ActionArg::positional("x=y")]);
    }

    #[test]
    fn bare_name_is_call_without_args() {
        let parsed = parse("[ACTION]: check_threats").unwrap();
        assert_eq!(parsed.action.unwrap(), ActionCall::new("check_threats"));
    }

    #[test]
    fn no_markers_is_an_error() {
        assert!(matches!(parse("hello there"), Err(ParseError::NoMarkers)));
    }
}
