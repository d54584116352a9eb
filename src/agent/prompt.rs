//! Default system prompt templates.
//!
//! Both carry the `{TOOLS}`, `{MEMORY}` and `{PERSONA}` slots filled per run.

use crate::config::ResponseFormat;

pub const TOOLS_SLOT: &str = "{TOOLS}";
pub const MEMORY_SLOT: &str = "{MEMORY}";
pub const PERSONA_SLOT: &str = "{PERSONA}";

pub const REACT_PROMPT: &str = r#"You are an assistant reasoning in the ReAct style.

Available tools:
{TOOLS}

Relevant memory and knowledge:
{MEMORY}

Output rules:
1. To think, write [THOUGHT]: your reasoning
2. To use a tool, write [ACTION]: tool_name(arg1, arg2, key=value)
   - positional arguments are bare values
   - named arguments use key=value (for example limit=10, radius=5)
   - quote values that contain commas: note="a, b"
3. When ready, write [ANSWER]: your final reply

Example:
User: check the colony status
[THOUGHT]: The user wants the colony status, I need the game data
[ACTION]: get_colony_state()
[OBSERVATION]: {"colonists":8,"mood":0.65,"food":450}
[ANSWER]: The colony is doing well: 8 colonists, average mood 65%, 450 meals stored.

Important:
- Emit at most one ACTION per reply
- Tool results come back to you as [OBSERVATION]
- Never write [OBSERVATION] yourself

{PERSONA}"#;

pub const ENVELOPE_PROMPT: &str = r#"You are an assistant that replies with a single JSON object.

Available tools:
{TOOLS}

Relevant memory and knowledge:
{MEMORY}

Reply format (all fields optional):
{"thought": "your reasoning", "action": {"name": "tool_name", "args": {"key": "value"}}, "response": "your final reply"}

Use "action" to call one tool; its result is sent back as an observation.
Fill "response" only when you are done.

{PERSONA}"#;

pub fn default_template(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Tagged => REACT_PROMPT,
        ResponseFormat::JsonEnvelope => ENVELOPE_PROMPT,
    }
}

/// Fill the three slots of `template`.
pub fn render(template: &str, tools: &str, memory: &str, persona: &str) -> String {
    template
        .replace(TOOLS_SLOT, tools)
        .replace(MEMORY_SLOT, memory)
        .replace(PERSONA_SLOT, persona)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_filled() {
        let prompt = render(REACT_PROMPT, "- get_colonists: List colonists", "(none)", "Speak like a storyteller.");
        assert!(prompt.contains("- get_colonists: List colonists"));
        assert!(prompt.ends_with("Speak like a storyteller."));
        assert!(!prompt.contains(TOOLS_SLOT));
        assert!(!prompt.contains(MEMORY_SLOT));
    }
}
