//! Conversation history and rolling-context assembly.

use std::collections::VecDeque;

use crate::message::Message;

pub const TRUNCATION_MARKER: &str = "...[earlier steps truncated]...";

/// Role-tagged history with a retention cap; the oldest entries go first.
#[derive(Debug, Clone)]
pub struct Conversation {
    entries: VecDeque<Message>,
    limit: usize,
}

impl Conversation {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push_back(message);
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }

    /// The `window` most recent entries, one line each.
    pub fn render_window(&self, window: usize) -> String {
        let start = self.entries.len().saturating_sub(window);
        self.entries
            .iter()
            .skip(start)
            .map(Message::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Cap `context` at `max_chars` by keeping `request` as a prefix and the
/// most recent text as a suffix, with [`TRUNCATION_MARKER`] at the cut.
pub fn fit_context(context: &str, request: &str, max_chars: usize) -> String {
    if context.chars().count() <= max_chars {
        return context.to_string();
    }
    let prefix = head_chars(request, max_chars / 3);
    let used = prefix.chars().count() + TRUNCATION_MARKER.chars().count() + 2;
    let suffix = tail_chars(context, max_chars.saturating_sub(used));
    format!("{}\n{}\n{}", prefix, TRUNCATION_MARKER, suffix)
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate_observation(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    format!("{}...(truncated)", head_chars(text, max_chars))
}

fn head_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn tail_chars(text: &str, n: usize) -> &str {
    let total = text.chars().count();
    if n >= total {
        return text;
    }
    match text.char_indices().nth(total - n) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_drops_oldest() {
        let mut conversation = Conversation::new(3);
        for i in 0..5 {
            conversation.push(Message::user(format!("m{}", i)));
        }
        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.render_window(2), "m3\nm4");
        assert_eq!(conversation.render_window(10), "m2\nm3\nm4");
    }

    #[test]
    fn long_context_keeps_request_and_recent_tail() {
        let request = "list colonists";
        let context = format!("{}\n{}\n[OBSERVATION]: latest", request, "x".repeat(500));
        let fitted = fit_context(&context, request, 120);
        assert!(fitted.starts_with("list colonists\n"));
        assert!(fitted.contains(TRUNCATION_MARKER));
        assert!(fitted.ends_with("[OBSERVATION]: latest"));
        assert!(fitted.chars().count() <= 120);
    }

    #[test]
    fn short_context_is_untouched() {
        assert_eq!(fit_context("a\nb", "a", 100), "a\nb");
    }

    #[test]
    fn observation_truncation_is_char_safe() {
        let text = "殖民者".repeat(10);
        let cut = truncate_observation(&text, 4);
        assert_eq!(cut, "殖民者殖...(truncated)");
    }
}
