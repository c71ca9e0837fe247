//! Bounded transcript windows for prompts.

use crate::coach::store::turn::{Turn, TurnRole};

/// Truncate `text` to at most `max_chars` characters, marking the cut with `...`.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

/// Render the last `window` turns, each cut to `max_chars`, one per line.
///
/// Returns an empty string when there is no history.
#[must_use]
pub fn format_recent_turns(history: &[Turn], window: usize, max_chars: usize) -> String {
    let skip = history.len().saturating_sub(window);
    history[skip..]
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                TurnRole::User => "User",
                TurnRole::Assistant => "Diet Coach",
            };
            format!("{speaker}: {}", truncate_chars(&turn.content, max_chars))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("  short  ", 10), "short");
        assert_eq!(truncate_chars("crème brûlée", 5), "crème...");
    }

    #[test]
    fn test_format_recent_turns_keeps_tail() {
        let history = vec![
            Turn::user("first question"),
            Turn::assistant("first answer"),
            Turn::user("second question that is rather long"),
        ];
        let rendered = format_recent_turns(&history, 2, 15);
        assert_eq!(
            rendered,
            "Diet Coach: first answer\nUser: second question..."
        );
        assert!(format_recent_turns(&[], 4, 100).is_empty());
    }
}
