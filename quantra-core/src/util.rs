/// Cut `text` to at most `max` characters, appending "..." when something was dropped.
pub(crate) fn truncate_body(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// First `max` characters of `text`, without an ellipsis.
pub(crate) fn take_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
