//! Text helpers shared by the sinks. Limits are counted in characters, so a
//! multi-byte sequence is never split.

pub const ELLIPSIS: &str = "...";

/// `text` unchanged when it fits in `max_chars`, otherwise its first
/// `max_chars` characters followed by [`ELLIPSIS`].
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

#[must_use]
pub fn exceeds_chars(text: &str, max_chars: usize) -> bool {
    text.chars().nth(max_chars).is_some()
}

fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '&' => Some("&amp;"),
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '"' => Some("&quot;"),
        _ => None,
    }
}

/// Escape `text` for Telegram's HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match escape_char(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
    }
    out
}

/// Escape `text` so the result is at most `max_chars` characters long,
/// ending in [`ELLIPSIS`] when anything had to be cut. Entities are kept
/// whole.
#[must_use]
pub fn escape_html_within(text: &str, max_chars: usize) -> String {
    let escaped = escape_html(text);
    if !exceeds_chars(&escaped, max_chars) {
        return escaped;
    }

    let budget = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let width = escape_char(c).map_or(1, str::len);
        if used + width > budget {
            break;
        }
        match escape_char(c) {
            Some(entity) => out.push_str(entity),
            None => out.push(c),
        }
        used += width;
    }
    out.push_str(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_chars_keeps_short_text() {
        assert_eq!(truncate_chars("short", 95), "short");
        assert_eq!(truncate_chars("exactly", 7), "exactly");
    }

    #[test]
    fn truncate_chars_counts_characters_not_bytes() {
        let title = "Я".repeat(120);
        let cut = truncate_chars(&title, 95);
        assert_eq!(cut.chars().count(), 98);
        assert!(cut.starts_with(&"Я".repeat(95)));
        assert!(cut.ends_with(ELLIPSIS));
    }

    #[test]
    fn escape_html_replaces_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & Jerry</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; Jerry&lt;/b&gt;"
        );
    }

    #[test]
    fn escape_html_within_never_splits_entities() {
        let out = escape_html_within("a&b&c&d", 10);
        assert_eq!(out, "a&amp;b...");
        assert!(out.chars().count() <= 10);
    }

    #[test]
    fn escape_html_within_leaves_fitting_text() {
        assert_eq!(escape_html_within("a & b", 20), "a &amp; b");
    }
}
