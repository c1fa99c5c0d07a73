//! Outbound text formatting

/// Separator between the platform marker and the author
const MARKER_SEPARATOR: &str = " | ";

/// Build the relayed text: `"{marker} | {author}: {text}"`, plus the source
/// URL on its own line when present
pub fn format_forward(marker: &str, author: &str, text: &str, source_url: Option<&str>) -> String {
    match source_url {
        Some(url) => format!("{marker}{MARKER_SEPARATOR}{author}: {text}\n{url}"),
        None => format!("{marker}{MARKER_SEPARATOR}{author}: {text}"),
    }
}

/// Cut `text` to at most `max_chars` characters
///
/// Counts Unicode scalar values, so multi-byte text is never split inside
/// a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// True when `text` was produced by the bridge itself
///
/// Matches the full `"{marker} | "` prefix that [`format_forward`] writes,
/// so ordinary text that merely begins with the marker still relays.
/// Leading whitespace is ignored. An empty marker never matches.
pub fn is_relayed(text: &str, marker: &str) -> bool {
    if marker.is_empty() {
        return false;
    }
    text.trim_start()
        .strip_prefix(marker)
        .is_some_and(|rest| rest.starts_with(MARKER_SEPARATOR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_plain() {
        assert_eq!(
            format_forward("📨 TG", "alice", "hello", None),
            "📨 TG | alice: hello"
        );
    }

    #[test]
    fn test_format_with_source_url() {
        assert_eq!(
            format_forward("💬 Discord", "feed", "New video", Some("https://youtu.be/abc123")),
            "💬 Discord | feed: New video\nhttps://youtu.be/abc123"
        );
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "привет мир";
        assert_eq!(truncate_chars(text, 6), "привет");
        assert_eq!(truncate_chars(text, 6).chars().count(), 6);
        assert_eq!(truncate_chars("📨📨📨", 2), "📨📨");
    }

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate_chars("short", 100), "short");
        assert_eq!(truncate_chars("exact", 5), "exact");
        assert_eq!(truncate_chars("anything", 0), "");
    }

    #[test]
    fn test_is_relayed_ignores_leading_whitespace() {
        assert!(is_relayed("📨 TG | bob: hi", "📨 TG"));
        assert!(is_relayed("  \n📨 TG | bob: hi", "📨 TG"));
        assert!(!is_relayed("hi 📨 TG", "📨 TG"));
        assert!(!is_relayed("anything", ""));
    }

    #[test]
    fn test_is_relayed_requires_separator() {
        assert!(is_relayed("💬 Discord | bob: hi", "💬 Discord"));
        assert!(!is_relayed("💬 Discordians unite", "💬 Discord"));
        assert!(!is_relayed("💬 Discord", "💬 Discord"));
        assert!(!is_relayed("💬 Discord|bob: hi", "💬 Discord"));
    }

    #[test]
    fn test_formatted_text_is_recognised() {
        let text = format_forward("📨 TG", "alice", "hello", Some("https://t.me/x/1"));
        assert!(is_relayed(&text, "📨 TG"));
    }
}
