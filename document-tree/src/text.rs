/// Collapse every whitespace run to a single space and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Longest prefix of `text` with at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Whitespace-normalized prefix of `text`, cut at a word boundary when
/// possible and suffixed with `...` when anything was dropped
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let normalized = normalize_whitespace(text);
    if normalized.chars().count() <= max_chars {
        return normalized;
    }

    let budget = max_chars.saturating_sub(3);
    let prefix = truncate_chars(&normalized, budget);
    let at_word_boundary = normalized[prefix.len()..].starts_with(' ');
    let prefix = match prefix.rfind(' ') {
        Some(idx) if !at_word_boundary && idx > budget / 2 => &prefix[..idx],
        _ => prefix,
    };
    format!("{}...", prefix.trim_end())
}

/// One run of reconstructed document text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPart<'a> {
    pub text: &'a str,

    /// Continues the previous run with no separator, as when a long token
    /// was cut in two
    pub joined: bool,
}

impl<'a> TextPart<'a> {
    pub fn separate(text: &'a str) -> Self {
        Self {
            text,
            joined: false,
        }
    }
}

/// Join runs with blank lines, except where a run continues its predecessor
pub fn join_parts(parts: &[TextPart<'_>]) -> String {
    let mut joined = String::new();
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 && !part.joined {
            joined.push_str("\n\n");
        }
        joined.push_str(part.text);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\n b\t c  "), "a b c");
        assert_eq!(normalize_whitespace(" \n\t "), "");
    }

    #[test]
    fn test_truncate_chars_respects_utf8() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short text", 20), "short text");

        let truncated = truncate_with_ellipsis("one two three four five six", 16);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 16);
        assert_eq!(truncated, "one two three...");
    }

    #[test]
    fn test_join_parts_keeps_cut_tokens_whole() {
        let parts = [
            TextPart::separate("# Links"),
            TextPart::separate("https://example.com/a"),
            TextPart {
                text: "very/long/path",
                joined: true,
            },
            TextPart::separate("Done."),
        ];
        assert_eq!(
            join_parts(&parts),
            "# Links\n\nhttps://example.com/avery/long/path\n\nDone."
        );
        assert_eq!(join_parts(&[]), "");
    }
}
