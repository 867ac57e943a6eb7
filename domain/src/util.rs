//! Shared utility functions.

/// Truncate a string to at most `max_bytes` without splitting a UTF-8
/// character. Used to keep log lines short.
pub fn truncate_str(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// First 8 characters of an id, for log prefixes.
pub fn short_id(id: &str) -> &str {
    truncate_str(id, 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_strings() {
        assert_eq!(truncate_str("summary", 50), "summary");
        assert_eq!(truncate_str("", 3), "");
    }

    #[test]
    fn truncate_backs_off_to_char_boundary() {
        let s = "día"; // 'í' spans bytes 1..3
        assert_eq!(truncate_str(s, 2), "d");
        assert_eq!(truncate_str(s, 3), "dí");
    }

    #[test]
    fn short_id_prefix() {
        assert_eq!(short_id("3f2a9c1e-77b0-4e1b-9a55-000000000000"), "3f2a9c1e");
        assert_eq!(short_id("abc"), "abc");
    }
}
