//! Streaming view of a JSON closing answer

use std::sync::LazyLock;

use regex::Regex;

static ANSWER_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""answer"\s*:\s*""#).expect("answer key pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Too little text to tell JSON from prose
    Detecting,
    PassThrough,
    SeekingAnswer,
    InAnswer,
    Done,
}

/// Forwards only the decoded `answer` string of a streamed
/// `{"answer": .., "reasoning": ..}` object.
///
/// Text that does not open with `{` (directly or inside a code fence) is a
/// plain answer and passes through unchanged. Everything outside the
/// `answer` string is dropped, and an escape sequence split across
/// fragments is held back until it is complete.
#[derive(Debug, Clone)]
pub struct AnswerFieldFilter {
    phase: Phase,
    pending: String,
}

impl Default for AnswerFieldFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl AnswerFieldFilter {
    pub fn new() -> Self {
        Self {
            phase: Phase::Detecting,
            pending: String::new(),
        }
    }

    /// Whether the text turned out to be a JSON object.
    pub fn is_json(&self) -> bool {
        matches!(
            self.phase,
            Phase::SeekingAnswer | Phase::InAnswer | Phase::Done
        )
    }

    /// Feed one fragment; returns the answer text that is safe to forward now.
    pub fn push(&mut self, fragment: &str) -> String {
        self.pending.push_str(fragment);
        if self.phase == Phase::Detecting {
            match looks_like_json(&self.pending) {
                None => return String::new(),
                Some(true) => self.phase = Phase::SeekingAnswer,
                Some(false) => self.phase = Phase::PassThrough,
            }
        }

        match self.phase {
            Phase::PassThrough => std::mem::take(&mut self.pending),
            Phase::SeekingAnswer => {
                let Some(key) = ANSWER_KEY.find(&self.pending) else {
                    return String::new();
                };
                let value_start = key.end();
                self.pending.drain(..value_start);
                self.phase = Phase::InAnswer;
                self.decode()
            }
            Phase::InAnswer => self.decode(),
            Phase::Detecting | Phase::Done => {
                self.pending.clear();
                String::new()
            }
        }
    }

    /// Flush at end of stream. Only undecided or plain text is released.
    pub fn finish(&mut self) -> String {
        match self.phase {
            Phase::Detecting | Phase::PassThrough => std::mem::take(&mut self.pending),
            _ => {
                self.pending.clear();
                String::new()
            }
        }
    }

    /// Decode string content up to the closing quote or an incomplete escape.
    fn decode(&mut self) -> String {
        let mut out = String::new();
        let text = self.pending.as_str();
        let mut pos = 0;

        while let Some(c) = text[pos..].chars().next() {
            match c {
                '"' => {
                    self.phase = Phase::Done;
                    pos = text.len();
                    break;
                }
                '\\' => match unescape(&text[pos..]) {
                    Some((decoded, len)) => {
                        out.extend(decoded);
                        pos += len;
                    }
                    None => break,
                },
                _ => {
                    out.push(c);
                    pos += c.len_utf8();
                }
            }
        }
        self.pending.drain(..pos);
        out
    }
}

/// `Some(true)` for a JSON object, `Some(false)` for prose, `None` while
/// the leading text could still go either way.
fn looks_like_json(text: &str) -> Option<bool> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() || "```".starts_with(trimmed) {
        return None;
    }
    if trimmed.starts_with('{') {
        return Some(true);
    }
    let Some(fenced) = trimmed.strip_prefix("```") else {
        return Some(false);
    };
    // The fence's language tag runs to the end of its line
    let (_, body) = fenced.split_once('\n')?;
    let body = body.trim_start();
    if body.is_empty() {
        None
    } else {
        Some(body.starts_with('{'))
    }
}

/// Decode the escape at the start of `text` (which begins with `\`).
/// Returns the decoded char, if any, and the bytes consumed; `None` when
/// the sequence is not complete yet.
fn unescape(text: &str) -> Option<(Option<char>, usize)> {
    let c = text[1..].chars().next()?;
    let decoded = match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'u' => return unicode_escape(text),
        other => return Some((Some(other), 1 + other.len_utf8())),
    };
    Some((Some(decoded), 2))
}

fn hex4(text: &str) -> Option<u32> {
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
        u32::from_str_radix(text, 16).ok()
    } else {
        None
    }
}

fn unicode_escape(text: &str) -> Option<(Option<char>, usize)> {
    if text.len() < 6 {
        return None;
    }
    let Some(high) = text.get(2..6).and_then(hex4) else {
        return Some((None, 2));
    };
    if !(0xD800..0xDC00).contains(&high) {
        return Some((char::from_u32(high), 6));
    }

    let rest = &text[6..];
    if rest.is_empty() || (rest.starts_with('\\') && rest.len() < 6) {
        return None;
    }
    let low = rest
        .strip_prefix("\\u")
        .and_then(|r| r.get(..4))
        .and_then(hex4)
        .filter(|low| (0xDC00..0xE000).contains(low));
    match low {
        Some(low) => {
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            Some((char::from_u32(code), 12))
        }
        None => Some((Some(char::REPLACEMENT_CHARACTER), 6)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fragments: &[&str]) -> Vec<String> {
        let mut filter = AnswerFieldFilter::new();
        let mut out: Vec<String> = fragments.iter().map(|f| filter.push(f)).collect();
        out.push(filter.finish());
        out
    }

    #[test]
    fn forwards_only_the_answer() {
        let chunks = run(&[
            "{\"ans",
            "wer\": \"Within ",
            "30 days.\", \"reasoning\": \"internal notes\"}",
        ]);
        assert_eq!(chunks.concat(), "Within 30 days.");
        assert_eq!(chunks[1], "Within ");
    }

    #[test]
    fn reasoning_first_is_skipped() {
        let chunks = run(&[
            "{\"reasoning\": \"the \\\"answer\\\": \\\"no\\\" case\", ",
            "\"answer\": \"Yes.\"}",
        ]);
        assert_eq!(chunks.concat(), "Yes.");
    }

    #[test]
    fn escapes_split_across_fragments() {
        let chunks = run(&["{\"answer\": \"Line one\\", "nLine \\u00", "e9 \\ud83d", "\\ude00 \\\"q\\\"\"}"]);
        assert_eq!(chunks.concat(), "Line one\nLine é 😀 \"q\"");
        assert_eq!(chunks[0], "Line one");
    }

    #[test]
    fn fenced_json_is_recognized() {
        let mut filter = AnswerFieldFilter::new();
        assert_eq!(filter.push("``"), "");
        assert_eq!(filter.push("`json\n"), "");
        assert_eq!(filter.push("{\"answer\": \"Fenced.\"}\n```"), "Fenced.");
        assert!(filter.is_json());
    }

    #[test]
    fn prose_passes_through() {
        let chunks = run(&["  ", "**Within** 30 ", "days."]);
        assert_eq!(chunks, vec!["", "  **Within** 30 ", "days.", ""]);
    }

    #[test]
    fn code_block_answer_is_prose() {
        let chunks = run(&["```sql\nSELECT 1\n```"]);
        assert_eq!(chunks.concat(), "```sql\nSELECT 1\n```");
    }
}
