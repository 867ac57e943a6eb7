//! Markdown stripping for speech output.

use std::sync::LazyLock;

use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
    /// Anchored at the start of a line
    line_start: bool,
}

fn rule(pattern: &str, replacement: &'static str) -> Rule {
    Rule {
        pattern: Regex::new(pattern).expect("speech rule pattern is valid"),
        replacement,
        line_start: false,
    }
}

fn line_rule(pattern: &str, replacement: &'static str) -> Rule {
    Rule {
        line_start: true,
        ..rule(pattern, replacement)
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(r"```[a-zA-Z]*\n?", ""),
        rule(r"!\[([^\]]*)\]\([^)]*\)", "$1"),
        rule(r"(?i)\[[^\]]*\.(?:vtt|xlsx|xls|pdf|docx|pptx|png|jpeg|jpg|bmp|tiff)\]", ""),
        rule(r"\[([^\]]+)\]\([^)]*\)", "$1"),
        line_rule(r"(?m)^\s{0,3}#{1,6}\s*", ""),
        line_rule(r"(?m)^\s*>\s?", ""),
        line_rule(r"(?m)^\s*[-*+]\s+", ""),
        rule(r"\*\*([^*]+)\*\*", "$1"),
        rule(r"__([^_]+)__", "$1"),
        rule(r"\*([^*\n]+)\*", "$1"),
        rule(r"`([^`]*)`", "$1"),
        rule(r"\|", " "),
        rule(r"[ \t]{2,}", " "),
        rule(r"\n{3,}", "\n\n"),
    ]
});

fn apply(text: &str, inline_only: bool) -> String {
    RULES
        .iter()
        .filter(|rule| !(inline_only && rule.line_start))
        .fold(text.to_string(), |acc, rule| {
            rule.pattern.replace_all(&acc, rule.replacement).into_owned()
        })
}

/// Sanitize a piece of text that may begin in the middle of a line. Line
/// rules are kept off that first partial line.
fn sanitize_piece(text: &str, at_line_start: bool) -> String {
    if at_line_start {
        return apply(text, false);
    }
    match text.split_once('\n') {
        Some((head, rest)) => format!("{}\n{}", apply(head, true), apply(rest, false)),
        None => apply(text, true),
    }
}

/// Strip markdown so a text-to-speech engine reads the content, not the markup.
pub fn sanitize_for_speech(text: &str) -> String {
    apply(text, false).trim().to_string()
}

/// Strips markdown from streamed text, one forwarded chunk at a time.
///
/// Text is released up to the last line break, or the last whitespace
/// where no emphasis, code span or link is left open on the current line,
/// so markup split across fragments is removed as a whole. Whitespace at
/// fragment boundaries is kept; only [`SpeechChunker::finish`] trims.
#[derive(Debug, Clone)]
pub struct SpeechChunker {
    pending: String,
    at_line_start: bool,
}

impl Default for SpeechChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechChunker {
    pub fn new() -> Self {
        Self {
            pending: String::new(),
            at_line_start: true,
        }
    }

    /// Feed one fragment; returns the sanitized text that is ready now.
    pub fn push(&mut self, fragment: &str) -> String {
        self.pending.push_str(fragment);
        let cut = safe_cut(&self.pending);
        if cut == 0 {
            return String::new();
        }
        let rest = self.pending.split_off(cut);
        let ready = std::mem::replace(&mut self.pending, rest);
        self.release(&ready)
    }

    /// Sanitize whatever is still held back; trailing whitespace is dropped.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        let mut out = self.release(&rest);
        out.truncate(out.trim_end().len());
        out
    }

    fn release(&mut self, ready: &str) -> String {
        let out = sanitize_piece(ready, self.at_line_start);
        let last_line = ready.rsplit('\n').next().unwrap_or("");
        self.at_line_start =
            last_line.trim().is_empty() && (ready.contains('\n') || self.at_line_start);
        out
    }
}

/// Byte offset up to which `text` can be sanitized without splitting markup.
///
/// A run of `*` opens or closes emphasis unless it stands alone between
/// whitespace (a bullet or a multiplication).
fn safe_cut(text: &str) -> usize {
    let mut cut = 0;
    let (mut emphasis, mut code) = (false, false);
    let (mut brackets, mut parens) = (0i32, 0i32);
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\n' => {
                cut = i + 1;
                (emphasis, code, brackets, parens) = (false, false, 0, 0);
                prev = None;
                continue;
            }
            '*' | '`' => {
                while chars.next_if(|&(_, next)| next == c).is_some() {}
                let spaced_before = prev.is_none_or(char::is_whitespace);
                let spaced_after = chars.peek().is_none_or(|&(_, next)| next.is_whitespace());
                if c == '`' {
                    code = !code;
                } else if !(spaced_before && spaced_after) {
                    emphasis = !emphasis;
                }
            }
            '[' => brackets += 1,
            ']' => brackets -= 1,
            '(' => parens += 1,
            ')' => parens -= 1,
            c if c.is_whitespace() && !emphasis && !code && brackets <= 0 && parens <= 0 => {
                cut = i + c.len_utf8();
            }
            _ => {}
        }
        prev = Some(c);
    }
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_emphasis_and_headers() {
        let text = "## Summary\n**Revenue** grew by *12%* in `Q3`.";
        assert_eq!(sanitize_for_speech(text), "Summary\nRevenue grew by 12% in Q3.");
    }

    #[test]
    fn strips_links_bullets_and_citations() {
        let text = "- See [the handbook](https://contoso/handbook) [policy.pdf]\n- Ask HR";
        assert_eq!(sanitize_for_speech(text), "See the handbook \nAsk HR");
    }

    fn chunked(fragments: &[&str]) -> Vec<String> {
        let mut chunker = SpeechChunker::new();
        let mut out: Vec<String> = fragments.iter().map(|f| chunker.push(f)).collect();
        out.push(chunker.finish());
        out
    }

    #[test]
    fn chunks_match_whole_text() {
        let fragments = ["## Summary\n**Within**", " 30 days."];
        let chunks = chunked(&fragments);
        assert_eq!(chunks, vec!["Summary\n", "Within 30 ", "days."]);
        assert_eq!(chunks.concat(), sanitize_for_speech(&fragments.concat()));
    }

    #[test]
    fn chunk_boundaries_keep_spaces() {
        let chunks = chunked(&["You have ", "20 days ", "off."]);
        assert_eq!(chunks, vec!["You have ", "20 days ", "", "off."]);
    }

    #[test]
    fn split_emphasis_and_links_are_held_whole() {
        let chunks = chunked(&["Read **the ", "handbook** and [the po", "licy](https://x/p) now"]);
        assert_eq!(chunks.concat(), "Read the handbook and the policy now");
        assert_eq!(chunks[0], "Read ");
    }

    #[test]
    fn line_rules_only_at_line_start() {
        let chunks = chunked(&["Score 3 ", "- 2 = 1\n", "- next item"]);
        assert_eq!(chunks.concat(), "Score 3 - 2 = 1\nnext item");
    }

    #[test]
    fn plain_text_unchanged() {
        assert_eq!(sanitize_for_speech("You have 20 days off."), "You have 20 days off.");
    }
}
