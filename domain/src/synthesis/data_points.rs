//! Citation extraction from retrieval results
//!
//! Only results of retrieval tool calls are scanned; a `.pdf:` string
//! produced by a SQL tool is not a citation. Results are matched to their
//! request by call id, so interleaved tool calls cannot be confused.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::tool::names::{MULTIMODAL_VECTOR_INDEX_RETRIEVE, VECTOR_INDEX_RETRIEVE};
use crate::transcript::{MessageBody, Transcript};

/// Tools whose output is a list of `<source>: <snippet>` segments.
pub const RETRIEVAL_TOOLS: [&str; 2] = [VECTOR_INDEX_RETRIEVE, MULTIMODAL_VECTOR_INDEX_RETRIEVE];

const SOURCE_EXTENSIONS: &str = "vtt|xlsx|xls|pdf|docx|pptx|png|jpeg|jpg|bmp|tiff";

static SOURCE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)[^\s:]+\.(?:{})\s*:", SOURCE_EXTENSIONS))
        .expect("source marker pattern is valid")
});

/// Pulls `<source-name>.<ext>: <snippet>` citations out of a transcript.
#[derive(Debug, Clone)]
pub struct DataPointExtractor {
    retrieval_tools: Vec<String>,
}

impl Default for DataPointExtractor {
    fn default() -> Self {
        Self::new(RETRIEVAL_TOOLS)
    }
}

impl DataPointExtractor {
    pub fn new(retrieval_tools: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            retrieval_tools: retrieval_tools.into_iter().map(Into::into).collect(),
        }
    }

    fn is_retrieval(&self, tool: &str) -> bool {
        self.retrieval_tools.iter().any(|t| t == tool)
    }

    /// Citations in first-seen order, without duplicates.
    pub fn extract(&self, transcript: &Transcript) -> Vec<String> {
        let mut retrieval_calls: HashSet<&str> = HashSet::new();
        let mut points = Vec::new();
        let mut seen = HashSet::new();

        for message in transcript {
            match &message.body {
                MessageBody::ToolCallRequest(calls) => {
                    retrieval_calls.extend(
                        calls
                            .iter()
                            .filter(|c| self.is_retrieval(&c.tool_name))
                            .map(|c| c.id.as_str()),
                    );
                }
                MessageBody::ToolCallResult(outputs) => {
                    for output in outputs
                        .iter()
                        .filter(|o| !o.is_error && retrieval_calls.contains(o.call_id.as_str()))
                    {
                        for point in Self::scan_payload(&output.content) {
                            if seen.insert(point.clone()) {
                                points.push(point);
                            }
                        }
                    }
                }
                MessageBody::Text(_) => {}
            }
        }
        points
    }

    /// Multimodal results are a JSON object with a `texts` array; each text
    /// is scanned on its own.
    fn scan_payload(content: &str) -> Vec<String> {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(content)
            && let Some(texts) = map.get("texts").and_then(|t| t.as_array())
        {
            return texts
                .iter()
                .filter_map(|t| t.as_str())
                .flat_map(Self::scan_text)
                .collect();
        }
        Self::scan_text(content)
    }

    /// Split `text` at every source marker; each segment runs until the next
    /// marker or the end of the text.
    pub fn scan_text(text: &str) -> Vec<String> {
        let starts: Vec<usize> = SOURCE_MARKER.find_iter(text).map(|m| m.start()).collect();
        starts
            .iter()
            .enumerate()
            .filter_map(|(i, &start)| {
                let end = starts.get(i + 1).copied().unwrap_or(text.len());
                let cleaned = Self::clean(&text[start..end]);
                (!cleaned.is_empty()).then(|| cleaned.to_string())
            })
            .collect()
    }

    fn clean(segment: &str) -> &str {
        segment.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '\\' | '"' | '[' | ']'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolCall;
    use crate::transcript::{Message, ToolOutput};

    fn retrieval_exchange(content: &str) -> Transcript {
        let mut t = Transcript::with_ask("q");
        t.push(Message::tool_request(
            "main_assistant",
            vec![ToolCall::new("call_a", "vector_index_retrieve").with_arg("input", "q")],
        ));
        t.push(Message::tool_result(
            "main_assistant",
            vec![ToolOutput::ok("call_a", "vector_index_retrieve", content)],
        ));
        t
    }

    #[test]
    fn no_retrieval_calls_means_no_points() {
        let mut t = Transcript::with_ask("q");
        t.push(Message::text("main_assistant", "report.pdf: looks like a citation"));
        t.push(Message::tool_request("main_assistant", vec![ToolCall::new("c1", "execute_sql_query")]));
        t.push(Message::tool_result(
            "main_assistant",
            vec![ToolOutput::ok("c1", "execute_sql_query", "export.xlsx: 3 rows")],
        ));
        assert!(DataPointExtractor::default().extract(&t).is_empty());
    }

    #[test]
    fn two_sources_in_one_result() {
        let t = retrieval_exchange("report.pdf: summary text next.pdf: more");
        assert_eq!(
            DataPointExtractor::default().extract(&t),
            vec!["report.pdf: summary text".to_string(), "next.pdf: more".to_string()]
        );
    }

    #[test]
    fn extensions_are_case_insensitive() {
        let t = retrieval_exchange("Deck.PPTX: roadmap slide");
        assert_eq!(DataPointExtractor::default().extract(&t), vec!["Deck.PPTX: roadmap slide"]);
    }

    #[test]
    fn results_matched_by_call_id_only() {
        let mut t = Transcript::with_ask("q");
        t.push(Message::tool_request(
            "main_assistant",
            vec![
                ToolCall::new("r1", "vector_index_retrieve"),
                ToolCall::new("s1", "get_today_date"),
            ],
        ));
        t.push(Message::tool_result(
            "main_assistant",
            vec![
                ToolOutput::ok("s1", "get_today_date", "notes.docx: not a citation"),
                ToolOutput::ok("r1", "vector_index_retrieve", "handbook.pdf: 20 days"),
            ],
        ));
        assert_eq!(DataPointExtractor::default().extract(&t), vec!["handbook.pdf: 20 days"]);
    }

    #[test]
    fn duplicates_removed_and_punctuation_trimmed() {
        let t = retrieval_exchange("[\"a.pdf: one\", \"a.pdf: one\", \"b.vtt: two\"]");
        assert_eq!(
            DataPointExtractor::default().extract(&t),
            vec!["a.pdf: one".to_string(), "b.vtt: two".to_string()]
        );
    }

    #[test]
    fn multimodal_payload_scans_texts() {
        let payload = serde_json::json!({
            "texts": ["manual.pdf: torque is 40Nm", "diagram.png: pump layout"],
            "images": ["https://example/diagram.png"],
            "captions": ["pump"]
        })
        .to_string();
        let mut t = Transcript::with_ask("q");
        t.push(Message::tool_request(
            "assistant",
            vec![ToolCall::new("m1", "multimodal_vector_index_retrieve")],
        ));
        t.push(Message::tool_result(
            "assistant",
            vec![ToolOutput::ok("m1", "multimodal_vector_index_retrieve", payload)],
        ));
        assert_eq!(
            DataPointExtractor::default().extract(&t),
            vec!["manual.pdf: torque is 40Nm", "diagram.png: pump layout"]
        );
    }

    #[test]
    fn failed_retrieval_results_are_skipped() {
        let mut t = Transcript::with_ask("q");
        t.push(Message::tool_request("a", vec![ToolCall::new("r1", "vector_index_retrieve")]));
        t.push(Message::tool_result(
            "a",
            vec![ToolOutput::error("r1", "vector_index_retrieve", "x.pdf: search down")],
        ));
        assert!(DataPointExtractor::default().extract(&t).is_empty());
    }
}
