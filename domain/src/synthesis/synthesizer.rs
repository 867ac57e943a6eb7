//! Response synthesis

use serde_json::Value;
use thiserror::Error;

use super::data_points::DataPointExtractor;
use super::envelope::{AnswerEnvelope, EMPTY_EXCHANGE_ANSWER, NO_ANSWER_PROVIDED};
use crate::strategy::termination::DEFAULT_TERMINATE_MARKER;
use crate::transcript::Transcript;

/// Trailer some models append after their final message.
const LEGACY_TRAILER: &str = "****";

const THOUGHTS_HEADER: &str = "Agents group chat:\n\n";

#[derive(Debug, Error)]
enum SynthesisError {
    #[error("field '{0}' in the closing answer is not text")]
    NonTextField(&'static str),
}

/// Fields pulled out of the closing agent's final text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedAnswer {
    pub answer: String,
    pub reasoning: String,
    pub data_points: Vec<String>,
    pub sql_query: Option<String>,
}

/// Reduces a transcript to an [`AnswerEnvelope`]. Never fails.
#[derive(Debug, Clone)]
pub struct ResponseSynthesizer {
    terminate_marker: String,
    extractor: DataPointExtractor,
}

impl Default for ResponseSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_TERMINATE_MARKER)
    }
}

impl ResponseSynthesizer {
    pub fn new(terminate_marker: impl Into<String>) -> Self {
        Self {
            terminate_marker: terminate_marker.into(),
            extractor: DataPointExtractor::default(),
        }
    }

    pub fn with_extractor(mut self, extractor: DataPointExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn terminate_marker(&self) -> &str {
        &self.terminate_marker
    }

    pub fn synthesize(
        &self,
        conversation_id: &str,
        transcript: &Transcript,
        closing_agent: &str,
    ) -> AnswerEnvelope {
        let thoughts = format!("{}{}", THOUGHTS_HEADER, transcript.render());
        match self.try_synthesize(conversation_id, transcript, closing_agent) {
            Ok(envelope) => envelope.with_thoughts(thoughts),
            Err(e) => AnswerEnvelope::degraded(conversation_id, e),
        }
    }

    fn try_synthesize(
        &self,
        conversation_id: &str,
        transcript: &Transcript,
        closing_agent: &str,
    ) -> Result<AnswerEnvelope, SynthesisError> {
        let Some(final_text) = transcript
            .last_text_from(closing_agent)
            .or_else(|| transcript.last_agent_text())
        else {
            return Ok(AnswerEnvelope::new(conversation_id, EMPTY_EXCHANGE_ANSWER));
        };

        let parsed = self.parse_answer(final_text)?;

        let mut data_points = self.extractor.extract(transcript);
        for point in parsed.data_points {
            if !data_points.contains(&point) {
                data_points.push(point);
            }
        }

        Ok(AnswerEnvelope::new(conversation_id, parsed.answer)
            .with_reasoning(parsed.reasoning)
            .with_data_points(data_points)
            .with_sql_query(parsed.sql_query))
    }

    /// Remove trailing markers and a surrounding code fence.
    pub fn clean_text(&self, text: &str) -> String {
        let mut cleaned = text.trim();
        loop {
            let before = cleaned.len();
            if !self.terminate_marker.is_empty()
                && let Some(stripped) = cleaned.strip_suffix(self.terminate_marker.as_str())
            {
                cleaned = stripped.trim_end();
            }
            if let Some(stripped) = cleaned.strip_suffix(LEGACY_TRAILER) {
                cleaned = stripped.trim_end();
            }
            if cleaned.len() == before {
                break;
            }
        }

        if cleaned.len() >= 6 && cleaned.starts_with("```") && cleaned.ends_with("```") {
            let inner = cleaned.trim_matches('`').trim();
            return inner.strip_prefix("json").unwrap_or(inner).trim().to_string();
        }
        cleaned.to_string()
    }

    /// Parse the final text as the `{answer, reasoning, ...}` contract,
    /// falling back to the whole text as the answer.
    fn parse_answer(&self, text: &str) -> Result<ParsedAnswer, SynthesisError> {
        let cleaned = self.clean_text(text);
        let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&cleaned) else {
            return Ok(ParsedAnswer {
                answer: cleaned,
                ..ParsedAnswer::default()
            });
        };

        let answer = match text_field(&map, "answer")? {
            Some(answer) if !answer.is_empty() => answer,
            _ => NO_ANSWER_PROVIDED.to_string(),
        };
        let reasoning = text_field(&map, "reasoning")?.unwrap_or_default();
        let sql_query = text_field(&map, "sql_query")?;
        let data_points = map
            .get("data_points")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ParsedAnswer {
            answer,
            reasoning,
            data_points,
            sql_query,
        })
    }

    /// The user-facing answer text for `text`, as persisted in history.
    pub fn answer_text(&self, text: &str) -> String {
        match self.parse_answer(text) {
            Ok(parsed) if !parsed.answer.trim().is_empty() => parsed.answer,
            _ => EMPTY_EXCHANGE_ANSWER.to_string(),
        }
    }
}

/// Strings are trimmed, numbers and booleans rendered, null treated as absent.
fn text_field(
    map: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, SynthesisError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(SynthesisError::NonTextField(field)),
    }
}
