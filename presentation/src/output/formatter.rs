//! Output formatter trait

use orc_domain::AnswerEnvelope;

/// Renders an answer for a terminal or a pipe.
pub trait OutputFormatter {
    /// Answer, reasoning, data points and thoughts
    fn format(&self, envelope: &AnswerEnvelope) -> String;

    fn format_json(&self, envelope: &AnswerEnvelope) -> String;

    /// Answer text only
    fn format_answer_only(&self, envelope: &AnswerEnvelope) -> String;
}
