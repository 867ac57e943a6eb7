//! Console output formatter for answer envelopes

use crate::cli::commands::OutputFormat;
use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use orc_domain::AnswerEnvelope;

/// Formats answers for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Dispatch on the `--output` flag.
    pub fn render(envelope: &AnswerEnvelope, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => Self::format(envelope),
            OutputFormat::Answer => Self::format_answer_only(envelope),
            OutputFormat::Json => Self::format_json(envelope),
        }
    }

    pub fn format(envelope: &AnswerEnvelope) -> String {
        let mut output = Self::format_answer_only(envelope);

        if !envelope.reasoning.is_empty() {
            output.push_str(&format!(
                "\n{}\n{}\n",
                "Reasoning:".cyan().bold(),
                envelope.reasoning
            ));
        }

        if let Some(query) = &envelope.sql_query {
            output.push_str(&format!("\n{}\n{}\n", "Query:".cyan().bold(), query));
        }

        output.push_str(&Self::format_data_points(envelope));
        output.push_str(&Self::format_thoughts(envelope));
        output
    }

    pub fn format_json(envelope: &AnswerEnvelope) -> String {
        serde_json::to_string_pretty(envelope).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn format_answer_only(envelope: &AnswerEnvelope) -> String {
        let label = if envelope.is_degraded() {
            "Answer:".red().bold()
        } else {
            "Answer:".green().bold()
        };
        format!("{} {}\n", label, envelope.answer)
    }

    pub fn format_data_points(envelope: &AnswerEnvelope) -> String {
        if envelope.data_points.is_empty() {
            return String::new();
        }
        let mut output = format!("\n{}\n", "Data Points:".cyan().bold());
        for point in &envelope.data_points {
            output.push_str(&format!("  * {}\n", point));
        }
        output
    }

    pub fn format_thoughts(envelope: &AnswerEnvelope) -> String {
        if envelope.thoughts.is_empty() {
            return String::new();
        }
        format!(
            "\n{}\n{}\n",
            "Thoughts:".dimmed().bold(),
            Self::indent(&envelope.thoughts, "  ").dimmed()
        )
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, envelope: &AnswerEnvelope) -> String {
        Self::format(envelope)
    }

    fn format_json(&self, envelope: &AnswerEnvelope) -> String {
        Self::format_json(envelope)
    }

    fn format_answer_only(&self, envelope: &AnswerEnvelope) -> String {
        Self::format_answer_only(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> AnswerEnvelope {
        AnswerEnvelope::new("c-1", "Within 30 days.")
            .with_reasoning("From the handbook.")
            .with_data_points(vec!["handbook.pdf: refunds".to_string()])
            .with_thoughts("Agents group chat:\nassistant: ...")
    }

    #[test]
    fn test_full_format_has_every_section() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::render(&envelope(), OutputFormat::Full);
        assert!(text.starts_with("Answer: Within 30 days."));
        assert!(text.contains("Reasoning:\nFrom the handbook."));
        assert!(text.contains("  * handbook.pdf: refunds"));
        assert!(text.contains("  Agents group chat:"));
        assert!(!text.contains("Query:"));
    }

    #[test]
    fn test_answer_only() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::render(&envelope(), OutputFormat::Answer);
        assert_eq!(text, "Answer: Within 30 days.\n");
    }

    #[test]
    fn test_json_round_trips_fields() {
        let value: serde_json::Value =
            serde_json::from_str(&ConsoleFormatter::render(&envelope(), OutputFormat::Json))
                .unwrap();
        assert_eq!(value["conversation_id"], "c-1");
        assert_eq!(value["data_points"][0], "handbook.pdf: refunds");
        assert!(value.get("sql_query").is_none());
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
