//! Prompt templates

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

/// Summary used when there is no prior history.
pub const CONVERSATION_JUST_STARTED: &str = "The conversation just started.";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("placeholder pattern is valid"));

/// A prompt with `{{name}}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    text: String,
}

impl PromptTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// Replace every `{{key}}` for which `values` has an entry.
    pub fn fill(mut self, values: &HashMap<String, String>) -> Self {
        for (key, value) in values {
            self.text = self.text.replace(&format!("{{{{{}}}}}", key), value);
        }
        self
    }

    /// Names of placeholders still present, sorted and unique.
    pub fn unresolved(&self) -> BTreeSet<String> {
        PLACEHOLDER
            .captures_iter(&self.text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Prompt that condenses earlier turns into a paragraph baked into agent prompts.
pub struct SummaryPrompt;

impl SummaryPrompt {
    pub fn system() -> &'static str {
        "You summarize conversations between a user and an assistant for another assistant to read."
    }

    pub fn user(history: &str) -> String {
        format!(
            "Please summarize the following conversation, highlighting the main topics discussed, \
the specific subject if mentioned, any decisions made, questions raised, and any unresolved \
issues or actions pending. If there is a document or object mentioned with an identifying \
number, include that information for future reference. If there is no specific content or \
dialogue included to summarize you can say the conversation just started.\n\
Conversation history: \n{}",
            history
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_replaces_known_placeholders() {
        let values = HashMap::from([("conversation_summary".to_string(), "User asked about PTO.".to_string())]);
        let prompt = PromptTemplate::new("Context: {{conversation_summary}}\nRules: {{answer_rules}}\n").fill(&values);
        assert_eq!(prompt.as_str(), "Context: User asked about PTO.\nRules: {{answer_rules}}");
        assert_eq!(prompt.unresolved().into_iter().collect::<Vec<_>>(), vec!["answer_rules"]);
    }

    #[test]
    fn unresolved_is_unique() {
        let prompt = PromptTemplate::new("{{a}} {{b}} {{a}}");
        assert_eq!(prompt.unresolved().len(), 2);
    }

    #[test]
    fn summary_prompt_embeds_history() {
        let prompt = SummaryPrompt::user("user: hi\nassistant: hello");
        assert!(prompt.ends_with("Conversation history: \nuser: hi\nassistant: hello"));
        assert!(prompt.contains("decisions made"));
    }
}
