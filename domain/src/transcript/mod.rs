//! Transcript domain.
//!
//! The ordered record of one group-chat run: the user's ask, every agent
//! reply, every tool-call request and every tool result. It only grows.

pub mod message;

pub use message::{Message, MessageBody, ToolOutput, USER_SPEAKER};

use serde::Serialize;

/// Append-only sequence of [`Message`]s for one request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript with the user's ask.
    pub fn with_ask(ask: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push(Message::user(ask));
        transcript
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> {
        self.messages.iter()
    }

    /// The most recent `n` messages (the model's rolling context window).
    pub fn window(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Number of messages authored by agents (tool results excluded).
    pub fn agent_message_count(&self) -> usize {
        self.messages.iter().filter(|m| m.is_agent_message()).count()
    }

    /// Last text message from `speaker`.
    pub fn last_text_from(&self, speaker: &str) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.speaker == speaker)
            .find_map(|m| m.as_text())
    }

    /// Last text message from any agent.
    pub fn last_agent_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| !m.is_from_user())
            .find_map(|m| m.as_text())
    }

    /// Plain rendering used for diagnostics (`thoughts`).
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.render())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolCall;

    fn sample() -> Transcript {
        let mut t = Transcript::with_ask("How many vacation days?");
        t.push(Message::tool_request(
            "main_assistant",
            vec![ToolCall::new("c1", "vector_index_retrieve").with_arg("input", "vacation")],
        ));
        t.push(Message::tool_result(
            "main_assistant",
            vec![ToolOutput::ok("c1", "vector_index_retrieve", "handbook.pdf: 20 days")],
        ));
        t.push(Message::text("main_assistant", "You get 20 days. QUESTION_ANSWERED"));
        t.push(Message::text("chat_closure", "{\"answer\":\"20 days\"} TERMINATE"));
        t
    }

    #[test]
    fn window_returns_tail() {
        let t = sample();
        assert_eq!(t.window(2).len(), 2);
        assert_eq!(t.window(2)[1].speaker, "chat_closure");
        assert_eq!(t.window(50).len(), 5);
        assert!(Transcript::new().window(3).is_empty());
    }

    #[test]
    fn agent_message_count_excludes_user_and_tool_results() {
        assert_eq!(sample().agent_message_count(), 3);
    }

    #[test]
    fn last_text_lookups() {
        let t = sample();
        assert_eq!(t.last_text_from("chat_closure"), Some("{\"answer\":\"20 days\"} TERMINATE"));
        assert_eq!(
            t.last_text_from("main_assistant"),
            Some("You get 20 days. QUESTION_ANSWERED")
        );
        assert_eq!(t.last_text_from("nobody"), None);
        assert!(t.last_agent_text().unwrap().ends_with("TERMINATE"));
        assert_eq!(Transcript::with_ask("hi").last_agent_text(), None);
    }

    #[test]
    fn render_names_speakers() {
        let rendered = sample().render();
        assert!(rendered.starts_with("user: How many vacation days?"));
        assert!(rendered.contains("main_assistant -> vector_index_retrieve"));
    }
}
