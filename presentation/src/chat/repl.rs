//! Console chat against an in-process orchestrator

use crate::output::console::ConsoleFormatter;
use colored::Colorize;
use orc_application::{AskRequest, Orchestrator};
use orc_domain::{AnswerEnvelope, Credentials, Question};
use std::io::{self, Write};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Line-based chat loop.
///
/// Each line is one ask; the conversation id of the first answer is reused
/// for the following ones. End-of-input (Ctrl-D) prints the group chat and
/// data points behind the last answer; a second one in a row leaves.
pub struct ConsoleChat {
    orchestrator: Orchestrator,
    credentials: Credentials,
    conversation_id: Option<String>,
    last: Option<AnswerEnvelope>,
}

enum Flow {
    Continue,
    Quit,
}

impl ConsoleChat {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            credentials: Credentials::anonymous(),
            conversation_id: None,
            last: None,
        }
    }

    /// Continue an existing conversation.
    pub fn with_conversation_id(mut self, id: Option<String>) -> Self {
        self.conversation_id = id.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Run on the process stdin and stdout.
    pub async fn run(&mut self) -> io::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        self.run_with(stdin, &mut io::stdout()).await
    }

    pub async fn run_with<R, W>(&mut self, input: R, out: &mut W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        self.print_welcome(out)?;
        let mut lines = input.lines();
        let mut at_eof = false;

        loop {
            write!(out, "{}", "You: ".bold())?;
            out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(out)?;
                if at_eof {
                    writeln!(out, "Bye!")?;
                    return Ok(());
                }
                at_eof = true;
                self.print_last_details(out)?;
                continue;
            };
            at_eof = false;

            let line = line.trim();
            if line.is_empty() {
                writeln!(out, "Error: Input cannot be empty.")?;
                continue;
            }
            if line.starts_with('/') {
                match self.handle_command(line, out)? {
                    Flow::Quit => return Ok(()),
                    Flow::Continue => continue,
                }
            }

            self.process_question(line, out).await?;
        }
    }

    fn print_welcome<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", "orc chat".cyan().bold())?;
        writeln!(out, "Strategy: {}", self.orchestrator.strategy())?;
        writeln!(
            out,
            "Ctrl-D shows the agent group chat of the last answer, /help lists commands."
        )?;
        writeln!(out)
    }

    fn handle_command<W: Write>(&mut self, cmd: &str, out: &mut W) -> io::Result<Flow> {
        match cmd {
            "/quit" | "/exit" | "/q" => {
                writeln!(out, "Bye!")?;
                return Ok(Flow::Quit);
            }
            "/help" | "/h" | "/?" => {
                writeln!(out, "Commands:")?;
                writeln!(out, "  /details          - Show thoughts and data points")?;
                writeln!(out, "  /new              - Start a new conversation")?;
                writeln!(out, "  /quit, /exit, /q  - Exit chat")?;
            }
            "/details" => self.print_last_details(out)?,
            "/new" => {
                self.conversation_id = None;
                self.last = None;
                writeln!(out, "Started a new conversation.")?;
            }
            _ => {
                writeln!(out, "Unknown command: {}", cmd)?;
                writeln!(out, "Type /help for available commands")?;
            }
        }
        Ok(Flow::Continue)
    }

    async fn process_question<W: Write>(&mut self, text: &str, out: &mut W) -> io::Result<()> {
        let Some(question) = Question::try_new(text) else {
            return Ok(());
        };
        let request = AskRequest::new(question, self.credentials.clone())
            .with_conversation_id(self.conversation_id.clone());
        let envelope = self.orchestrator.answer(request).await;

        self.conversation_id = Some(envelope.conversation_id.clone());
        write!(out, "{}", ConsoleFormatter::format_answer_only(&envelope))?;
        if !envelope.reasoning.is_empty() {
            writeln!(out, "{} {}", "Reasoning:".blue(), envelope.reasoning.dimmed())?;
        }
        writeln!(out)?;
        self.last = Some(envelope);
        Ok(())
    }

    fn print_last_details<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let Some(envelope) = &self.last else {
            return writeln!(
                out,
                "No previous response to display thoughts and data points."
            );
        };
        writeln!(
            out,
            "{}",
            "--- Agent Group Chat from Last Response ---".bright_cyan()
        )?;
        write!(out, "{}", ConsoleFormatter::format_thoughts(envelope))?;
        write!(out, "{}", ConsoleFormatter::format_data_points(envelope))?;
        writeln!(out, "{}", "-".repeat(43).bright_cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orc_application::{
        ConversationStore, ConversationStoreError, GatewayError, LlmGateway, ModelRequest,
        TemplateError, TemplateStore, ToolExecutorPort, ToolSchemaPort,
    };
    use orc_domain::{
        Conversation, LlmResponse, ToolCall, ToolContext, ToolDefinition, ToolError, ToolResult,
        ToolSpec,
    };
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    struct EchoGateway;

    #[async_trait]
    impl LlmGateway for EchoGateway {
        async fn send(&self, _request: ModelRequest) -> Result<LlmResponse, GatewayError> {
            Ok(LlmResponse::from_text(
                r#"{"answer":"Noted.","reasoning":"Acknowledged."} TERMINATE"#,
            ))
        }
    }

    struct NoTools(ToolSpec);

    #[async_trait]
    impl ToolExecutorPort for NoTools {
        fn tool_spec(&self) -> &ToolSpec {
            &self.0
        }

        async fn execute(&self, call: &ToolCall, _context: &ToolContext) -> ToolResult {
            ToolResult::failure(&call.tool_name, ToolError::not_found(&call.tool_name))
        }
    }

    struct NoSchema;

    impl ToolSchemaPort for NoSchema {
        fn tool_to_schema(&self, tool: &ToolDefinition) -> Value {
            Value::String(tool.name.clone())
        }

        fn all_tools_schema(&self, _spec: &ToolSpec) -> Vec<Value> {
            Vec::new()
        }
    }

    struct FixedTemplates;

    #[async_trait]
    impl TemplateStore for FixedTemplates {
        async fn load(
            &self,
            _strategy: &str,
            agent: &str,
            _placeholders: &HashMap<String, String>,
        ) -> Result<String, TemplateError> {
            Ok(format!("You are {agent}."))
        }
    }

    #[derive(Default)]
    struct Store(Mutex<HashMap<String, Conversation>>);

    #[async_trait]
    impl ConversationStore for Store {
        async fn get(&self, id: &str) -> Result<Option<Conversation>, ConversationStoreError> {
            Ok(self.0.lock().unwrap().get(id).cloned())
        }

        async fn create(&self, id: &str) -> Result<Conversation, ConversationStoreError> {
            Ok(Conversation::new(id))
        }

        async fn update(
            &self,
            conversation: Conversation,
        ) -> Result<Conversation, ConversationStoreError> {
            self.0
                .lock()
                .unwrap()
                .insert(conversation.id.clone(), conversation.clone());
            Ok(conversation)
        }
    }

    fn chat(store: Arc<Store>) -> ConsoleChat {
        ConsoleChat::new(Orchestrator::new(
            Arc::new(EchoGateway),
            Arc::new(NoTools(ToolSpec::new())),
            Arc::new(NoSchema),
            store,
            Arc::new(FixedTemplates),
        ))
    }

    async fn transcript(chat: &mut ConsoleChat, input: &str) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        chat.run_with(input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_conversation_id_is_kept_across_turns() {
        let store = Arc::new(Store::default());
        let mut chat = chat(store.clone());
        let text = transcript(&mut chat, "Hello\nAnd again\n/quit\n").await;

        assert_eq!(text.matches("Answer: Noted.").count(), 2);
        assert!(text.contains("Reasoning: Acknowledged."));
        let id = chat.conversation_id().unwrap().to_string();
        let stored = store.0.lock().unwrap().get(&id).cloned().unwrap();
        assert_eq!(stored.history.len(), 4);
    }

    #[tokio::test]
    async fn test_end_of_input_shows_details_then_leaves() {
        let mut chat = chat(Arc::new(Store::default()));
        let text = transcript(&mut chat, "Hello\n").await;

        assert!(text.contains("--- Agent Group Chat from Last Response ---"));
        assert!(text.trim_end().ends_with("Bye!"));
    }

    #[tokio::test]
    async fn test_details_without_answer() {
        let mut chat = chat(Arc::new(Store::default()));
        let text = transcript(&mut chat, "/details\n\n/q\n").await;
        assert!(text.contains("No previous response to display thoughts and data points."));
        assert!(text.contains("Error: Input cannot be empty."));
        assert!(chat.conversation_id().is_none());
    }

    #[tokio::test]
    async fn test_new_resets_conversation() {
        let mut chat = chat(Arc::new(Store::default()));
        transcript(&mut chat, "Hello\n/new\n/quit\n").await;
        assert!(chat.conversation_id().is_none());
    }
}
