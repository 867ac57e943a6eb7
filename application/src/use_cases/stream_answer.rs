//! Streaming answers.
//!
//! The exchange runs in a spawned task that reports [`EngineEvent`]s over a
//! channel; this side turns them into [`StreamFrame`]s:
//!
//! - the first frame is always the conversation id
//! - the active agent's partial output is forwarded as soon as it arrives,
//!   with the termination marker cut out (even when split across deltas)
//! - a closing agent that answers in JSON streams only its `answer` text
//! - audio output strips markdown from every forwarded chunk
//! - a numbered heartbeat goes out whenever nothing was forwarded for the
//!   heartbeat interval
//! - the chunk that reaches the marker, or the last chunk, is marked final
//! - an aborted exchange ends with one error frame
//!
//! Persistence happens inside the task, exactly once. Dropping the stream
//! cancels the task; an exchange cancelled before reaching a terminal state
//! is not persisted.

use crate::use_cases::group_chat::EngineEvent;
use crate::use_cases::orchestrator::{AskRequest, ExchangeEnd, Orchestrator};
use futures::Stream;
use orc_domain::synthesis::PROCESSING_ERROR_ANSWER;
use orc_domain::synthesis::speech::{SpeechChunker, sanitize_for_speech};
use orc_domain::{AnswerFieldFilter, MarkerFilter};
use orc_domain::util::short_id;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// One unit of a streamed answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamFrame {
    ConversationId {
        conversation_id: String,
    },
    Content {
        content: String,
        #[serde(rename = "final")]
        is_final: bool,
    },
    Heartbeat {
        heartbeat: u64,
    },
    Error {
        error: String,
    },
}

impl StreamFrame {
    pub fn content(content: impl Into<String>, is_final: bool) -> Self {
        StreamFrame::Content {
            content: content.into(),
            is_final,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self, StreamFrame::Content { is_final: true, .. })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StreamOptions {
    /// Strip markdown from every chunk for text-to-speech
    pub optimize_for_audio: bool,
}

/// Raw deltas in, forwardable text out: marker removal, then the JSON
/// `answer` field for the closing agent, then speech cleanup.
struct ContentPipeline {
    marker: MarkerFilter,
    answer: Option<AnswerFieldFilter>,
    speech: Option<SpeechChunker>,
}

impl ContentPipeline {
    fn new(marker: &str, json_answer: bool, optimize_for_audio: bool) -> Self {
        Self {
            marker: MarkerFilter::new(marker),
            answer: json_answer.then(AnswerFieldFilter::new),
            speech: optimize_for_audio.then(SpeechChunker::new),
        }
    }

    fn marker_seen(&self) -> bool {
        self.marker.marker_seen()
    }

    fn push(&mut self, delta: &str, from_closing_agent: bool) -> String {
        let mut text = self.marker.push(delta);
        if from_closing_agent && let Some(answer) = self.answer.as_mut() {
            text = answer.push(&text);
        }
        match self.speech.as_mut() {
            Some(speech) => speech.push(&text),
            None => text,
        }
    }

    /// Append everything still held back to `text`.
    fn close(&mut self, mut text: String) -> String {
        let mut rest = self.marker.finish();
        if let Some(answer) = self.answer.as_mut() {
            rest = answer.push(&rest);
            rest.push_str(&answer.finish());
        }
        match self.speech.as_mut() {
            Some(speech) => {
                text.push_str(&speech.push(&rest));
                text.push_str(&speech.finish());
                text.truncate(text.trim_end().len());
            }
            None => text.push_str(&rest),
        }
        text
    }
}

enum Step {
    Event(Option<EngineEvent>),
    Idle,
}

impl Orchestrator {
    /// Answer one ask as a stream of frames. See the module docs.
    pub fn answer_stream(
        &self,
        request: AskRequest,
        options: StreamOptions,
    ) -> impl Stream<Item = StreamFrame> + Send + 'static {
        let this = self.clone();
        async_stream::stream! {
            let conversation_id = request.resolve_conversation_id();
            yield StreamFrame::ConversationId { conversation_id: conversation_id.clone() };

            let params = this.params().clone();
            let closing_agent = this.closing_agent().unwrap_or_default();
            let mut pipeline = ContentPipeline::new(
                params.terminate_marker.as_str(),
                this.closing_answers_json(),
                options.optimize_for_audio,
            );

            let (tx, mut rx) = mpsc::unbounded_channel();
            let cancel = CancellationToken::new();
            // Dropping the stream cancels the exchange
            let _cancel_on_drop = cancel.clone().drop_guard();
            let task = {
                let this = this.clone();
                let conversation_id = conversation_id.clone();
                tokio::spawn(async move {
                    this.exchange(&request, &conversation_id, Some(&tx), &cancel).await
                })
            };

            let mut deadline = Instant::now() + params.heartbeat_interval;
            let mut heartbeats = 0u64;
            let mut streamed = false;
            let mut finished = false;

            loop {
                let step = tokio::select! {
                    event = rx.recv() => Step::Event(event),
                    _ = tokio::time::sleep_until(deadline) => Step::Idle,
                };
                match step {
                    Step::Idle => {
                        heartbeats += 1;
                        deadline = Instant::now() + params.heartbeat_interval;
                        yield StreamFrame::Heartbeat { heartbeat: heartbeats };
                    }
                    Step::Event(None) => break,
                    Step::Event(Some(EngineEvent::TextDelta { speaker, delta })) => {
                        if finished || !(params.stream_all_agents || speaker == closing_agent) {
                            continue;
                        }
                        let text = pipeline.push(&delta, speaker == closing_agent);
                        if pipeline.marker_seen() {
                            let text = pipeline.close(text);
                            // Nothing to show yet: the synthesized answer goes out at the end
                            if streamed || !text.is_empty() {
                                finished = true;
                                deadline = Instant::now() + params.heartbeat_interval;
                                yield StreamFrame::content(text, true);
                            }
                        } else if !text.is_empty() {
                            streamed = true;
                            deadline = Instant::now() + params.heartbeat_interval;
                            yield StreamFrame::content(text, false);
                        }
                    }
                    Step::Event(Some(event)) => {
                        debug!(conversation = %short_id(&conversation_id), event = ?event, "Engine event");
                    }
                }
            }

            let end: Option<ExchangeEnd> = match task.await {
                Ok(end) => end,
                Err(e) => {
                    error!(conversation = %short_id(&conversation_id), error = %e, "Exchange task failed");
                    None
                }
            };
            match end {
                Some(end) if end.failed => {
                    yield StreamFrame::Error { error: end.envelope.answer };
                }
                Some(_) if finished => {}
                Some(end) => {
                    let tail = if streamed {
                        pipeline.close(String::new())
                    } else if options.optimize_for_audio {
                        sanitize_for_speech(&end.envelope.answer)
                    } else {
                        end.envelope.answer
                    };
                    yield StreamFrame::content(tail, true);
                }
                None => {
                    yield StreamFrame::Error { error: PROCESSING_ERROR_ANSWER.to_string() };
                }
            }
        }
    }
}
