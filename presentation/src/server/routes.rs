//! axum routes for the orchestrator.

use super::dto::{AskBody, ErrorBody};
use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::StreamExt;
use orc_application::{Orchestrator, StreamFrame, StreamOptions};
use orc_domain::util::short_id;
use std::convert::Infallible;
use tracing::{info, warn};

pub const JSON_LINES: &str = "application/stream+json";
pub const EVENT_STREAM: &str = "text/event-stream";

/// `/orc`, `/orcstream` (also under `/api/`) and `/health`.
pub fn router(orchestrator: Orchestrator) -> Router {
    Router::new()
        .route("/orc", post(orc))
        .route("/orcstream", post(orc_stream))
        .route("/api/orc", post(orc))
        .route("/api/orcstream", post(orc_stream))
        .route("/health", get(health))
        .with_state(orchestrator)
}

async fn health() -> &'static str {
    "ok"
}

fn bad_request() -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorBody::no_question())).into_response()
}

async fn orc(State(orchestrator): State<Orchestrator>, body: Bytes) -> Response {
    let Some(request) = AskBody::parse(&body).and_then(AskBody::into_request) else {
        warn!("Rejected /orc request without a question");
        return bad_request();
    };
    info!(
        conversation = %request.conversation_id.as_deref().map(short_id).unwrap_or("new"),
        "Answering"
    );
    Json(orchestrator.answer(request).await).into_response()
}

async fn orc_stream(State(orchestrator): State<Orchestrator>, body: Bytes) -> Response {
    let Some(parsed) = AskBody::parse(&body) else {
        warn!("Rejected /orcstream request with invalid JSON");
        return bad_request();
    };
    let text_only = parsed.wants_text_only();
    let options = StreamOptions {
        optimize_for_audio: parsed.wants_audio(),
    };
    let Some(request) = parsed.into_request() else {
        warn!("Rejected /orcstream request without a question");
        return bad_request();
    };

    let frames = orchestrator.answer_stream(request, options);
    let (content_type, body) = if text_only {
        let chunks = frames
            .filter_map(|frame| async move { text_chunk(frame) })
            .map(Ok::<_, Infallible>);
        (EVENT_STREAM, Body::from_stream(chunks))
    } else {
        let lines = frames.map(|frame| Ok::<_, Infallible>(json_line(&frame)));
        (JSON_LINES, Body::from_stream(lines))
    };
    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

/// One frame as a newline-terminated JSON document.
fn json_line(frame: &StreamFrame) -> String {
    let mut line = serde_json::to_string(frame).unwrap_or_else(|e| {
        serde_json::json!({ "error": format!("frame encoding failed: {e}") }).to_string()
    });
    line.push('\n');
    line
}

/// Plain-text rendition: content and error text, blank lines as heartbeats.
fn text_chunk(frame: StreamFrame) -> Option<String> {
    match frame {
        StreamFrame::ConversationId { .. } => None,
        StreamFrame::Content { content, .. } => Some(content).filter(|c| !c.is_empty()),
        StreamFrame::Heartbeat { .. } => Some("\n\n".to_string()),
        StreamFrame::Error { error } => Some(error),
    }
}
