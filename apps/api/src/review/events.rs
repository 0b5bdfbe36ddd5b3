//! Typed progress events and their SSE encoding.
//!
//! Every event is created per emission, serialized immediately, and never
//! retained. The wire format is one SSE frame per event: `data: <JSON>`
//! followed by a blank line (framing handled by axum's `sse::Event`).

use axum::response::sse::Event;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc::UnboundedSender;

use crate::review::report::ReviewReport;

/// One progress message pushed to the client during an evaluation.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    StageStart {
        round: u8,
        reviewer: &'static str,
        message: String,
    },
    StageStreaming {
        round: u8,
        reviewer: &'static str,
        content: String,
    },
    StageComplete {
        round: u8,
        reviewer: &'static str,
        message: String,
    },
    StageError {
        round: u8,
        reviewer: &'static str,
        message: String,
    },
    /// Input gate rejection: the pipeline stops without further model calls.
    ValidationFailed { message: String },
    /// Terminal success message carrying the assembled report.
    Complete {
        review: ReviewReport,
        policy_analysis: String,
    },
    /// Terminal failure outside any single stage.
    Error { message: String },
}

impl ProgressEvent {
    pub fn to_value(&self) -> Value {
        match self {
            ProgressEvent::StageStart {
                round,
                reviewer,
                message,
            } => json!({
                "round": round,
                "reviewer": reviewer,
                "status": "start",
                "message": message,
            }),
            ProgressEvent::StageStreaming {
                round,
                reviewer,
                content,
            } => json!({
                "round": round,
                "reviewer": reviewer,
                "status": "streaming",
                "content": content,
            }),
            ProgressEvent::StageComplete {
                round,
                reviewer,
                message,
            } => json!({
                "round": round,
                "reviewer": reviewer,
                "status": "complete",
                "message": message,
            }),
            ProgressEvent::StageError {
                round,
                reviewer,
                message,
            } => json!({
                "round": round,
                "reviewer": reviewer,
                "status": "error",
                "message": message,
            }),
            ProgressEvent::ValidationFailed { message } => json!({
                "status": "validation_failed",
                "message": message,
            }),
            ProgressEvent::Complete {
                review,
                policy_analysis,
            } => json!({
                "status": "complete",
                "review": review,
                "policy_analysis": policy_analysis,
                "scoring_criteria": {},
            }),
            ProgressEvent::Error { message } => json!({
                "status": "error",
                "message": message,
            }),
        }
    }
}

/// Push side of the SSE channel.
///
/// A failed send means the client disconnected; callers treat it as
/// cancellation and stop issuing model calls. It must never panic — the
/// transport going away mid-generation is an expected outcome.
#[derive(Clone)]
pub struct EventSender {
    tx: UnboundedSender<ProgressEvent>,
}

impl EventSender {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Returns false once the client has disconnected.
    #[must_use]
    pub fn send(&self, event: ProgressEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Serializes an event to one SSE frame.
///
/// If encoding fails, all string leaves are sanitized and encoding retried
/// once; a failure after that degrades to a generic error frame. A single
/// malformed payload must never terminate the whole multi-stage session.
pub fn encode(event: &ProgressEvent) -> Event {
    let value = event.to_value();
    match serde_json::to_string(&value) {
        Ok(data) => Event::default().data(data),
        Err(first_err) => {
            let cleaned = sanitize_value(value);
            match serde_json::to_string(&cleaned) {
                Ok(data) => Event::default().data(data),
                Err(_) => {
                    let fallback = ProgressEvent::Error {
                        message: format!("数据序列化失败: {first_err}"),
                    };
                    Event::default().data(fallback.to_value().to_string())
                }
            }
        }
    }
}

/// Recursively strips undecodable or control sequences from every string
/// leaf. Structure and non-string values pass through unchanged.
fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_string(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (sanitize_string(&k), sanitize_value(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Keeps common whitespace, drops every other control character.
fn sanitize_string(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}
