//! Axum route handlers for the evaluation API.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, Sse},
    Json,
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::llm_client::{LlmClient, LlmEndpoint};
use crate::review::events::{self, EventSender};
use crate::review::pipeline::ReviewPipeline;
use crate::state::AppState;

/// Request body for the streaming evaluation. All endpoint fields are
/// optional per-request overrides of the configured defaults; empty strings
/// are treated as absent.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(default)]
    pub proposal_text: String,
    #[serde(default)]
    pub api_name: Option<String>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub policy_api_name: Option<String>,
    #[serde(default)]
    pub policy_api_base: Option<String>,
    #[serde(default)]
    pub policy_api_key: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// POST /evaluate_stream
///
/// Opens the SSE stream and spawns the pipeline onto a background task. All
/// progress and all failures flow through the stream as events; the HTTP
/// status is committed before the first model call is made.
pub async fn handle_evaluate_stream(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let primary = LlmEndpoint::primary(
        &state.config,
        non_empty(&request.api_name),
        non_empty(&request.api_base),
        non_empty(&request.api_key),
    );
    let policy = LlmEndpoint::policy(
        &state.config,
        &primary,
        non_empty(&request.policy_api_name),
        non_empty(&request.policy_api_base),
        non_empty(&request.policy_api_key),
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = ReviewPipeline::new(
        LlmClient::new(state.http.clone(), primary),
        LlmClient::new(state.http.clone(), policy),
        EventSender::new(tx),
    );
    tokio::spawn(pipeline.run(request.proposal_text));

    let stream =
        UnboundedReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(events::encode(&event)));
    Sse::new(stream)
}

/// POST /evaluate
///
/// Legacy stub kept for older clients; evaluation only runs over the
/// streaming endpoint.
pub async fn handle_evaluate(Json(request): Json<EvaluateRequest>) -> Json<Value> {
    if request.proposal_text.trim().is_empty() {
        return Json(json!({ "success": false, "error": "请提供研究计划文本" }));
    }
    Json(json!({ "success": true, "message": "请使用流式评估接口" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_filters_blank_overrides() {
        assert_eq!(non_empty(&None), None);
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&Some("  ".to_string())), None);
        assert_eq!(non_empty(&Some(" qwen-max ".to_string())), Some("qwen-max"));
    }

    #[test]
    fn test_request_fields_all_optional_except_defaulted_text() {
        let request: EvaluateRequest = serde_json::from_str("{}").expect("deserialize");
        assert!(request.proposal_text.is_empty());
        assert!(request.api_name.is_none());
        assert!(request.policy_api_key.is_none());
    }

    #[tokio::test]
    async fn test_legacy_endpoint_rejects_empty_text() {
        let Json(body) = handle_evaluate(Json(
            serde_json::from_str::<EvaluateRequest>("{}").expect("deserialize"),
        ))
        .await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_legacy_endpoint_points_at_streaming() {
        let request =
            serde_json::from_str::<EvaluateRequest>(r#"{"proposal_text": "申请材料"}"#)
                .expect("deserialize");
        let Json(body) = handle_evaluate(Json(request)).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "请使用流式评估接口");
    }
}
