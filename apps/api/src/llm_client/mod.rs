//! LLM Client — the single point of entry for all chat-completion calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to the upstream API directly.
//! All model interactions MUST go through this module.
//!
//! The upstream is any OpenAI-compatible `/chat/completions` endpoint, used in
//! two modes: blocking (`complete`) and incremental (`stream`). Streaming
//! replies arrive as SSE `data:` lines whose payloads carry content deltas.

use futures::StreamExt;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::config::Config;

/// Marker line terminating an upstream SSE stream.
const DONE_MARKER: &str = "[DONE]";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Receiver half of a streaming call: one item per content delta, a final
/// `Err` if the stream breaks mid-flight.
pub type DeltaStream = UnboundedReceiver<Result<String, LlmError>>;

/// Resolved endpoint settings for one request.
///
/// Defaults come from [`Config`]; every field can be overridden by the caller
/// per request. The policy stage resolves its own endpoint so it can point at
/// a different gateway and model than the main evaluation stages.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmEndpoint {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl LlmEndpoint {
    /// Endpoint for the main evaluation stages. Overrides beat env defaults.
    pub fn primary(
        config: &Config,
        model: Option<&str>,
        base_url: Option<&str>,
        api_key: Option<&str>,
    ) -> Self {
        Self {
            base_url: base_url.unwrap_or(&config.llm_base_url).to_string(),
            api_key: api_key.unwrap_or(&config.llm_api_key).to_string(),
            model: model.unwrap_or(&config.llm_model).to_string(),
        }
    }

    /// Endpoint for the policy-analysis stage. Inherits the primary endpoint's
    /// gateway and key, but keeps its own default model when not overridden.
    pub fn policy(
        config: &Config,
        primary: &LlmEndpoint,
        model: Option<&str>,
        base_url: Option<&str>,
        api_key: Option<&str>,
    ) -> Self {
        Self {
            base_url: base_url.unwrap_or(&primary.base_url).to_string(),
            api_key: api_key.unwrap_or(&primary.api_key).to_string(),
            model: model.unwrap_or(&config.policy_model).to_string(),
        }
    }
}

/// Per-call decoding parameters. Each pipeline stage pins its own values.
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

/// Chat-completions client bound to one resolved endpoint.
#[derive(Clone)]
pub struct LlmClient {
    http: HttpClient,
    endpoint: LlmEndpoint,
}

impl LlmClient {
    pub fn new(http: HttpClient, endpoint: LlmEndpoint) -> Self {
        Self { http, endpoint }
    }

    fn url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.endpoint.base_url.trim_end_matches('/')
        )
    }

    async fn send(
        &self,
        system: &str,
        user: &str,
        options: ChatOptions,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream,
        };

        let response = self
            .http
            .post(self.url())
            .bearer_auth(&self.endpoint.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    /// Blocking call: returns the full completion text in one piece.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        options: ChatOptions,
    ) -> Result<String, LlmError> {
        let response = self.send(system, user, options, false).await?;
        let completion: ChatCompletion = response.json().await?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    /// Incremental call: returns a channel of content deltas.
    ///
    /// The body is consumed on a background task. Unparseable SSE payloads are
    /// skipped rather than failing the stream; a transport failure mid-stream
    /// surfaces as one final `Err` item.
    pub async fn stream(
        &self,
        system: &str,
        user: &str,
        options: ChatOptions,
    ) -> Result<DeltaStream, LlmError> {
        let response = self.send(system, user, options, true).await?;
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut lines = SseLineBuffer::default();

            while let Some(next) = body.next().await {
                let bytes = match next {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(LlmError::Http(e)));
                        return;
                    }
                };
                for line in lines.push(&bytes) {
                    match decode_sse_line(&line) {
                        StreamEvent::Delta(text) => {
                            // receiver gone: the caller stopped draining
                            if tx.send(Ok(text)).is_err() {
                                return;
                            }
                        }
                        StreamEvent::Done => return,
                        StreamEvent::Skip => {}
                    }
                }
            }
            debug!("upstream stream ended without {DONE_MARKER}");
        });

        Ok(rx)
    }
}

/// Accumulates raw response bytes and yields complete lines.
///
/// Network chunks can split anywhere, including mid-UTF-8-sequence, so the
/// buffer stays in bytes until a full line is available.
#[derive(Default)]
struct SseLineBuffer {
    raw: Vec<u8>,
}

impl SseLineBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.raw.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.raw.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.raw.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim().to_string());
        }
        lines
    }
}

#[derive(Debug, PartialEq)]
enum StreamEvent {
    Delta(String),
    Done,
    Skip,
}

/// Decodes one line of the upstream SSE stream.
fn decode_sse_line(line: &str) -> StreamEvent {
    let Some(payload) = line.strip_prefix("data:") else {
        return StreamEvent::Skip;
    };
    let payload = payload.trim_start();
    if payload == DONE_MARKER {
        return StreamEvent::Done;
    }
    let Ok(chunk) = serde_json::from_str::<StreamChunk>(payload) else {
        return StreamEvent::Skip;
    };
    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
    {
        Some(text) if !text.is_empty() => StreamEvent::Delta(text),
        _ => StreamEvent::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            llm_base_url: "https://gateway.example/v1".to_string(),
            llm_api_key: "env-key".to_string(),
            llm_model: "deepseek-v3".to_string(),
            policy_model: "deepseek-r1-search-pro".to_string(),
            port: 4091,
            rust_log: "info".to_string(),
        }
    }

    #[test]
    fn test_primary_endpoint_defaults_from_config() {
        let endpoint = LlmEndpoint::primary(&test_config(), None, None, None);
        assert_eq!(endpoint.base_url, "https://gateway.example/v1");
        assert_eq!(endpoint.api_key, "env-key");
        assert_eq!(endpoint.model, "deepseek-v3");
    }

    #[test]
    fn test_primary_endpoint_overrides_beat_defaults() {
        let endpoint = LlmEndpoint::primary(
            &test_config(),
            Some("qwen-max"),
            Some("https://other.example/v1"),
            Some("user-key"),
        );
        assert_eq!(endpoint.base_url, "https://other.example/v1");
        assert_eq!(endpoint.api_key, "user-key");
        assert_eq!(endpoint.model, "qwen-max");
    }

    #[test]
    fn test_policy_endpoint_inherits_primary_but_keeps_own_model() {
        let config = test_config();
        let primary = LlmEndpoint::primary(&config, Some("qwen-max"), None, Some("user-key"));
        let policy = LlmEndpoint::policy(&config, &primary, None, None, None);
        assert_eq!(policy.base_url, primary.base_url);
        assert_eq!(policy.api_key, "user-key");
        assert_eq!(policy.model, "deepseek-r1-search-pro");
    }

    #[test]
    fn test_policy_endpoint_full_override() {
        let config = test_config();
        let primary = LlmEndpoint::primary(&config, None, None, None);
        let policy = LlmEndpoint::policy(
            &config,
            &primary,
            Some("policy-model"),
            Some("https://policy.example/v1"),
            Some("policy-key"),
        );
        assert_eq!(policy.base_url, "https://policy.example/v1");
        assert_eq!(policy.api_key, "policy-key");
        assert_eq!(policy.model, "policy-model");
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let client = LlmClient::new(
            HttpClient::new(),
            LlmEndpoint {
                base_url: "https://gateway.example/v1/".to_string(),
                api_key: String::new(),
                model: "m".to_string(),
            },
        );
        assert_eq!(client.url(), "https://gateway.example/v1/chat/completions");
    }

    #[test]
    fn test_decode_sse_line_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"你好"}}]}"#;
        assert_eq!(
            decode_sse_line(line),
            StreamEvent::Delta("你好".to_string())
        );
    }

    #[test]
    fn test_decode_sse_line_done() {
        assert_eq!(decode_sse_line("data: [DONE]"), StreamEvent::Done);
    }

    #[test]
    fn test_decode_sse_line_skips_non_data_lines() {
        assert_eq!(decode_sse_line(": keep-alive"), StreamEvent::Skip);
        assert_eq!(decode_sse_line(""), StreamEvent::Skip);
    }

    #[test]
    fn test_decode_sse_line_skips_malformed_json() {
        assert_eq!(
            decode_sse_line(r#"data: {"choices":[{"delta":{"cont"#),
            StreamEvent::Skip
        );
    }

    #[test]
    fn test_decode_sse_line_skips_empty_delta() {
        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(decode_sse_line(role_only), StreamEvent::Skip);
        let empty = r#"data: {"choices":[{"delta":{"content":""}}]}"#;
        assert_eq!(decode_sse_line(empty), StreamEvent::Skip);
    }

    #[test]
    fn test_line_buffer_joins_split_lines() {
        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push(b"data: {\"a\"").is_empty());
        let lines = buffer.push(b": 1}\n");
        assert_eq!(lines, vec!["data: {\"a\": 1}".to_string()]);
    }

    #[test]
    fn test_line_buffer_survives_multibyte_split() {
        // "你" is three bytes; split it across two network chunks
        let encoded = "data: 你好\n".as_bytes();
        let mut buffer = SseLineBuffer::default();
        assert!(buffer.push(&encoded[..7]).is_empty());
        let lines = buffer.push(&encoded[7..]);
        assert_eq!(lines, vec!["data: 你好".to_string()]);
    }

    #[test]
    fn test_line_buffer_yields_multiple_lines_per_chunk() {
        let mut buffer = SseLineBuffer::default();
        let lines = buffer.push(b"data: a\n\ndata: b\n");
        assert_eq!(lines, vec!["data: a", "", "data: b"]);
    }
}
