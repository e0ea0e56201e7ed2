//! Streaming chat-completions client (§4.3).
//!
//! Implements the "coroutine-style streaming" split from §9's design notes:
//! a producer task reads the HTTP byte stream and pushes typed
//! [`StreamEvent`]s onto a channel; the consumer loop here owns the
//! content/reasoning/tool-call buffers and drives the [`Renderer`].

use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::constants::{CONTEXT_ONLY_TIMEOUT_SECS, STREAM_TIMEOUT_SECS};
use crate::message::{Message, ToolCall, ToolCallFunction};
use crate::output::Renderer;

/// A fragment of a provider tool-call delta, keyed by its stream `index`.
#[derive(Debug, Clone, Default)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ContentDelta {
    Content(String),
    Reasoning(String),
}

#[derive(Debug)]
pub enum StreamEvent {
    Delta(ContentDelta),
    ToolCall(ToolCallDelta),
    Error(String),
    Done,
}

/// Final, demuxed result of one streamed request.
#[derive(Debug, Default)]
pub struct StreamOutcome {
    pub content: String,
    pub reasoning: String,
    pub tool_calls: Vec<ToolCall>,
    /// Set when an operator interrupt aborted the stream early (§5); the
    /// buffers above still hold whatever was received before the abort.
    pub interrupted: bool,
}

#[derive(Default)]
struct ToolCallAccumulator {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Streams one chat-completions request to completion (or interruption).
///
/// `messages` must already be sanitized (§4.2). `tools` is the JSON tool
/// schema array sent verbatim as the request's `tools` field.
pub async fn stream_completion(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    model: &str,
    messages: &[Message],
    tools: &Value,
    renderer: &mut dyn Renderer,
    show_thinking: bool,
) -> StreamOutcome {
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);

    let body = json!({
        "model": model,
        "messages": messages,
        "tools": tools,
        "tool_choice": "auto",
        "stream": true,
    });

    let request = http
        .post(api_base)
        .bearer_auth(api_key)
        .timeout(Duration::from_secs(STREAM_TIMEOUT_SECS))
        .json(&body);

    let producer = tokio::spawn(async move { run_producer(request, tx).await });

    let mut content = String::new();
    let mut reasoning = String::new();
    let mut tool_calls: Vec<ToolCallAccumulator> = Vec::new();
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(StreamEvent::Delta(ContentDelta::Content(s))) => {
                        content.push_str(&s);
                        renderer.render_token(&s);
                    }
                    Some(StreamEvent::Delta(ContentDelta::Reasoning(s))) => {
                        reasoning.push_str(&s);
                        if show_thinking {
                            renderer.render_reasoning_token(&s);
                        }
                    }
                    Some(StreamEvent::ToolCall(delta)) => accumulate(&mut tool_calls, delta),
                    Some(StreamEvent::Error(err)) => renderer.render_error(&err),
                    Some(StreamEvent::Done) | None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                interrupted = true;
                producer.abort();
                renderer.warn("Interrupted");
                break;
            }
        }
    }

    let _ = producer.await;

    StreamOutcome {
        content,
        reasoning,
        tool_calls: finalize(tool_calls),
        interrupted,
    }
}

/// Sends `context_message` to the model as a one-off, non-streamed
/// request without touching the transcript (`b <script>`'s "read-only
/// context note", §4.12). Builds `messages` as the already-sanitized
/// history plus a throwaway trailing user message, posts with
/// `stream:false, max_tokens:1`, and discards the response entirely —
/// only the side effect on the provider's own context (if any) matters.
/// Errors are swallowed into a renderer warning, matching
/// `send_context_only`'s catch-and-print behavior.
pub async fn send_context_only(
    http: &reqwest::Client,
    api_base: &str,
    api_key: &str,
    model: &str,
    sanitized_history: &[Message],
    tools: &Value,
    context_message: &str,
    renderer: &mut dyn Renderer,
) {
    let mut one_off = sanitized_history.to_vec();
    one_off.push(Message::user(context_message));

    let body = json!({
        "model": model,
        "messages": one_off,
        "tools": tools,
        "tool_choice": "auto",
        "stream": false,
        "max_tokens": 1,
    });

    let result = http
        .post(api_base)
        .bearer_auth(api_key)
        .timeout(Duration::from_secs(CONTEXT_ONLY_TIMEOUT_SECS))
        .json(&body)
        .send()
        .await
        .and_then(|r| r.error_for_status());

    if let Err(e) = result {
        renderer.warn(&format!("failed to send context to LLM: {e}"));
    }
}

async fn run_producer(request: reqwest::RequestBuilder, tx: mpsc::Sender<StreamEvent>) {
    use futures::StreamExt;

    let response = match request.send().await {
        Ok(r) => r,
        Err(e) => {
            let _ = tx.send(StreamEvent::Error(format!("request failed: {e}"))).await;
            let _ = tx.send(StreamEvent::Done).await;
            return;
        }
    };

    if let Err(e) = response.error_for_status_ref() {
        let _ = tx.send(StreamEvent::Error(format!("http error: {e}"))).await;
        let _ = tx.send(StreamEvent::Done).await;
        return;
    }

    let mut byte_stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error(format!("stream read error: {e}"))).await;
                break;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(newline) = buffer.find('\n') {
            let line = buffer[..newline].trim_end_matches('\r').to_string();
            buffer.drain(..=newline);
            if process_line(&line, &tx).await {
                let _ = tx.send(StreamEvent::Done).await;
                return;
            }
        }
    }

    let _ = tx.send(StreamEvent::Done).await;
}

/// Processes one `data: ` line. Returns `true` if this was the terminal
/// `[DONE]` frame.
async fn process_line(line: &str, tx: &mpsc::Sender<StreamEvent>) -> bool {
    let Some(payload) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) else {
        return false;
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return false;
    }
    if payload == "[DONE]" {
        return true;
    }

    let Ok(frame) = serde_json::from_str::<Value>(payload) else {
        return false; // malformed delta JSON: silently skipped (§7)
    };

    let Some(delta) = frame.pointer("/choices/0/delta") else {
        return false;
    };

    if let Some(text) = delta.get("content").and_then(Value::as_str) {
        let _ = tx.send(StreamEvent::Delta(ContentDelta::Content(text.to_string()))).await;
    }
    if let Some(text) = delta.get("reasoning_content").and_then(Value::as_str) {
        let _ = tx.send(StreamEvent::Delta(ContentDelta::Reasoning(text.to_string()))).await;
    }
    if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
        for call in calls {
            let index = call.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
            let id = call.get("id").and_then(Value::as_str).map(str::to_string);
            let function = call.get("function");
            let name = function.and_then(|f| f.get("name")).and_then(Value::as_str).map(str::to_string);
            let arguments = function.and_then(|f| f.get("arguments")).and_then(Value::as_str).map(str::to_string);
            let _ = tx
                .send(StreamEvent::ToolCall(ToolCallDelta { index, id, name, arguments }))
                .await;
        }
    }

    false
}

fn accumulate(acc: &mut Vec<ToolCallAccumulator>, delta: ToolCallDelta) {
    if acc.len() <= delta.index {
        acc.resize_with(delta.index + 1, ToolCallAccumulator::default);
    }
    let entry = &mut acc[delta.index];
    if let Some(id) = delta.id {
        entry.id = Some(id);
    }
    if let Some(name) = delta.name {
        entry.name.push_str(&name);
    }
    if let Some(arguments) = delta.arguments {
        entry.arguments.push_str(&arguments);
    }
}

fn finalize(acc: Vec<ToolCallAccumulator>) -> Vec<ToolCall> {
    acc.into_iter()
        .filter(|a| !a.name.is_empty() || !a.arguments.is_empty())
        .map(|a| {
            let id = a.id.unwrap_or_else(generate_call_id);
            ToolCall {
                id,
                kind: "function".to_string(),
                function: ToolCallFunction {
                    name: a.name,
                    arguments: a.arguments,
                },
            }
        })
        .collect()
}

/// Generates a synthetic `call_<10-hex>` id for providers that never
/// supply one (§4.3).
pub fn generate_call_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("call_{}", &hex[..10])
}
