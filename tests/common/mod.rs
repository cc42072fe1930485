//! Shared test utilities: handlers, server bootstrap, request builders, and
//! SSE parsing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};

use a2a_mesh::builders::{AgentCardBuilder, ServerBuilder};
use a2a_mesh::error::A2AResult;
use a2a_mesh::prelude::*;
use a2a_mesh::server::{Handler, HandlerContext, UpdateSink};
use a2a_mesh::types::Role;

/// Echoes the user's text back: working → completed(echo).
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn run(&self, ctx: HandlerContext, updates: UpdateSink) -> A2AResult<()> {
        updates.working(None).await?;
        updates
            .complete(Some(Message::agent_text(ctx.user_input("\n"))))
            .await?;
        Ok(())
    }
}

/// Streams an artifact in two chunks:
/// working → artifact("r.txt", "AB") → artifact(append "CD") → completed.
pub struct StreamingArtifactHandler;

#[async_trait]
impl Handler for StreamingArtifactHandler {
    async fn run(&self, _ctx: HandlerContext, updates: UpdateSink) -> A2AResult<()> {
        updates.working(None).await?;
        updates
            .text_artifact(Some("r.txt"), 0, false, "AB", None)
            .await?;
        updates.text_artifact(None, 0, true, "CD", Some(true)).await?;
        updates.complete(None).await?;
        Ok(())
    }
}

/// Asks for more input on the first turn, completes on the second.
pub struct PausingHandler;

#[async_trait]
impl Handler for PausingHandler {
    async fn run(&self, ctx: HandlerContext, updates: UpdateSink) -> A2AResult<()> {
        let user_turns = ctx
            .task
            .history
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|m| m.role == Role::User)
            .count();

        if user_turns <= 1 {
            updates.input_required("please provide more detail").await?;
        } else {
            updates.working(None).await?;
            updates.complete_with_text("all done").await?;
        }
        Ok(())
    }
}

/// Yields working, then idles until the task is canceled.
pub struct SuspendingHandler;

#[async_trait]
impl Handler for SuspendingHandler {
    async fn run(&self, ctx: HandlerContext, updates: UpdateSink) -> A2AResult<()> {
        updates.working(None).await?;
        while !ctx.is_canceled() {
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        Ok(())
    }
}

/// Always fails.
pub struct FailingHandler;

#[async_trait]
impl Handler for FailingHandler {
    async fn run(&self, _ctx: HandlerContext, _updates: UpdateSink) -> A2AResult<()> {
        Err(A2AError::internal_error("intentional handler failure"))
    }
}

/// Fails on the first run, echoes on every later run.
pub struct FlakyHandler {
    failed_once: AtomicBool,
}

impl FlakyHandler {
    pub fn new() -> Self {
        Self {
            failed_once: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Handler for FlakyHandler {
    async fn run(&self, ctx: HandlerContext, updates: UpdateSink) -> A2AResult<()> {
        if !self.failed_once.swap(true, Ordering::SeqCst) {
            return Err(A2AError::internal_error("transient failure"));
        }
        updates.working(None).await?;
        updates
            .complete(Some(Message::agent_text(ctx.user_input("\n"))))
            .await?;
        Ok(())
    }
}

/// A fully-featured test agent card.
pub fn full_card(url: &str) -> AgentCard {
    AgentCardBuilder::new("Test Agent", "0.1.0")
        .with_url(url)
        .with_description("An agent for integration tests")
        .with_streaming(true)
        .with_push_notifications(true)
        .with_knowledge_graph(vec!["graphql".to_string()])
        .with_skill("echo", "Echo", Some("Echoes messages back"))
        .build()
        .unwrap()
}

/// Start a server for the handler on a random port. Returns the base URL.
pub async fn start_server(handler: Arc<dyn Handler>) -> String {
    start_server_with(handler, None).await
}

/// Start a server with an explicit card (defaults to [`full_card`]).
pub async fn start_server_with(handler: Arc<dyn Handler>, card: Option<AgentCard>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let card = card.unwrap_or_else(|| full_card(&format!("{}/", base_url)));
    let app = ServerBuilder::new(handler)
        .with_agent_card(card)
        .with_knowledge_store_default()
        .build()
        .unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Brief wait for the listener to start accepting.
    tokio::time::sleep(Duration::from_millis(50)).await;
    base_url
}

/// Build a JSON-RPC request body.
pub fn jsonrpc(id: Value, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Build `tasks/send` params for a single text message.
pub fn send_params(task_id: &str, text: &str) -> Value {
    json!({
        "id": task_id,
        "message": {"role": "user", "parts": [{"type": "text", "text": text}]}
    })
}

/// POST a JSON-RPC request and return (status, body).
pub async fn rpc(base_url: &str, body: &Value) -> (u16, Value) {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/", base_url))
        .json(body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body: Value = response.json().await.unwrap();
    (status, body)
}

/// Parse `data:` frames out of a full SSE body.
pub fn sse_frames(body: &str) -> Vec<Value> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .filter(|data| !data.trim().is_empty())
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

/// A streaming SSE reader that yields frames as they arrive.
pub struct SseReader {
    stream: std::pin::Pin<
        Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>,
    >,
    buffer: String,
    pending: std::collections::VecDeque<Value>,
}

impl SseReader {
    /// POST the request and open the SSE response.
    pub async fn open(base_url: &str, body: &Value) -> Self {
        let client = reqwest::Client::new();
        let response = client
            .post(format!("{}/", base_url))
            .json(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        assert!(response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("text/event-stream"))
            .unwrap_or(false));
        Self {
            stream: Box::pin(response.bytes_stream()),
            buffer: String::new(),
            pending: std::collections::VecDeque::new(),
        }
    }

    /// Next `data:` frame, or `None` once the stream closes.
    pub async fn next_frame(&mut self) -> Option<Value> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(frame);
            }
            match self.stream.next().await {
                Some(Ok(chunk)) => {
                    self.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(boundary) = self.buffer.find("\n\n") {
                        let block: String = self.buffer.drain(..boundary + 2).collect();
                        for frame in sse_frames(&block) {
                            self.pending.push_back(frame);
                        }
                    }
                }
                Some(Err(_)) | None => {
                    let rest = std::mem::take(&mut self.buffer);
                    for frame in sse_frames(&rest) {
                        self.pending.push_back(frame);
                    }
                    return self.pending.pop_front();
                }
            }
        }
    }

    /// Next frame, panicking after `timeout`.
    pub async fn expect_frame(&mut self, timeout: Duration) -> Value {
        tokio::time::timeout(timeout, self.next_frame())
            .await
            .expect("timed out waiting for SSE frame")
            .expect("stream closed before frame")
    }

    /// Assert the stream closes without further frames.
    pub async fn expect_closed(&mut self, timeout: Duration) {
        let frame = tokio::time::timeout(timeout, self.next_frame())
            .await
            .expect("timed out waiting for stream close");
        assert!(frame.is_none(), "unexpected extra frame: {:?}", frame);
    }
}
