//! HTTP transport — JSON-RPC envelope parsing, SSE framing, and the agent
//! card endpoint.
//!
//! One axum router carries the whole protocol:
//! - `POST <base path>` — JSON-RPC 2.0 dispatch for all A2A methods
//! - `GET /.well-known/agent.json` — agent card discovery
//!
//! The request body is read raw so that malformed JSON maps to `ParseError`
//! (-32700, HTTP 400) while a well-formed body with a bad envelope maps to
//! `InvalidRequest` (-32600, HTTP 400). Streaming methods answer
//! `200 text/event-stream` with one `data: <JSONRPCResponse>` frame per
//! event; errors mid-stream are delivered as a single error frame followed
//! by stream close.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use futures::stream::Stream;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::error::A2AError;
use crate::types::JsonRpcError;

use super::dispatcher::{DispatchOutcome, Dispatcher};
use super::subscription_hub::{KnowledgeStreamFrame, TaskStreamFrame};

/// Build the A2A router with the JSON-RPC endpoint at the root path.
pub fn a2a_router(dispatcher: Arc<Dispatcher>) -> Router {
    a2a_router_at("/", dispatcher)
}

/// Build the A2A router with the JSON-RPC endpoint at a custom base path.
pub fn a2a_router_at(base_path: &str, dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/.well-known/agent.json", get(handle_agent_card))
        .route(base_path, post(handle_jsonrpc))
        .with_state(dispatcher)
}

/// Serve the agent card.
async fn handle_agent_card(State(dispatcher): State<Arc<Dispatcher>>) -> impl IntoResponse {
    Json(dispatcher.agent_card().clone())
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, serde::Serialize)]
struct RpcEnvelope {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl RpcEnvelope {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A single JSON response with the HTTP status the error mapping requires.
fn error_response(id: Value, err: A2AError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::OK);
    let envelope = RpcEnvelope::failure(id, err.into());
    (status, Json(envelope)).into_response()
}

/// Main JSON-RPC entry point.
async fn handle_jsonrpc(State(dispatcher): State<Arc<Dispatcher>>, body: Bytes) -> Response {
    // Raw-body parse so invalid JSON is a -32700, not a transport-level 415.
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return error_response(Value::Null, A2AError::parse_error(e.to_string()));
        }
    };

    let Some(request) = value.as_object() else {
        return error_response(
            Value::Null,
            A2AError::invalid_request("request must be a JSON object"),
        );
    };

    // `id` may be a string, a number, or null. Null ids are treated as
    // notifications but still answered, with id echoed as null.
    let id = request.get("id").cloned().unwrap_or(Value::Null);
    if !(id.is_string() || id.is_number() || id.is_null()) {
        return error_response(
            Value::Null,
            A2AError::invalid_request("'id' must be a string, number, or null"),
        );
    }

    match request.get("jsonrpc").and_then(Value::as_str) {
        Some("2.0") => {}
        _ => {
            return error_response(
                id,
                A2AError::invalid_request("'jsonrpc' must be exactly \"2.0\""),
            );
        }
    }

    let Some(method) = request.get("method").and_then(Value::as_str) else {
        return error_response(id, A2AError::invalid_request("'method' must be a string"));
    };

    let params = request.get("params").cloned().unwrap_or(Value::Null);

    debug!(method = %method, "JSON-RPC request received");

    match dispatcher.dispatch(method, params).await {
        Ok(DispatchOutcome::Single(result)) => {
            Json(RpcEnvelope::success(id, result)).into_response()
        }
        Ok(DispatchOutcome::TaskStream(rx)) => Sse::new(task_sse_stream(id, rx))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Ok(DispatchOutcome::KnowledgeStream(rx)) => Sse::new(knowledge_sse_stream(id, rx))
            .keep_alive(KeepAlive::default())
            .into_response(),
        Err(e) => error_response(id, e),
    }
}

fn envelope_frame(envelope: &RpcEnvelope) -> Option<Event> {
    match serde_json::to_string(envelope) {
        Ok(json) => Some(Event::default().data(json)),
        Err(e) => {
            error!(error = %e, "Failed to serialize SSE frame");
            None
        }
    }
}

/// Task event stream: one frame per engine event, closing after the final
/// status update or an error frame.
fn task_sse_stream(
    id: Value,
    mut rx: mpsc::Receiver<TaskStreamFrame>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            match frame {
                TaskStreamFrame::Event { payload, is_final } => {
                    let envelope = RpcEnvelope::success(id.clone(), payload.as_ref().clone());
                    if let Some(event) = envelope_frame(&envelope) {
                        yield Ok(event);
                    }
                    if is_final {
                        break;
                    }
                }
                TaskStreamFrame::Error(err) => {
                    let envelope = RpcEnvelope::failure(id.clone(), err);
                    if let Some(event) = envelope_frame(&envelope) {
                        yield Ok(event);
                    }
                    break;
                }
            }
        }
    }
}

/// Knowledge change stream: one frame per matching change event.
fn knowledge_sse_stream(
    id: Value,
    mut rx: mpsc::Receiver<KnowledgeStreamFrame>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(frame) = rx.recv().await {
            match frame {
                KnowledgeStreamFrame::Event(payload) => {
                    let envelope = RpcEnvelope::success(id.clone(), payload.as_ref().clone());
                    if let Some(event) = envelope_frame(&envelope) {
                        yield Ok(event);
                    }
                }
                KnowledgeStreamFrame::Error(err) => {
                    let envelope = RpcEnvelope::failure(id.clone(), err);
                    if let Some(event) = envelope_frame(&envelope) {
                        yield Ok(event);
                    }
                    break;
                }
            }
        }
    }
}
