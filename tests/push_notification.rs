//! Webhook push notification tests: delivery of task update payloads to a
//! registered endpoint with the configured authorization header.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use common::{jsonrpc, rpc, send_params, start_server, EchoHandler};
use serde_json::{json, Value};
use tokio::sync::Mutex;

type Received = Arc<Mutex<Vec<(Option<String>, Value)>>>;

/// Start a webhook receiver capturing (authorization header, body) pairs.
async fn start_webhook_receiver() -> (String, Received) {
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    async fn capture(
        State(received): State<Received>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> &'static str {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        received.lock().await.push((authorization, body));
        "ok"
    }

    let app = Router::new()
        .route("/hook", post(capture))
        .with_state(Arc::clone(&received));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (url, received)
}

/// Poll until at least `count` notifications arrive or the deadline passes.
async fn wait_for_notifications(received: &Received, count: usize) -> Vec<(Option<String>, Value)> {
    for _ in 0..100 {
        {
            let seen = received.lock().await;
            if seen.len() >= count {
                return seen.clone();
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    received.lock().await.clone()
}

#[tokio::test]
async fn task_updates_are_posted_to_webhook() {
    let (hook_url, received) = start_webhook_receiver().await;
    let base_url = start_server(Arc::new(EchoHandler)).await;

    // Register the webhook with the send itself.
    let mut params = send_params("T1", "notify me");
    params["pushNotification"] = json!({"url": hook_url, "token": "hook-token"});
    let (status, response) = rpc(&base_url, &jsonrpc(json!(1), "tasks/send", params)).await;
    assert_eq!(status, 200);
    assert_eq!(response["result"]["status"]["state"], "completed");

    // The echo run produces two status events: working and completed.
    let notifications = wait_for_notifications(&received, 2).await;
    assert!(
        notifications.len() >= 2,
        "expected ≥ 2 notifications, got {}",
        notifications.len()
    );

    // Payloads are bare event objects (no JSON-RPC envelope), with the
    // bearer token attached.
    let states: Vec<&str> = notifications
        .iter()
        .map(|(_, body)| body["status"]["state"].as_str().unwrap())
        .collect();
    assert!(states.contains(&"working"));
    assert!(states.contains(&"completed"));

    for (authorization, body) in &notifications {
        assert_eq!(authorization.as_deref(), Some("Bearer hook-token"));
        assert_eq!(body["id"], "T1");
        assert!(body.get("jsonrpc").is_none());
    }

    // The terminal event is flagged final.
    let completed = notifications
        .iter()
        .find(|(_, body)| body["status"]["state"] == "completed")
        .unwrap();
    assert_eq!(completed.1["final"], true);
}

#[tokio::test]
async fn artifact_updates_are_delivered_too() {
    let (hook_url, received) = start_webhook_receiver().await;
    let base_url = start_server(Arc::new(common::StreamingArtifactHandler)).await;

    let mut params = send_params("T2", "stream");
    params["pushNotification"] = json!({"url": hook_url});
    rpc(&base_url, &jsonrpc(json!(1), "tasks/send", params)).await;

    // working + two artifact chunks + completed.
    let notifications = wait_for_notifications(&received, 4).await;
    assert!(notifications.len() >= 4);

    let artifact_bodies: Vec<&Value> = notifications
        .iter()
        .map(|(_, body)| body)
        .filter(|body| body.get("artifact").is_some())
        .collect();
    assert_eq!(artifact_bodies.len(), 2);
    // Delivery order across retries is not guaranteed, but one of the two
    // chunks is the merged two-part snapshot.
    assert!(artifact_bodies
        .iter()
        .any(|body| body["artifact"]["parts"].as_array().unwrap().len() == 2));

    // No Authorization header without token or schemes.
    assert!(notifications.iter().all(|(auth, _)| auth.is_none()));
}

#[tokio::test]
async fn delivery_failure_never_blocks_the_task() {
    let base_url = start_server(Arc::new(EchoHandler)).await;

    // A webhook URL nothing listens on.
    let mut params = send_params("T3", "hello");
    params["pushNotification"] = json!({"url": "http://127.0.0.1:1/hook"});

    let started = std::time::Instant::now();
    let (status, response) = rpc(&base_url, &jsonrpc(json!(1), "tasks/send", params)).await;
    assert_eq!(status, 200);
    assert_eq!(response["result"]["status"]["state"], "completed");
    // The response does not wait out webhook retries/backoff.
    assert!(started.elapsed() < Duration::from_secs(5));
}
