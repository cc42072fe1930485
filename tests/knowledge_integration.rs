//! Knowledge Graph end-to-end tests: update + subscription matching, query
//! execution with filters, alignment rejection, and capability gating.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{jsonrpc, rpc, start_server, start_server_with, EchoHandler, SseReader};
use serde_json::json;

use a2a_mesh::builders::ServerBuilder;
use a2a_mesh::knowledge::{InMemoryKnowledgeStore, Verdict, VerificationPolicy};
use a2a_mesh::types::{KnowledgeGraphPatch, KnowledgeUpdateParams};

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

fn add_patch(subject: &str, predicate: &str, object_id: &str) -> serde_json::Value {
    json!({
        "op": "add",
        "statement": {
            "subject": {"id": subject},
            "predicate": {"id": predicate},
            "object": {"id": object_id}
        }
    })
}

#[tokio::test]
async fn update_with_matching_subscription() {
    let base_url = start_server(Arc::new(EchoHandler)).await;

    // Subscribe to statements about the reviewedBy predicate.
    let subscribe = jsonrpc(
        json!("sub-1"),
        "knowledge/subscribe",
        json!({
            "subscriptionQuery":
                "subscription { statementChanged(predicate: \"ex:reviewedBy\") { changeId } }"
        }),
    );
    let mut reader = SseReader::open(&base_url, &subscribe).await;

    // Post an add patch that matches the subscription.
    let update = jsonrpc(
        json!(2),
        "knowledge/update",
        json!({
            "mutations": [add_patch("project-alpha", "ex:reviewedBy", "agent-7")],
            "sourceAgentId": "agent-7",
            "justification": "review completed"
        }),
    );
    let (status, response) = rpc(&base_url, &update).await;
    assert_eq!(status, 200);

    let result = &response["result"];
    assert_eq!(result["success"], true);
    assert_eq!(result["statementsAffected"], 1);
    assert_eq!(result["verificationStatus"], "Verified");
    assert!(result["affectedIds"]
        .as_array()
        .unwrap()
        .contains(&json!("project-alpha")));

    // The subscriber receives exactly one change event.
    let frame = reader.expect_frame(FRAME_TIMEOUT).await;
    assert_eq!(frame["id"], json!("sub-1"));
    let change = &frame["result"];
    assert_eq!(change["op"], "add");
    assert!(change["changeId"].is_string());
    assert!(change["timestamp"].is_string());
    assert_eq!(change["statement"]["subject"]["id"], "project-alpha");
    assert_eq!(change["statement"]["predicate"]["id"], "ex:reviewedBy");
    assert_eq!(change["changeMetadata"]["sourceAgentId"], "agent-7");
}

#[tokio::test]
async fn non_matching_changes_are_not_delivered() {
    let base_url = start_server(Arc::new(EchoHandler)).await;

    let subscribe = jsonrpc(
        json!(1),
        "knowledge/subscribe",
        json!({
            "subscriptionQuery":
                "subscription { statementChanged(predicate: \"ex:reviewedBy\") { changeId } }"
        }),
    );
    let mut reader = SseReader::open(&base_url, &subscribe).await;

    // A change on a different predicate does not reach the subscriber.
    rpc(
        &base_url,
        &jsonrpc(
            json!(2),
            "knowledge/update",
            json!({"mutations": [add_patch("p1", "ex:unrelated", "o1")]}),
        ),
    )
    .await;
    // A matching one does.
    rpc(
        &base_url,
        &jsonrpc(
            json!(3),
            "knowledge/update",
            json!({"mutations": [add_patch("p2", "ex:reviewedBy", "o2")]}),
        ),
    )
    .await;

    let frame = reader.expect_frame(FRAME_TIMEOUT).await;
    assert_eq!(frame["result"]["statement"]["subject"]["id"], "p2");
}

#[tokio::test]
async fn query_returns_matching_statements() {
    let base_url = start_server(Arc::new(EchoHandler)).await;

    rpc(
        &base_url,
        &jsonrpc(
            json!(1),
            "knowledge/update",
            json!({"mutations": [
                add_patch("project-alpha", "ex:reviewedBy", "agent-7"),
                add_patch("project-alpha", "ex:ownedBy", "team-1"),
                add_patch("project-beta", "ex:reviewedBy", "agent-9")
            ]}),
        ),
    )
    .await;

    let (status, response) = rpc(
        &base_url,
        &jsonrpc(
            json!(2),
            "knowledge/query",
            json!({
                "query": "query($s: String!) { statements(subject: $s) { subject predicate object } }",
                "variables": {"s": "project-alpha"}
            }),
        ),
    )
    .await;
    assert_eq!(status, 200);

    let statements = response["result"]["data"]["statements"].as_array().unwrap();
    assert_eq!(statements.len(), 2);
    assert!(statements
        .iter()
        .all(|s| s["subject"]["id"] == "project-alpha"));
    assert_eq!(response["result"]["queryMetadata"]["statementCount"], 2);
}

#[tokio::test]
async fn remove_and_replace_maintain_set_semantics() {
    let base_url = start_server(Arc::new(EchoHandler)).await;

    // Duplicate adds keep a single statement.
    rpc(
        &base_url,
        &jsonrpc(
            json!(1),
            "knowledge/update",
            json!({"mutations": [
                add_patch("s", "ex:p", "o"),
                add_patch("s", "ex:p", "o")
            ]}),
        ),
    )
    .await;

    let (_, response) = rpc(
        &base_url,
        &jsonrpc(
            json!(2),
            "knowledge/query",
            json!({"query": "{ statements(subject: \"s\") { subject } }"}),
        ),
    )
    .await;
    assert_eq!(
        response["result"]["data"]["statements"].as_array().unwrap().len(),
        1
    );

    // Replace swaps the object for the subject+predicate pair.
    rpc(
        &base_url,
        &jsonrpc(
            json!(3),
            "knowledge/update",
            json!({"mutations": [{
                "op": "replace",
                "statement": {
                    "subject": {"id": "s"},
                    "predicate": {"id": "ex:p"},
                    "object": {"value": "replacement"}
                }
            }]}),
        ),
    )
    .await;

    let (_, response) = rpc(
        &base_url,
        &jsonrpc(
            json!(4),
            "knowledge/query",
            json!({"query": "{ statements(subject: \"s\") { subject } }"}),
        ),
    )
    .await;
    let statements = response["result"]["data"]["statements"].as_array().unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0]["object"]["value"], "replacement");

    // Remove empties it.
    rpc(
        &base_url,
        &jsonrpc(
            json!(5),
            "knowledge/update",
            json!({"mutations": [{
                "op": "remove",
                "statement": {
                    "subject": {"id": "s"},
                    "predicate": {"id": "ex:p"},
                    "object": {"value": "replacement"}
                }
            }]}),
        ),
    )
    .await;

    let (_, response) = rpc(
        &base_url,
        &jsonrpc(
            json!(6),
            "knowledge/query",
            json!({"query": "{ statements(subject: \"s\") { subject } }"}),
        ),
    )
    .await;
    assert!(response["result"]["data"]["statements"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_query_is_knowledge_query_error() {
    let base_url = start_server(Arc::new(EchoHandler)).await;
    let (status, response) = rpc(
        &base_url,
        &jsonrpc(json!(1), "knowledge/query", json!({"query": "{ statements("})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(response["error"]["code"], -32010);
}

#[tokio::test]
async fn kg_object_with_id_and_value_is_invalid_params() {
    let base_url = start_server(Arc::new(EchoHandler)).await;
    let (status, response) = rpc(
        &base_url,
        &jsonrpc(
            json!(1),
            "knowledge/update",
            json!({"mutations": [{
                "op": "add",
                "statement": {
                    "subject": {"id": "s"},
                    "predicate": {"id": "p"},
                    "object": {"id": "o", "value": "both"}
                }
            }]}),
        ),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(response["error"]["code"], -32602);
}

struct RejectEverything;

#[async_trait]
impl VerificationPolicy for RejectEverything {
    async fn verify(
        &self,
        patches: &[KnowledgeGraphPatch],
        _params: &KnowledgeUpdateParams,
    ) -> Vec<Verdict> {
        patches
            .iter()
            .map(|_| Verdict::Rejected("policy forbids writes".into()))
            .collect()
    }
}

#[tokio::test]
async fn rejected_batch_surfaces_alignment_violation() {
    // A server whose knowledge store rejects every patch.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let builder = ServerBuilder::new(Arc::new(EchoHandler));
    let hub = builder.hub();
    let app = builder
        .with_agent_card(common::full_card(&format!("{}/", base_url)))
        .with_knowledge_store(Arc::new(InMemoryKnowledgeStore::with_policy(
            hub,
            Arc::new(RejectEverything),
        )))
        .build()
        .unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let (status, response) = rpc(
        &base_url,
        &jsonrpc(
            json!(1),
            "knowledge/update",
            json!({"mutations": [add_patch("s", "ex:p", "o")]}),
        ),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(response["error"]["code"], -32013);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("policy forbids writes"));
}

#[tokio::test]
async fn knowledge_methods_gated_without_capability() {
    let mut card = common::full_card("http://localhost/");
    card.capabilities.knowledge_graph = false;
    card.capabilities.knowledge_graph_query_languages.clear();
    let base_url = start_server_with(Arc::new(EchoHandler), Some(card)).await;

    for method in ["knowledge/query", "knowledge/update", "knowledge/subscribe"] {
        let params = match method {
            "knowledge/query" => json!({"query": "{ statements }"}),
            "knowledge/update" => json!({"mutations": [add_patch("s", "p", "o")]}),
            _ => json!({"subscriptionQuery": "{ statementChanged }"}),
        };
        let (status, response) = rpc(&base_url, &jsonrpc(json!(1), method, params)).await;
        assert_eq!(status, 404, "{} should be gated", method);
        assert_eq!(response["error"]["code"], -32601);
    }
}

#[tokio::test]
async fn undeclared_query_language_is_gated() {
    let base_url = start_server(Arc::new(EchoHandler)).await;
    let (status, response) = rpc(
        &base_url,
        &jsonrpc(
            json!(1),
            "knowledge/query",
            json!({"query": "{ statements }", "queryLanguage": "sparql"}),
        ),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(response["error"]["code"], -32601);
}
