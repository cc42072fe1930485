//! Request dispatcher — routes JSON-RPC methods to the task engine and the
//! knowledge store, enforcing the agent card's capability gates.
//!
//! | Method | Capability gate | Response |
//! |---|---|---|
//! | `tasks/send` | — | single (final Task) |
//! | `tasks/sendSubscribe` | `streaming` | SSE stream |
//! | `tasks/get` | — | single (Task) |
//! | `tasks/cancel` | — | single (Task) |
//! | `tasks/resubscribe` | `streaming` | SSE stream |
//! | `tasks/pushNotification/set` | `pushNotifications` | single (echoed config) |
//! | `tasks/pushNotification/get` | `pushNotifications` | single (config or null) |
//! | `knowledge/query` | `knowledgeGraph` + declared language | single (QueryResult) |
//! | `knowledge/update` | `knowledgeGraph` | single (UpdateResult) |
//! | `knowledge/subscribe` | `knowledgeGraph` + `streaming` | SSE stream |
//!
//! A method gated out by a missing capability is indistinguishable from an
//! unknown method: `MethodNotFound` (-32601). A capability that is declared
//! but has no backing store surfaces as `UnsupportedOperation` (-32004).

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::knowledge::KnowledgeStore;
use crate::types::{
    AgentCard, KnowledgeQueryParams, KnowledgeSubscribeParams, KnowledgeUpdateParams,
    TaskIdParams, TaskPushNotificationConfig, TaskQueryParams, TaskSendParams,
};

use super::subscription_hub::{KnowledgeStreamFrame, TaskStreamFrame};
use super::task_engine::TaskEngine;

/// The result of dispatching one JSON-RPC request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A single JSON-RPC response body.
    Single(Value),
    /// A task event stream to be written as SSE frames.
    TaskStream(mpsc::Receiver<TaskStreamFrame>),
    /// A knowledge change stream to be written as SSE frames.
    KnowledgeStream(mpsc::Receiver<KnowledgeStreamFrame>),
}

/// Routes parsed JSON-RPC requests to their component.
pub struct Dispatcher {
    engine: Arc<TaskEngine>,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
    agent_card: AgentCard,
}

impl Dispatcher {
    /// Create a dispatcher over the engine, an optional knowledge backend,
    /// and the agent card whose capabilities gate the method table.
    pub fn new(
        engine: Arc<TaskEngine>,
        knowledge: Option<Arc<dyn KnowledgeStore>>,
        agent_card: AgentCard,
    ) -> Self {
        Self {
            engine,
            knowledge,
            agent_card,
        }
    }

    /// The agent card served at the well-known path.
    pub fn agent_card(&self) -> &AgentCard {
        &self.agent_card
    }

    /// Dispatch one request to its handler.
    pub async fn dispatch(&self, method: &str, params: Value) -> A2AResult<DispatchOutcome> {
        debug!(method = %method, "Dispatching JSON-RPC request");
        let capabilities = &self.agent_card.capabilities;

        match method {
            "tasks/send" => {
                let params: TaskSendParams = parse_params(params)?;
                self.check_output_modes(&params)?;
                single(&self.engine.send(params).await?)
            }
            "tasks/sendSubscribe" => {
                self.require(capabilities.streaming, method)?;
                let params: TaskSendParams = parse_params(params)?;
                self.check_output_modes(&params)?;
                Ok(DispatchOutcome::TaskStream(
                    self.engine.send_subscribe(params).await?,
                ))
            }
            "tasks/get" => {
                let params: TaskQueryParams = parse_params(params)?;
                single(&self.engine.get(params).await?)
            }
            "tasks/cancel" => {
                let params: TaskIdParams = parse_params(params)?;
                single(&self.engine.cancel(params).await?)
            }
            "tasks/resubscribe" => {
                self.require(capabilities.streaming, method)?;
                let params: TaskIdParams = parse_params(params)?;
                Ok(DispatchOutcome::TaskStream(
                    self.engine.resubscribe(params).await?,
                ))
            }
            "tasks/pushNotification/set" => {
                self.require(capabilities.push_notifications, method)?;
                let params: TaskPushNotificationConfig = parse_params(params)?;
                single(&self.engine.set_push_config(params).await?)
            }
            "tasks/pushNotification/get" => {
                self.require(capabilities.push_notifications, method)?;
                let params: TaskIdParams = parse_params(params)?;
                match self.engine.push_config(params).await? {
                    Some(config) => single(&config),
                    None => Ok(DispatchOutcome::Single(Value::Null)),
                }
            }
            "knowledge/query" => {
                self.require(capabilities.knowledge_graph, method)?;
                let params: KnowledgeQueryParams = parse_params(params)?;
                self.require(
                    capabilities
                        .knowledge_graph_query_languages
                        .iter()
                        .any(|l| l == &params.query_language),
                    method,
                )?;
                let store = self.knowledge_store()?;
                single(&store.query(params).await?)
            }
            "knowledge/update" => {
                self.require(capabilities.knowledge_graph, method)?;
                let params: KnowledgeUpdateParams = parse_params(params)?;
                let store = self.knowledge_store()?;
                single(&store.update(params).await?)
            }
            "knowledge/subscribe" => {
                self.require(
                    capabilities.knowledge_graph && capabilities.streaming,
                    method,
                )?;
                let params: KnowledgeSubscribeParams = parse_params(params)?;
                let store = self.knowledge_store()?;
                Ok(DispatchOutcome::KnowledgeStream(
                    store.subscribe(params).await?,
                ))
            }
            other => {
                warn!(method = %other, "Unknown JSON-RPC method");
                Err(method_not_found(other))
            }
        }
    }

    /// Reject sends whose accepted output modes share nothing with the
    /// modes this agent produces. An empty/absent list on either side is
    /// compatible.
    fn check_output_modes(&self, params: &TaskSendParams) -> A2AResult<()> {
        let Some(ref accepted) = params.accepted_output_modes else {
            return Ok(());
        };
        let produced = &self.agent_card.default_output_modes;
        if accepted.is_empty() || produced.is_empty() {
            return Ok(());
        }
        if accepted.iter().any(|mode| produced.contains(mode)) {
            return Ok(());
        }
        Err(A2AError::content_type_not_supported(format!(
            "accepted output modes {:?} do not overlap the agent's {:?}",
            accepted, produced
        )))
    }

    fn require(&self, enabled: bool, method: &str) -> A2AResult<()> {
        if enabled {
            Ok(())
        } else {
            warn!(method = %method, "Method gated out by agent capabilities");
            Err(method_not_found(method))
        }
    }

    fn knowledge_store(&self) -> A2AResult<&Arc<dyn KnowledgeStore>> {
        self.knowledge.as_ref().ok_or_else(|| {
            A2AError::unsupported_operation("no knowledge graph backend is configured")
        })
    }
}

fn method_not_found(method: &str) -> A2AError {
    A2AError::method_not_found(method.to_string())
        .with_data(serde_json::json!({ "method": method }))
}

fn parse_params<T: DeserializeOwned>(params: Value) -> A2AResult<T> {
    serde_json::from_value(params).map_err(|e| A2AError::invalid_params(e.to_string()))
}

fn single<T: serde::Serialize>(value: &T) -> A2AResult<DispatchOutcome> {
    let value = serde_json::to_value(value)
        .map_err(|e| A2AError::internal_error(format!("failed to serialize response: {}", e)))?;
    Ok(DispatchOutcome::Single(value))
}
