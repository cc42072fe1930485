//! Subscription hub — fans engine and knowledge-store events out to SSE
//! subscribers.
//!
//! Per task id the hub keeps the set of connected subscriber queues; per KG
//! subscription it keeps one queue plus the compiled statement filter. Every
//! event payload is serialized once and shared (`Arc`) across subscribers;
//! the HTTP layer only adds the per-request JSON-RPC envelope.
//!
//! Queues are bounded (default 1024). A task subscriber that falls behind is
//! silently disconnected; a KG subscriber that falls behind receives one
//! `KnowledgeSubscriptionError` frame and is then closed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::A2AError;
use crate::knowledge::query::StatementFilter;
use crate::types::{JsonRpcError, KnowledgeGraphChangeEvent};

/// Default bound for subscriber queues.
pub const DEFAULT_QUEUE_BOUND: usize = 1024;

/// A pre-serialized event payload, shared across subscribers.
pub type EventPayload = Arc<serde_json::Value>;

/// One frame of a task SSE stream.
#[derive(Debug, Clone)]
pub enum TaskStreamFrame {
    /// An event payload; `is_final` ends the stream after this frame.
    Event {
        /// The serialized event.
        payload: EventPayload,
        /// Whether this is the stream's terminal frame.
        is_final: bool,
    },
    /// A JSON-RPC error; the stream closes after this frame.
    Error(JsonRpcError),
}

/// One frame of a knowledge SSE stream.
#[derive(Debug, Clone)]
pub enum KnowledgeStreamFrame {
    /// A serialized change event.
    Event(EventPayload),
    /// A JSON-RPC error; the stream closes after this frame.
    Error(JsonRpcError),
}

struct KnowledgeSubscriber {
    filter: StatementFilter,
    tx: mpsc::Sender<KnowledgeStreamFrame>,
}

/// Tracks active SSE subscribers and delivers events to them.
pub struct SubscriptionHub {
    queue_bound: usize,
    tasks: Mutex<HashMap<String, Vec<mpsc::Sender<TaskStreamFrame>>>>,
    knowledge: Mutex<HashMap<String, KnowledgeSubscriber>>,
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_BOUND)
    }
}

impl SubscriptionHub {
    /// Create a hub with the given subscriber queue bound.
    pub fn new(queue_bound: usize) -> Self {
        assert!(queue_bound > 0, "queue bound must be greater than 0");
        Self {
            queue_bound,
            tasks: Mutex::new(HashMap::new()),
            knowledge: Mutex::new(HashMap::new()),
        }
    }

    // ---- Task streams ----

    /// Register a new subscriber for a task, creating the task's subscriber
    /// list if this is the first.
    pub async fn register_task(&self, task_id: &str) -> mpsc::Receiver<TaskStreamFrame> {
        let (tx, rx) = mpsc::channel(self.queue_bound);
        let mut tasks = self.tasks.lock().await;
        let subscribers = tasks.entry(task_id.to_string()).or_default();
        subscribers.push(tx);
        debug!(
            task_id = %task_id,
            subscribers = subscribers.len(),
            "Task subscriber registered"
        );
        rx
    }

    /// Attach an additional subscriber to a task's existing stream.
    ///
    /// Returns `None` when the task has no active stream to attach to.
    pub async fn attach_task(&self, task_id: &str) -> Option<mpsc::Receiver<TaskStreamFrame>> {
        let mut tasks = self.tasks.lock().await;
        let subscribers = tasks.get_mut(task_id)?;
        let (tx, rx) = mpsc::channel(self.queue_bound);
        subscribers.push(tx);
        debug!(
            task_id = %task_id,
            subscribers = subscribers.len(),
            "Task subscriber re-attached"
        );
        Some(rx)
    }

    /// Deliver an event payload to every subscriber of a task.
    ///
    /// Subscribers whose queue is full or closed are dropped. When the event
    /// is final, all subscribers are closed and deregistered.
    pub async fn publish_task(&self, task_id: &str, payload: EventPayload, is_final: bool) {
        let mut tasks = self.tasks.lock().await;
        let Some(subscribers) = tasks.get_mut(task_id) else {
            return;
        };

        subscribers.retain(|tx| {
            match tx.try_send(TaskStreamFrame::Event {
                payload: Arc::clone(&payload),
                is_final,
            }) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(task_id = %task_id, "Task subscriber overflowed — disconnecting");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });

        if is_final {
            tasks.remove(task_id);
            debug!(task_id = %task_id, "Terminal event delivered — task stream closed");
        }
    }

    /// Deliver an error frame to every subscriber of a task, then close the
    /// stream.
    pub async fn publish_task_error(&self, task_id: &str, error: JsonRpcError) {
        let mut tasks = self.tasks.lock().await;
        if let Some(subscribers) = tasks.remove(task_id) {
            for tx in subscribers {
                let _ = tx.try_send(TaskStreamFrame::Error(error.clone()));
            }
        }
    }

    /// Number of live subscribers for a task.
    pub async fn task_subscriber_count(&self, task_id: &str) -> usize {
        let tasks = self.tasks.lock().await;
        tasks.get(task_id).map(Vec::len).unwrap_or(0)
    }

    // ---- Knowledge streams ----

    /// Register a KG subscription with its compiled filter.
    ///
    /// Returns the subscription id and the frame receiver.
    pub async fn register_knowledge(
        &self,
        filter: StatementFilter,
    ) -> (String, mpsc::Receiver<KnowledgeStreamFrame>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.queue_bound);
        let mut knowledge = self.knowledge.lock().await;
        knowledge.insert(id.clone(), KnowledgeSubscriber { filter, tx });
        debug!(subscription_id = %id, active = knowledge.len(), "Knowledge subscription registered");
        (id, rx)
    }

    /// Remove a KG subscription.
    pub async fn unregister_knowledge(&self, subscription_id: &str) {
        let mut knowledge = self.knowledge.lock().await;
        knowledge.remove(subscription_id);
    }

    /// Match a committed change against every active subscription and
    /// enqueue it to those that match.
    ///
    /// A subscriber whose queue is full is deregistered; one
    /// `KnowledgeSubscriptionError` frame is delivered once its queue
    /// drains, after which its stream closes.
    pub async fn publish_knowledge(&self, event: &KnowledgeGraphChangeEvent) {
        let payload: EventPayload = match serde_json::to_value(event) {
            Ok(value) => Arc::new(value),
            Err(e) => {
                warn!(error = %e, "Failed to serialize knowledge change event");
                return;
            }
        };

        let mut knowledge = self.knowledge.lock().await;
        let mut overflowed = Vec::new();

        knowledge.retain(|id, subscriber| {
            if !subscriber.filter.matches(&event.statement) {
                return true;
            }
            match subscriber
                .tx
                .try_send(KnowledgeStreamFrame::Event(Arc::clone(&payload)))
            {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscription_id = %id, "Knowledge subscriber overflowed");
                    overflowed.push(subscriber.tx.clone());
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        drop(knowledge);

        for tx in overflowed {
            let error: JsonRpcError = A2AError::knowledge_subscription_error(
                "subscriber fell behind the change stream",
            )
            .into();
            // The queue is full; wait for the consumer to drain a slot so the
            // error frame is the last thing it sees.
            tokio::spawn(async move {
                let _ = tx.send(KnowledgeStreamFrame::Error(error)).await;
            });
        }
    }

    /// Number of active KG subscriptions.
    pub async fn knowledge_subscription_count(&self) -> usize {
        let knowledge = self.knowledge.lock().await;
        knowledge.len()
    }
}
