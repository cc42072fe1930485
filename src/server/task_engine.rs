//! Task engine — drives a task through its state machine by consuming a
//! handler's yield sequence.
//!
//! For every yield the engine updates the in-memory task, persists it, and
//! only then emits the event to subscribers and the push notifier, so a
//! subscriber never observes state that is not on disk. Cancellation is
//! checked before consuming each yield; a pending cancellation forces the
//! `canceled` transition and stops consumption.
//!
//! Incoming user messages follow the re-open rules: a terminal task resets
//! to `submitted`, an `input-required` task transitions to `working`, and a
//! `submitted`/`working` task only grows its history.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    Artifact, Message, Task, TaskArtifactUpdateEvent, TaskEvent, TaskIdParams,
    TaskPushNotificationConfig, TaskQueryParams, TaskSendParams, TaskState, TaskStatus,
    TaskStatusUpdateEvent,
};
use crate::utils::{apply_history_length, validate_message};

use super::cancellation::CancellationRegistry;
use super::handler::{Handler, HandlerContext, StatusUpdate, UpdateSink, YieldUpdate};
use super::push_notifier::PushNotifier;
use super::subscription_hub::{SubscriptionHub, TaskStreamFrame};
use super::task_store::TaskStore;

/// Capacity of the per-run handler yield queue. Small by design: the
/// handler stays lazy and suspends until the engine has consumed prior
/// output.
const YIELD_QUEUE_CAPACITY: usize = 16;

/// Drives task runs and owns the task-side wiring: store, fan-out hub,
/// push notifier, and cancellation registry.
pub struct TaskEngine {
    handler: Arc<dyn Handler>,
    store: Arc<dyn TaskStore>,
    hub: Arc<SubscriptionHub>,
    push: Arc<PushNotifier>,
    cancellations: Arc<CancellationRegistry>,
    /// Per-task locks ordering concurrent sends by arrival.
    send_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TaskEngine {
    /// Create an engine over the given handler and infrastructure.
    pub fn new(
        handler: Arc<dyn Handler>,
        store: Arc<dyn TaskStore>,
        hub: Arc<SubscriptionHub>,
        push: Arc<PushNotifier>,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            handler,
            store,
            hub,
            push,
            cancellations,
            send_locks: Mutex::new(HashMap::new()),
        }
    }

    /// The cancellation registry shared with handlers.
    pub fn cancellations(&self) -> Arc<CancellationRegistry> {
        Arc::clone(&self.cancellations)
    }

    /// The subscription hub events fan out through.
    pub fn hub(&self) -> Arc<SubscriptionHub> {
        Arc::clone(&self.hub)
    }

    async fn send_lock(&self, task_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.send_locks.lock().await;
        Arc::clone(locks.entry(task_id.to_string()).or_default())
    }

    // ------------------------------------------------------------------
    // JSON-RPC method entry points
    // ------------------------------------------------------------------

    /// `tasks/send` — run the handler to completion and return the task.
    pub async fn send(self: &Arc<Self>, params: TaskSendParams) -> A2AResult<Task> {
        validate_message(&params.message)?;
        let lock = self.send_lock(&params.id).await;
        let _guard = lock.lock().await;

        let task = self.prepare_run(&params).await?;
        let mut task = self
            .run_handler(task, params.message.clone(), &params)
            .await?;

        apply_history_length(&mut task, params.history_length);
        Ok(task)
    }

    /// `tasks/sendSubscribe` — start the handler and return the SSE frame
    /// stream for the originating client.
    pub async fn send_subscribe(
        self: &Arc<Self>,
        params: TaskSendParams,
    ) -> A2AResult<mpsc::Receiver<TaskStreamFrame>> {
        validate_message(&params.message)?;
        let lock = self.send_lock(&params.id).await;
        let guard = lock.lock_owned().await;

        let task = self.prepare_run(&params).await?;
        let rx = self.hub.register_task(&task.id).await;

        let engine = Arc::clone(self);
        let message = params.message.clone();
        tokio::spawn(async move {
            let task_id = task.id.clone();
            if let Err(e) = engine.run_handler(task, message, &params).await {
                warn!(task_id = %task_id, error = %e, "Streaming task run failed");
            }
            drop(guard);
        });

        Ok(rx)
    }

    /// `tasks/get` — snapshot read with history truncation.
    pub async fn get(&self, params: TaskQueryParams) -> A2AResult<Task> {
        let mut task = self
            .store
            .load(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;
        apply_history_length(&mut task, params.history_length);
        Ok(task)
    }

    /// `tasks/cancel` — idempotent cancellation.
    ///
    /// The task id is inserted into the cancellation registry before the
    /// canceled state is persisted; an in-flight run observes it at its next
    /// yield boundary and stops consuming.
    pub async fn cancel(&self, params: TaskIdParams) -> A2AResult<Task> {
        self.cancellations.add(&params.id);

        let task = match self.store.load(&params.id).await? {
            Some(task) => task,
            None => {
                self.cancellations.remove(&params.id);
                return Err(A2AError::task_not_found(params.id.clone()));
            }
        };

        match task.status.state {
            // Idempotent: the entry stays in the registry so a handler that
            // is still winding down keeps observing the cancellation.
            TaskState::Canceled => Ok(task),
            TaskState::Completed | TaskState::Failed => {
                self.cancellations.remove(&params.id);
                Err(A2AError::task_not_cancelable(format!(
                    "task {} is in terminal state {}",
                    params.id, task.status.state
                ))
                .with_data(serde_json::json!({ "currentState": task.status.state.to_string() })))
            }
            _ => {
                let mut task = task;
                self.transition(&mut task, TaskState::Canceled, None).await?;
                info!(task_id = %task.id, "Task canceled");
                Ok(task)
            }
        }
    }

    /// `tasks/resubscribe` — attach to a task's active stream, or receive
    /// the single final frame when the task is already terminal.
    pub async fn resubscribe(
        &self,
        params: TaskIdParams,
    ) -> A2AResult<mpsc::Receiver<TaskStreamFrame>> {
        let task = self
            .store
            .load(&params.id)
            .await?
            .ok_or_else(|| A2AError::task_not_found(params.id.clone()))?;

        if task.status.state.is_terminal() {
            let event = TaskEvent::Status(TaskStatusUpdateEvent {
                id: task.id.clone(),
                status: task.status.clone(),
                r#final: true,
                metadata: None,
            });
            let payload = Arc::new(serde_json::to_value(&event).map_err(|e| {
                A2AError::internal_error(format!("failed to serialize event: {}", e))
            })?);
            let (tx, rx) = mpsc::channel(1);
            let _ = tx
                .send(TaskStreamFrame::Event {
                    payload,
                    is_final: true,
                })
                .await;
            return Ok(rx);
        }

        self.hub.attach_task(&params.id).await.ok_or_else(|| {
            A2AError::internal_error(format!("task {} has no active stream", params.id))
        })
    }

    /// `tasks/pushNotification/set` — register a webhook for a task.
    pub async fn set_push_config(
        &self,
        params: TaskPushNotificationConfig,
    ) -> A2AResult<TaskPushNotificationConfig> {
        if self.store.load(&params.id).await?.is_none() {
            return Err(A2AError::task_not_found(params.id.clone()));
        }
        self.store
            .set_push_config(&params.id, params.push_notification_config.clone())
            .await?;
        Ok(params)
    }

    /// `tasks/pushNotification/get` — the registered webhook, if any.
    pub async fn push_config(
        &self,
        params: TaskIdParams,
    ) -> A2AResult<Option<TaskPushNotificationConfig>> {
        if self.store.load(&params.id).await?.is_none() {
            return Err(A2AError::task_not_found(params.id.clone()));
        }
        Ok(self
            .store
            .push_config(&params.id)
            .await?
            .map(|config| TaskPushNotificationConfig {
                id: params.id,
                push_notification_config: config,
            }))
    }

    // ------------------------------------------------------------------
    // Run mechanics
    // ------------------------------------------------------------------

    /// Apply the incoming-user-message rules, persist the task, and register
    /// a push config supplied with the send.
    async fn prepare_run(&self, params: &TaskSendParams) -> A2AResult<Task> {
        let task = self.upsert_task(params).await?;
        if let Some(ref config) = params.push_notification {
            self.store.set_push_config(&task.id, config.clone()).await?;
        }
        Ok(task)
    }

    async fn upsert_task(&self, params: &TaskSendParams) -> A2AResult<Task> {
        let mut task = match self.store.load(&params.id).await? {
            None => {
                debug!(task_id = %params.id, "Creating new task");
                Task {
                    id: params.id.clone(),
                    session_id: Some(
                        params
                            .session_id
                            .clone()
                            .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
                    ),
                    status: TaskStatus {
                        state: TaskState::Submitted,
                        message: None,
                        timestamp: Some(Utc::now().to_rfc3339()),
                    },
                    artifacts: None,
                    history: Some(vec![params.message.clone()]),
                    metadata: params.metadata.clone(),
                }
            }
            Some(mut task) => {
                let state = task.status.state;
                if state.is_terminal() {
                    // A new user message re-opens the task.
                    debug!(task_id = %task.id, from = %state, "Re-opening terminal task");
                    self.cancellations.remove(&task.id);
                    task.status = TaskStatus {
                        state: TaskState::Submitted,
                        message: None,
                        timestamp: Some(next_timestamp(task.status.timestamp.as_deref())),
                    };
                } else if state == TaskState::InputRequired {
                    debug!(task_id = %task.id, "Resuming task from input-required");
                    task.status = TaskStatus {
                        state: TaskState::Working,
                        message: None,
                        timestamp: Some(next_timestamp(task.status.timestamp.as_deref())),
                    };
                }
                // submitted / working / unknown: history only, no transition.

                task.history
                    .get_or_insert_with(Vec::new)
                    .push(params.message.clone());

                if let Some(ref incoming) = params.metadata {
                    merge_metadata(&mut task.metadata, incoming);
                }
                task
            }
        };

        self.store.save(&task).await?;
        Ok(task)
    }

    /// Consume the handler's yields for one run and return the final task.
    async fn run_handler(
        &self,
        mut task: Task,
        message: Message,
        params: &TaskSendParams,
    ) -> A2AResult<Task> {
        let (tx, mut rx) = mpsc::channel::<YieldUpdate>(YIELD_QUEUE_CAPACITY);
        let ctx = HandlerContext::new(
            task.clone(),
            message,
            params.accepted_output_modes.clone(),
            params.metadata.clone(),
            Arc::clone(&self.cancellations),
        );
        let handler = Arc::clone(&self.handler);
        let sink = UpdateSink::new(tx);
        let mut run = tokio::spawn(async move { handler.run(ctx, sink).await });

        let mut handler_error: Option<String> = None;
        let mut finished_terminal = false;

        loop {
            // Cancellation is checked before consuming each yield. The
            // notified future is armed first so an `add` racing the check
            // still wakes the select below.
            let changed = self.cancellations.changed();
            tokio::pin!(changed);
            changed.as_mut().enable();

            if self.cancellations.contains(&task.id) {
                self.deliver_cancellation(&mut task).await?;
                finished_terminal = true;
                break;
            }

            tokio::select! {
                _ = changed => continue,
                update = rx.recv() => match update {
                    None => {
                        // Handler finished; collect its outcome.
                        match (&mut run).await {
                            Ok(Ok(())) => {}
                            Ok(Err(e)) => handler_error = Some(e.to_string()),
                            Err(join_err) if join_err.is_panic() => {
                                handler_error = Some("handler panicked".to_string());
                            }
                            Err(_) => handler_error = Some("handler was aborted".to_string()),
                        }
                        break;
                    }
                    Some(YieldUpdate::Status(StatusUpdate { state, message })) => {
                        let terminal = state.is_terminal();
                        self.transition(&mut task, state, message).await?;
                        if terminal {
                            finished_terminal = true;
                            break;
                        }
                    }
                    Some(YieldUpdate::Artifact(artifact)) => {
                        self.apply_artifact_yield(&mut task, artifact).await?;
                    }
                },
            }
        }
        drop(rx);

        if let Some(summary) = handler_error {
            warn!(task_id = %task.id, error = %summary, "Handler failed — marking task failed");
            self.transition(&mut task, TaskState::Failed, Some(Message::agent_text(summary)))
                .await?;
        } else if !finished_terminal {
            match task.status.state {
                // A run resting at input-required stays open for the next
                // user message; its stream stays attached.
                TaskState::InputRequired => {}
                _ => {
                    debug!(task_id = %task.id, "Handler finished without terminal state — forcing completed");
                    self.transition(&mut task, TaskState::Completed, None).await?;
                }
            }
        }

        Ok(task)
    }

    /// Force a cancellation observed at a yield boundary.
    ///
    /// The `tasks/cancel` request usually persists and emits the canceled
    /// state itself; in that case the run only stops consuming. When the
    /// registry was marked but the state is not yet canceled, the engine
    /// performs the transition. The registry entry is left in place so the
    /// handler's context keeps reporting the cancellation; it is cleared
    /// when a new user message re-opens the task.
    async fn deliver_cancellation(&self, task: &mut Task) -> A2AResult<()> {
        let persisted = self.store.load(&task.id).await?;
        if let Some(persisted) = persisted {
            *task = persisted;
        }
        if task.status.state != TaskState::Canceled {
            self.transition(task, TaskState::Canceled, None).await?;
        }
        debug!(task_id = %task.id, "Cancellation delivered at yield boundary");
        Ok(())
    }

    /// Apply a status transition: history append, monotonic timestamp,
    /// persist, then emit.
    async fn transition(
        &self,
        task: &mut Task,
        state: TaskState,
        message: Option<Message>,
    ) -> A2AResult<()> {
        if let Some(ref msg) = message {
            // Agent messages carried by a status update enter the history
            // exactly once, at this yield.
            task.history.get_or_insert_with(Vec::new).push(msg.clone());
        }
        task.status = TaskStatus {
            state,
            message,
            timestamp: Some(next_timestamp(task.status.timestamp.as_deref())),
        };

        self.store.save(task).await?;

        let event = TaskEvent::Status(TaskStatusUpdateEvent {
            id: task.id.clone(),
            status: task.status.clone(),
            r#final: state.is_terminal(),
            metadata: None,
        });
        self.emit(&task.id, &event, state.is_terminal()).await
    }

    /// Apply an artifact yield: merge, persist, emit the merged snapshot.
    async fn apply_artifact_yield(&self, task: &mut Task, artifact: Artifact) -> A2AResult<()> {
        let merged = merge_artifact(task.artifacts.get_or_insert_with(Vec::new), &artifact);
        self.store.save(task).await?;

        let event = TaskEvent::Artifact(TaskArtifactUpdateEvent {
            id: task.id.clone(),
            artifact: merged,
            metadata: None,
        });
        self.emit(&task.id, &event, false).await
    }

    /// Serialize an event once, fan it out, and queue push delivery.
    async fn emit(&self, task_id: &str, event: &TaskEvent, is_final: bool) -> A2AResult<()> {
        let payload = Arc::new(
            serde_json::to_value(event)
                .map_err(|e| A2AError::internal_error(format!("failed to serialize event: {}", e)))?,
        );
        self.hub
            .publish_task(task_id, Arc::clone(&payload), is_final)
            .await;
        if let Some(config) = self.store.push_config(task_id).await? {
            self.push.notify(config, payload);
        }
        Ok(())
    }
}

/// A server timestamp that never moves backwards relative to `prev`.
fn next_timestamp(prev: Option<&str>) -> String {
    let now = Utc::now();
    if let Some(prev) = prev.and_then(|p| DateTime::parse_from_rfc3339(p).ok()) {
        let prev = prev.with_timezone(&Utc);
        if now < prev {
            return prev.to_rfc3339();
        }
    }
    now.to_rfc3339()
}

/// Merge incoming request metadata into the task's metadata bag.
fn merge_metadata(existing: &mut Option<serde_json::Value>, incoming: &serde_json::Value) {
    match existing {
        Some(current) => {
            if let (Some(target), Some(source)) = (current.as_object_mut(), incoming.as_object()) {
                for (k, v) in source {
                    target.insert(k.clone(), v.clone());
                }
            }
        }
        None => *existing = Some(incoming.clone()),
    }
}

/// Merge an artifact update into a task's artifact list and return the
/// post-merge snapshot.
///
/// Match by `index` first, else by `name`, else append as new. A matched
/// update with `append = true` extends the existing parts, merges metadata,
/// and overwrites `description` / `lastChunk` when present; otherwise the
/// artifact is replaced wholesale. The list is kept sorted by index when
/// any artifact defines one.
pub fn merge_artifact(artifacts: &mut Vec<Artifact>, update: &Artifact) -> Artifact {
    let position = update
        .index
        .and_then(|i| artifacts.iter().position(|a| a.index == Some(i)))
        .or_else(|| {
            update
                .name
                .as_deref()
                .and_then(|n| artifacts.iter().position(|a| a.name.as_deref() == Some(n)))
        });

    let merged = match position {
        Some(i) if update.append == Some(true) => {
            let existing = &mut artifacts[i];
            existing.parts.extend(update.parts.iter().cloned());
            if let Some(ref incoming) = update.metadata {
                merge_metadata(&mut existing.metadata, incoming);
            }
            if update.description.is_some() {
                existing.description = update.description.clone();
            }
            if update.last_chunk.is_some() {
                existing.last_chunk = update.last_chunk;
            }
            existing.clone()
        }
        Some(i) => {
            artifacts[i] = update.clone();
            artifacts[i].clone()
        }
        None => {
            artifacts.push(update.clone());
            update.clone()
        }
    };

    if artifacts.iter().any(|a| a.index.is_some()) {
        artifacts.sort_by_key(|a| a.index.map(u64::from).unwrap_or(u64::MAX));
    }

    merged
}
