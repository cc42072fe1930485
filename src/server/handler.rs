//! Handler contract — the integration point for agent business logic.
//!
//! A [`Handler`] is a lazy producer of [`YieldUpdate`]s: it pushes status
//! transitions and artifact chunks into an [`UpdateSink`] while the task
//! engine consumes them one at a time, persisting each before any subscriber
//! sees it. The sink is a bounded queue, so a handler that produces faster
//! than the engine consumes suspends at the next push.
//!
//! Handlers observe cancellation cooperatively through
//! [`HandlerContext::is_canceled`] at their own suspension points; the engine
//! additionally forces the `canceled` transition at the next yield boundary.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{A2AError, A2AResult};
use crate::types::{Artifact, Message, Part, Task, TaskState};

use super::cancellation::CancellationRegistry;

/// A status transition produced by a handler.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    /// The state to transition to. The server assigns the timestamp.
    pub state: TaskState,

    /// Optional agent message carried with the transition; appended to the
    /// task history exactly once, at this yield.
    pub message: Option<Message>,
}

/// One unit of handler output.
#[derive(Debug, Clone)]
pub enum YieldUpdate {
    /// A status transition.
    Status(StatusUpdate),
    /// An artifact creation or chunk. Never changes the task state.
    Artifact(Artifact),
}

/// Context handed to a handler for one task run.
#[derive(Clone)]
pub struct HandlerContext {
    /// The task being driven.
    pub task_id: String,

    /// The session the task belongs to.
    pub session_id: String,

    /// The user message that triggered this run.
    pub message: Message,

    /// Snapshot of the task at dispatch time (history included).
    pub task: Task,

    /// MIME types the caller accepts for output parts.
    pub accepted_output_modes: Option<Vec<String>>,

    /// Request metadata.
    pub metadata: Option<serde_json::Value>,

    cancellations: Arc<CancellationRegistry>,
}

impl HandlerContext {
    pub(crate) fn new(
        task: Task,
        message: Message,
        accepted_output_modes: Option<Vec<String>>,
        metadata: Option<serde_json::Value>,
        cancellations: Arc<CancellationRegistry>,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            session_id: task.session_id.clone().unwrap_or_default(),
            message,
            task,
            accepted_output_modes,
            metadata,
            cancellations,
        }
    }

    /// Whether a cancellation is pending for this task. Handlers should
    /// check this at their own suspension points and wind down promptly.
    pub fn is_canceled(&self) -> bool {
        self.cancellations.contains(&self.task_id)
    }

    /// Joined text content of the triggering user message.
    pub fn user_input(&self, delimiter: &str) -> String {
        crate::utils::message_text(&self.message, delimiter)
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("task_id", &self.task_id)
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

/// Bounded queue of handler output, with convenience methods for the common
/// transitions.
///
/// Every push suspends until the engine has capacity. Pushes fail with an
/// internal error once the engine has stopped consuming (terminal state
/// reached or cancellation delivered); handlers should treat that as a
/// signal to return.
#[derive(Clone)]
pub struct UpdateSink {
    tx: mpsc::Sender<YieldUpdate>,
}

impl UpdateSink {
    pub(crate) fn new(tx: mpsc::Sender<YieldUpdate>) -> Self {
        Self { tx }
    }

    /// Push a raw yield update.
    pub async fn push(&self, update: YieldUpdate) -> A2AResult<()> {
        self.tx.send(update).await.map_err(|_| {
            A2AError::internal_error("task engine stopped consuming handler output")
        })
    }

    /// Yield a status transition.
    pub async fn status(&self, state: TaskState, message: Option<Message>) -> A2AResult<()> {
        self.push(YieldUpdate::Status(StatusUpdate { state, message }))
            .await
    }

    /// Transition to `working`, optionally with a progress message.
    pub async fn working(&self, text: Option<&str>) -> A2AResult<()> {
        self.status(TaskState::Working, text.map(Message::agent_text))
            .await
    }

    /// Transition to `input-required` with a prompt for the user.
    pub async fn input_required(&self, text: &str) -> A2AResult<()> {
        self.status(TaskState::InputRequired, Some(Message::agent_text(text)))
            .await
    }

    /// Transition to `completed` with an optional final message.
    pub async fn complete(&self, message: Option<Message>) -> A2AResult<()> {
        self.status(TaskState::Completed, message).await
    }

    /// Transition to `completed` with a text message.
    pub async fn complete_with_text(&self, text: &str) -> A2AResult<()> {
        self.complete(Some(Message::agent_text(text))).await
    }

    /// Transition to `failed` with an error summary.
    pub async fn fail(&self, text: &str) -> A2AResult<()> {
        self.status(TaskState::Failed, Some(Message::agent_text(text)))
            .await
    }

    /// Transition to `canceled`.
    pub async fn canceled(&self, message: Option<Message>) -> A2AResult<()> {
        self.status(TaskState::Canceled, message).await
    }

    /// Yield an artifact update.
    pub async fn artifact(&self, artifact: Artifact) -> A2AResult<()> {
        self.push(YieldUpdate::Artifact(artifact)).await
    }

    /// Yield a single-text-part artifact at the given index.
    pub async fn text_artifact(
        &self,
        name: Option<&str>,
        index: u32,
        append: bool,
        text: &str,
        last_chunk: Option<bool>,
    ) -> A2AResult<()> {
        self.artifact(Artifact {
            name: name.map(String::from),
            description: None,
            parts: vec![Part::text(text)],
            metadata: None,
            index: Some(index),
            append: Some(append),
            last_chunk,
        })
        .await
    }
}

/// Core trait for agent logic.
///
/// The engine calls [`run`](Handler::run) for every `tasks/send` /
/// `tasks/sendSubscribe` dispatch, including re-opens of terminal tasks and
/// resumptions from `input-required`. The handler's yields drive the task
/// state machine; if it returns without yielding a terminal state, the
/// engine forces `completed`, and if it returns an error, the engine marks
/// the task `failed` with the error summary.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Produce this run's updates, pushing them into `updates` in order.
    async fn run(&self, ctx: HandlerContext, updates: UpdateSink) -> A2AResult<()>;
}
