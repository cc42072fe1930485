//! A2A server runtime — the machinery behind the single JSON-RPC endpoint.
//!
//! - [`Handler`] trait + [`HandlerContext`] + [`UpdateSink`] — plug in agent
//!   logic as a lazy producer of yield updates
//! - [`TaskEngine`] — the task lifecycle state machine
//! - [`TaskStore`] trait + [`InMemoryTaskStore`] / [`FileTaskStore`] — task,
//!   history, and push-config persistence
//! - [`SubscriptionHub`] — SSE fan-out for task and KG subscriptions
//! - [`PushNotifier`] — webhook delivery with retry/backoff
//! - [`CancellationRegistry`] — process-wide cancelled-task set
//! - [`Dispatcher`] — method routing + capability gates
//! - [`a2a_router`] / [`a2a_router_at`] — ready-made axum routes

pub mod cancellation;
pub mod dispatcher;
pub mod file_task_store;
pub mod handler;
pub mod push_notifier;
pub mod routes;
pub mod subscription_hub;
pub mod task_engine;
pub mod task_store;

pub use cancellation::CancellationRegistry;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use file_task_store::FileTaskStore;
pub use handler::{Handler, HandlerContext, StatusUpdate, UpdateSink, YieldUpdate};
pub use push_notifier::PushNotifier;
pub use routes::{a2a_router, a2a_router_at};
pub use subscription_hub::{
    EventPayload, KnowledgeStreamFrame, SubscriptionHub, TaskStreamFrame, DEFAULT_QUEUE_BOUND,
};
pub use task_engine::{merge_artifact, TaskEngine};
pub use task_store::{InMemoryTaskStore, TaskStore};
