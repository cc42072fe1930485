//! Task store — persistence layer for tasks, history, and push configs.
//!
//! The store is responsible for persisting and retrieving [`Task`] objects
//! (with their message history) and the per-task webhook configuration.
//! Writes to one task are serialized; reads are concurrent snapshots.
//!
//! [`InMemoryTaskStore`] is provided for development and testing;
//! [`FileTaskStore`](super::file_task_store::FileTaskStore) persists to disk.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::A2AResult;
use crate::types::{PushNotificationConfig, Task};

/// Trait for persisting and retrieving tasks.
///
/// Implementations must be `Send + Sync` and serialize writes per task id
/// (single-writer); concurrent reads are allowed.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Retrieve a task (with history) by its id. `None` if unknown.
    async fn load(&self, task_id: &str) -> A2AResult<Option<Task>>;

    /// Save or replace a task and its history atomically.
    async fn save(&self, task: &Task) -> A2AResult<()>;

    /// Register a push notification config for a task.
    async fn set_push_config(&self, task_id: &str, config: PushNotificationConfig)
        -> A2AResult<()>;

    /// Retrieve the push notification config for a task, if any.
    async fn push_config(&self, task_id: &str) -> A2AResult<Option<PushNotificationConfig>>;
}

/// In-memory task store backed by a `HashMap`.
///
/// All task data is lost when the process exits. The outer `RwLock` gives
/// concurrent reads and globally serialized writes, which subsumes the
/// per-task single-writer requirement.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
    push_configs: RwLock<HashMap<String, PushNotificationConfig>>,
}

impl InMemoryTaskStore {
    /// Create a new empty in-memory task store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load(&self, task_id: &str) -> A2AResult<Option<Task>> {
        let tasks = self.tasks.read().await;
        let task = tasks.get(task_id).cloned();
        debug!(task_id = %task_id, found = task.is_some(), "Task lookup");
        Ok(task)
    }

    async fn save(&self, task: &Task) -> A2AResult<()> {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.clone(), task.clone());
        debug!(task_id = %task.id, state = %task.status.state, "Task saved");
        Ok(())
    }

    async fn set_push_config(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> A2AResult<()> {
        let mut configs = self.push_configs.write().await;
        configs.insert(task_id.to_string(), config);
        debug!(task_id = %task_id, "Push notification config saved");
        Ok(())
    }

    async fn push_config(&self, task_id: &str) -> A2AResult<Option<PushNotificationConfig>> {
        let configs = self.push_configs.read().await;
        Ok(configs.get(task_id).cloned())
    }
}
