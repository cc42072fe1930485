//! File-backed task store — persists tasks and history as JSON files.
//!
//! Each task is stored as two files in the configured directory:
//! `<taskId>.json` (the task without history) and `<taskId>.history.json`
//! (the message history). Writes go to a temp file first and are renamed
//! into place, so a crash never leaves a half-written file behind.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};
use crate::types::{Message, PushNotificationConfig, Task};

use super::task_store::TaskStore;

/// File-based task store.
///
/// Push notification configs are held in memory only; the on-disk layout is
/// limited to the task and history documents.
#[derive(Debug)]
pub struct FileTaskStore {
    dir: PathBuf,
    /// Serializes writes; the files themselves carry the state.
    write_lock: RwLock<()>,
    push_configs: RwLock<HashMap<String, PushNotificationConfig>>,
}

impl FileTaskStore {
    /// Create a file-backed store rooted at `dir`, creating it if needed.
    pub async fn new(dir: PathBuf) -> A2AResult<Self> {
        fs::create_dir_all(&dir).await.map_err(|e| {
            A2AError::internal_error(format!("failed to create task directory: {}", e))
        })?;
        Ok(Self {
            dir,
            write_lock: RwLock::new(()),
            push_configs: RwLock::new(HashMap::new()),
        })
    }

    /// Reject task ids that could escape the store directory.
    fn validate_task_id(task_id: &str) -> A2AResult<()> {
        if task_id.is_empty()
            || task_id.contains('/')
            || task_id.contains('\\')
            || task_id.contains("..")
        {
            return Err(A2AError::invalid_params(format!(
                "task id '{}' is not a valid file name",
                task_id
            )));
        }
        Ok(())
    }

    fn task_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", task_id))
    }

    fn history_path(&self, task_id: &str) -> PathBuf {
        self.dir.join(format!("{}.history.json", task_id))
    }

    /// Atomically write `contents` to `path` via a temp file + rename.
    async fn write_atomic(path: &PathBuf, contents: &str) -> A2AResult<()> {
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, contents)
            .await
            .map_err(|e| A2AError::internal_error(format!("failed to write task file: {}", e)))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| A2AError::internal_error(format!("failed to commit task file: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for FileTaskStore {
    async fn load(&self, task_id: &str) -> A2AResult<Option<Task>> {
        Self::validate_task_id(task_id)?;
        let _guard = self.write_lock.read().await;

        let contents = match fs::read_to_string(self.task_path(task_id)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(A2AError::internal_error(format!(
                    "failed to read task file: {}",
                    e
                )))
            }
        };
        let mut task: Task = serde_json::from_str(&contents)
            .map_err(|e| A2AError::internal_error(format!("corrupt task file: {}", e)))?;

        match fs::read_to_string(self.history_path(task_id)).await {
            Ok(contents) => {
                let history: Vec<Message> = serde_json::from_str(&contents)
                    .map_err(|e| A2AError::internal_error(format!("corrupt history file: {}", e)))?;
                task.history = Some(history);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(task_id = %task_id, "Task file present but history file missing");
                task.history = None;
            }
            Err(e) => {
                return Err(A2AError::internal_error(format!(
                    "failed to read history file: {}",
                    e
                )))
            }
        }

        debug!(task_id = %task_id, "Task loaded from disk");
        Ok(Some(task))
    }

    async fn save(&self, task: &Task) -> A2AResult<()> {
        Self::validate_task_id(&task.id)?;
        let _guard = self.write_lock.write().await;

        let history = task.history.clone().unwrap_or_default();
        let mut body = task.clone();
        body.history = None;

        let task_json = serde_json::to_string_pretty(&body)
            .map_err(|e| A2AError::internal_error(format!("failed to serialize task: {}", e)))?;
        let history_json = serde_json::to_string_pretty(&history)
            .map_err(|e| A2AError::internal_error(format!("failed to serialize history: {}", e)))?;

        Self::write_atomic(&self.task_path(&task.id), &task_json).await?;
        Self::write_atomic(&self.history_path(&task.id), &history_json).await?;

        debug!(task_id = %task.id, state = %task.status.state, "Task written to disk");
        Ok(())
    }

    async fn set_push_config(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> A2AResult<()> {
        Self::validate_task_id(task_id)?;
        let mut configs = self.push_configs.write().await;
        configs.insert(task_id.to_string(), config);
        Ok(())
    }

    async fn push_config(&self, task_id: &str) -> A2AResult<Option<PushNotificationConfig>> {
        let configs = self.push_configs.read().await;
        Ok(configs.get(task_id).cloned())
    }
}
