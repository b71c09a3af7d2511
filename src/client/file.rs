//! File-backed task source
//!
//! Reads a task details JSON document (the body of
//! `/api/tasks/{id}/details`) from disk. The file is re-read on every call,
//! so another process can keep rewriting it while a watcher polls.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::TaskSource;
use crate::task::{TaskDetails, TaskResource, TaskState};

/// Task source reading a saved details document
#[derive(Debug, Clone)]
pub struct FileTaskSource {
    path: PathBuf,
}

impl FileTaskSource {
    /// Source reading from `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the details document
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<TaskDetails> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read task details: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse task details: {}", self.path.display()))
    }
}

/// Handle for a document that doesn't embed its task: treated as finished
/// so a watcher renders once and stops.
fn completed_task(task_id: &str) -> TaskResource {
    TaskResource {
        id: task_id.to_string(),
        name: String::new(),
        description: String::new(),
        state: TaskState::Success,
        is_completed: true,
        finished_successfully: true,
        has_warnings_or_errors: false,
        error_message: None,
        links: std::collections::BTreeMap::new(),
    }
}

#[async_trait]
impl TaskSource for FileTaskSource {
    async fn get_task(&self, task_id: &str) -> Result<TaskResource> {
        let details = self.read().await?;
        Ok(details.task.unwrap_or_else(|| completed_task(task_id)))
    }

    async fn get_details(&self, _task: &TaskResource) -> Result<TaskDetails> {
        self.read().await
    }
}
