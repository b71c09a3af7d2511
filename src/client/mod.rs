//! Task sources
//!
//! A [`TaskSource`] fetches a task and its activity tree. The renderer only
//! depends on this trait; [`HttpTaskSource`] talks to a live server and
//! [`FileTaskSource`] reads a saved details document.

pub mod file;
pub mod http;

use anyhow::Result;
use async_trait::async_trait;

use crate::task::{TaskDetails, TaskResource};

pub use file::FileTaskSource;
pub use http::HttpTaskSource;

/// Fetches server tasks and their activity logs
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// Fetch the current state of a task
    async fn get_task(&self, task_id: &str) -> Result<TaskResource>;

    /// Fetch the task's full activity tree
    async fn get_details(&self, task: &TaskResource) -> Result<TaskDetails>;
}
