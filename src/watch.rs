//! Task watcher
//!
//! Polls a task until it completes, re-rendering its activity tree after
//! every poll. A single renderer per task keeps output incremental.
//!
//! Concurrent watchers share one output lock. Fetches run in parallel, but
//! each render pass holds the lock from its first line to its last, so
//! nested TeamCity blocks from different tasks never interleave.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::client::TaskSource;
use crate::render::{ActivitySink, TaskOutputRenderer};
use crate::task::TaskResource;

/// How often to poll and when to give up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Delay between polls
    pub poll_interval: Duration,
    /// Stop with an error after this long; `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: None,
        }
    }
}

/// Poll `task_id` until it completes, rendering new activity to `sink`.
///
/// Returns the task as last fetched. Fetch errors stop the watch.
pub async fn watch_task<S>(
    source: &S,
    task_id: &str,
    sink: &mut dyn ActivitySink,
    options: &WatchOptions,
) -> Result<TaskResource>
where
    S: TaskSource + ?Sized,
{
    poll_task(source, task_id, sink, options, &Mutex::new(())).await
}

async fn poll_task<S>(
    source: &S,
    task_id: &str,
    sink: &mut dyn ActivitySink,
    options: &WatchOptions,
    output: &Mutex<()>,
) -> Result<TaskResource>
where
    S: TaskSource + ?Sized,
{
    let mut renderer = TaskOutputRenderer::new();
    let started = Instant::now();

    loop {
        let task = source
            .get_task(task_id)
            .await
            .with_context(|| format!("Failed to fetch task '{task_id}'"))?;

        let details = source.get_details(&task).await?;
        {
            let _pass = output.lock().unwrap_or_else(PoisonError::into_inner);
            renderer.render_details(&details, sink);
        }

        if task.is_completed {
            tracing::info!(
                task = %task.id,
                state = %task.state,
                rendered = renderer.printed_count(),
                "task completed"
            );
            return Ok(task);
        }

        if let Some(timeout) = options.timeout {
            if started.elapsed() >= timeout {
                bail!(
                    "Timed out after {}s waiting for task '{task_id}' (state: {})",
                    timeout.as_secs(),
                    task.state
                );
            }
        }

        tracing::debug!(task = %task.id, state = %task.state, "task still running");
        tokio::time::sleep(options.poll_interval).await;
    }
}

/// Watch several tasks concurrently, each with its own renderer and a sink
/// from `make_sink`. Results come back in the order of `task_ids`.
///
/// Sinks may share a writer: one task's render pass is written completely
/// before another task's pass starts.
///
/// The first failing watch fails the whole call; the remaining watchers are
/// aborted.
pub async fn watch_tasks<F>(
    source: Arc<dyn TaskSource>,
    task_ids: &[String],
    make_sink: F,
    options: WatchOptions,
) -> Result<Vec<TaskResource>>
where
    F: Fn(&str) -> Box<dyn ActivitySink> + Send + Sync + 'static,
{
    let make_sink = Arc::new(make_sink);
    let output = Arc::new(Mutex::new(()));
    let mut watchers = JoinSet::new();

    for (index, task_id) in task_ids.iter().enumerate() {
        let source = Arc::clone(&source);
        let make_sink = Arc::clone(&make_sink);
        let output = Arc::clone(&output);
        let task_id = task_id.clone();
        watchers.spawn(async move {
            let mut sink = make_sink(&task_id);
            let result =
                poll_task(source.as_ref(), &task_id, sink.as_mut(), &options, &output).await;
            (index, result)
        });
    }

    let mut finished: Vec<Option<TaskResource>> = vec![None; task_ids.len()];
    while let Some(joined) = watchers.join_next().await {
        let (index, result) = joined.context("Task watcher panicked")?;
        finished[index] = Some(result?);
    }

    Ok(finished.into_iter().flatten().collect())
}
