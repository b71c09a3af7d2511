//! Shared test utilities
//!
//! Common helpers used across test modules. Only compiled in test builds.

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

use crate::task::{ActivityElement, ActivityStatus, LogCategory, TaskDetails};

/// The two-node deployment used throughout the renderer tests:
/// `Deploy` (Info "Starting") with child `Step 1` (Error "Failed once but retried").
#[must_use]
pub fn make_deploy_tree() -> ActivityElement {
    ActivityElement::new("ServerTasks-1_0", "Deploy", ActivityStatus::Success)
        .with_log(LogCategory::Info, "Starting")
        .with_child(
            ActivityElement::new("ServerTasks-1_0_0", "Step 1", ActivityStatus::Success)
                .with_log(LogCategory::Error, "Failed once but retried"),
        )
}

/// Wrap `steps` in a task-level container the way the server does.
#[must_use]
pub fn make_details(container_status: ActivityStatus, steps: Vec<ActivityElement>) -> TaskDetails {
    let mut container = ActivityElement::new("ServerTasks-1", "Deploy release", container_status);
    container.children = steps;
    TaskDetails {
        task: None,
        activity_logs: Some(vec![container]),
    }
}

/// Clonable in-memory writer; every clone appends to the same buffer
#[derive(Clone, Default)]
pub struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    /// Everything written so far
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuf {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a thread-local `tracing` subscriber and return everything it
/// logged, formatted without timestamps or ANSI colors.
pub fn capture_logs<F: FnOnce()>(f: F) -> String {
    let buf = SharedBuf::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_ansi(false)
        .without_time()
        .with_max_level(tracing::Level::TRACE)
        .finish();

    tracing::subscriber::with_default(subscriber, f);
    buf.contents()
}
