//! Activity tree rendering
//!
//! [`TaskOutputRenderer`] walks a task's activity tree depth-first and feeds
//! every printable node to an [`ActivitySink`]. The sink decides what the
//! output looks like: colored console lines, TeamCity service messages, or
//! structured log records.
//!
//! The renderer remembers which nodes it has already printed, so a caller
//! polling a running task can call [`TaskOutputRenderer::render`] after
//! every fetch and only see new output.

pub mod console;
pub mod service_message;
pub mod structured;
pub mod teamcity;

use std::collections::HashSet;
use std::io;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::client::TaskSource;
use crate::task::{ActivityElement, LogEntry, TaskDetails, TaskResource};

pub use console::ConsoleSink;
pub use service_message::ServiceMessage;
pub use structured::StructuredLogSink;
pub use teamcity::TeamCitySink;

/// Receives the nodes of an activity tree in depth-first pre-order.
///
/// For every printable element the renderer calls `begin_element`, then
/// `log_entry` once per log line, then recurses into the children, then
/// calls `end_element`. `depth` is 0 for top-level steps.
pub trait ActivitySink: Send {
    /// An element is about to be rendered
    fn begin_element(&mut self, element: &ActivityElement, depth: usize) -> io::Result<()>;

    /// One log line of the element most recently begun at `depth`
    fn log_entry(&mut self, entry: &LogEntry, depth: usize) -> io::Result<()>;

    /// The element and all of its children have been rendered
    fn end_element(&mut self, _element: &ActivityElement, _depth: usize) -> io::Result<()> {
        Ok(())
    }
}

/// Two spaces per nesting level
#[must_use]
pub fn indent_for(depth: usize) -> String {
    "  ".repeat(depth)
}

/// Where rendered output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputTarget {
    /// Colored, indented text on stdout
    Console,
    /// `##teamcity[...]` block and message service messages on stdout
    #[serde(rename = "teamcity")]
    TeamCity,
    /// Structured records through `tracing` (Azure DevOps / VSTS builds)
    #[serde(rename = "structured")]
    StructuredLog,
}

impl OutputTarget {
    /// Pick a target from the process environment
    #[must_use]
    pub fn detect() -> Self {
        Self::detect_with(|key| std::env::var(key).ok())
    }

    /// Pick a target using `lookup` to read environment variables.
    ///
    /// Azure DevOps agents (`TF_BUILD`, `AGENT_ID`) take precedence over
    /// TeamCity (`TEAMCITY_VERSION`).
    pub fn detect_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_set = |key: &str| lookup(key).is_some_and(|v| !v.trim().is_empty());

        if is_set("TF_BUILD") || is_set("AGENT_ID") {
            Self::StructuredLog
        } else if is_set("TEAMCITY_VERSION") {
            Self::TeamCity
        } else {
            Self::Console
        }
    }

    /// Build the sink that writes this target to stdout
    #[must_use]
    pub fn stdout_sink(self) -> Box<dyn ActivitySink> {
        match self {
            Self::Console => Box::new(ConsoleSink::stdout()),
            Self::TeamCity => Box::new(TeamCitySink::new(io::stdout())),
            Self::StructuredLog => Box::new(StructuredLogSink::new()),
        }
    }
}

/// Renders a task's activity tree, printing each finished node exactly once
/// per renderer instance.
///
/// One renderer belongs to one task being monitored. `render` takes
/// `&mut self`, so concurrent use of one renderer has to go through a lock.
#[derive(Debug, Default)]
pub struct TaskOutputRenderer {
    printed: HashSet<String>,
}

impl TaskOutputRenderer {
    /// Create a renderer that has printed nothing yet
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the task's details and render whatever is newly finished.
    ///
    /// Fetch errors are returned unchanged. A task without activity logs
    /// renders nothing.
    pub async fn render<S>(
        &mut self,
        source: &S,
        task: &TaskResource,
        sink: &mut dyn ActivitySink,
    ) -> Result<()>
    where
        S: TaskSource + ?Sized,
    {
        let details = source.get_details(task).await?;
        self.render_details(&details, sink);
        Ok(())
    }

    /// Render already-fetched details.
    ///
    /// Top-level activity logs are task containers; their children are the
    /// steps that get rendered.
    pub fn render_details(&mut self, details: &TaskDetails, sink: &mut dyn ActivitySink) {
        let Some(logs) = &details.activity_logs else {
            return;
        };

        for step in logs.iter().flat_map(|log| &log.children) {
            self.visit(step, 0, sink);
        }
    }

    /// Render `roots` as top-level elements
    pub fn render_tree(&mut self, roots: &[ActivityElement], sink: &mut dyn ActivitySink) {
        for root in roots {
            self.visit(root, 0, sink);
        }
    }

    /// Number of elements printed so far
    #[must_use]
    pub fn printed_count(&self) -> usize {
        self.printed.len()
    }

    /// Whether the element with `id` has been printed
    #[must_use]
    pub fn has_printed(&self, id: &str) -> bool {
        self.printed.contains(id)
    }

    fn visit(&mut self, element: &ActivityElement, depth: usize, sink: &mut dyn ActivitySink) {
        if !self.is_printable(element) {
            return;
        }

        report(sink.begin_element(element, depth), element);
        for entry in &element.log_elements {
            report(sink.log_entry(entry, depth), element);
        }
        for child in &element.children {
            self.visit(child, depth + 1, sink);
        }
        report(sink.end_element(element, depth), element);
    }

    /// Marks the element printed when it is finished and hasn't been printed.
    fn is_printable(&mut self, element: &ActivityElement) -> bool {
        if element.status.is_incomplete() {
            return false;
        }
        self.printed.insert(element.id.clone())
    }
}

// Output errors never stop the rest of the tree from rendering
fn report(result: io::Result<()>, element: &ActivityElement) {
    if let Err(err) = result {
        tracing::debug!(element = %element.id, error = %err, "failed to write activity output");
    }
}
