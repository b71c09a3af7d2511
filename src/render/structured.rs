//! Structured log output for Azure DevOps / VSTS builds
//!
//! Each element and log line becomes one `tracing` event under the
//! `tasklog::activity` target. Indentation, status, name and message are
//! recorded as fields; the message itself is preformatted with
//! `format_args!`, so braces or percent signs in task output are never
//! treated as formatting directives downstream.
//!
//! Records are written by [`activity_layer`], whose filter is fixed: the
//! diagnostics filter (`RUST_LOG`) can't hide the task log.

use std::io;

use tracing::{Level, Subscriber};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::{indent_for, ActivitySink};
use crate::task::{ActivityElement, LogEntry};

/// `tracing` target used for rendered activity records
pub const ACTIVITY_TARGET: &str = "tasklog::activity";

/// Layer that writes activity records, and nothing else, to `writer`
pub fn activity_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(Targets::new().with_target(ACTIVITY_TARGET, Level::INFO))
}

/// Emits the activity tree as structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLogSink;

impl StructuredLogSink {
    /// Create a structured sink
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ActivitySink for StructuredLogSink {
    fn begin_element(&mut self, element: &ActivityElement, depth: usize) -> io::Result<()> {
        let indent = indent_for(depth);
        tracing::info!(
            target: ACTIVITY_TARGET,
            indent = %indent,
            status = %element.status,
            name = %element.name,
            "{}",
            format_args!("{indent}         {}: {}", element.status, element.name)
        );
        Ok(())
    }

    fn log_entry(&mut self, entry: &LogEntry, depth: usize) -> io::Result<()> {
        let indent = indent_for(depth);
        let category = format!("{:<8}", entry.category);
        tracing::info!(
            target: ACTIVITY_TARGET,
            category = %category,
            indent = %indent,
            message_text = %entry.message_text,
            "{}",
            format_args!("{category}{indent}   {}", entry.message_text)
        );
        Ok(())
    }
}
