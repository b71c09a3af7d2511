//! TeamCity service message output
//!
//! Each element becomes a `blockOpened`/`blockClosed` pair named
//! `"{status}: {name}"`; children nest inside the parent's block. Log lines
//! become `message` calls with a TeamCity status derived from the category.

use std::io::{self, Write};

use super::service_message::ServiceMessage;
use super::ActivitySink;
use crate::task::{ActivityElement, LogCategory, LogEntry};

/// TeamCity message status for a log category
#[must_use]
pub const fn message_status(category: &LogCategory) -> &'static str {
    match category {
        LogCategory::Error => "ERROR",
        LogCategory::Fatal => "FAILURE",
        LogCategory::Warning => "WARNING",
        _ => "NORMAL",
    }
}

fn block_name(element: &ActivityElement) -> String {
    format!("{}: {}", element.status, element.name)
}

/// Writes the activity tree as TeamCity service messages
pub struct TeamCitySink<W: Write> {
    out: W,
}

impl<W: Write> TeamCitySink<W> {
    /// Sink writing service messages to `out`
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, message: &ServiceMessage) -> io::Result<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()
    }
}

impl<W: Write + Send> ActivitySink for TeamCitySink<W> {
    fn begin_element(&mut self, element: &ActivityElement, _depth: usize) -> io::Result<()> {
        self.emit(&ServiceMessage::new("blockOpened").attr("name", &block_name(element)))
    }

    fn log_entry(&mut self, entry: &LogEntry, _depth: usize) -> io::Result<()> {
        let status = message_status(&entry.category);
        for line in entry
            .message_text
            .split('\n')
            .filter(|line| !line.trim().is_empty())
        {
            self.emit(
                &ServiceMessage::new("message")
                    .attr("text", line)
                    .attr("status", status),
            )?;
        }
        Ok(())
    }

    fn end_element(&mut self, element: &ActivityElement, _depth: usize) -> io::Result<()> {
        self.emit(&ServiceMessage::new("blockClosed").attr("name", &block_name(element)))
    }
}
