//! Colored console output
//!
//! Each element prints a status header followed by its log lines, indented
//! two spaces per level:
//!
//! ```text
//!          Success: Deploy
//! Info       Starting
//!            Success: Step 1
//!   Error      Failed once but retried
//! ```
//!
//! Every physical line is colored on its own through `colored`, with the
//! reset inside the line, so nothing leaks into later output. Each call
//! hands the writer one buffer, so concurrent renderers never split a line.

use std::io::{self, Write};

use colored::{Color, Colorize};

use super::{indent_for, ActivitySink};
use crate::task::{ActivityElement, ActivityStatus, LogCategory, LogEntry};

/// Width of the category column plus the gap before the message
const MESSAGE_COLUMN: usize = 11;

/// Collects text written through it and hands it to the writer in `color`
/// when dropped, reset sequence included.
///
/// With `None` the text is written plain.
pub struct ColorScope<'a, W: Write> {
    out: &'a mut W,
    color: Option<Color>,
    text: Vec<u8>,
}

impl<'a, W: Write> ColorScope<'a, W> {
    /// Start writing in `color`
    pub fn acquire(out: &'a mut W, color: Option<Color>) -> Self {
        Self {
            out,
            color,
            text: Vec::new(),
        }
    }

    fn release(&mut self) -> io::Result<()> {
        let text = String::from_utf8_lossy(&self.text);
        match self.color {
            Some(color) if !text.is_empty() => {
                write!(self.out, "{}", text.as_ref().color(color))
            }
            _ => self.out.write_all(text.as_bytes()),
        }
    }
}

impl<W: Write> Write for ColorScope<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.text.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Drop for ColorScope<'_, W> {
    fn drop(&mut self) {
        // Drop can't report; the next write will surface a broken writer
        let _ = self.release();
    }
}

/// Header color for an activity status
#[must_use]
pub const fn status_color(status: &ActivityStatus) -> Option<Color> {
    match status {
        ActivityStatus::Success => Some(Color::Green),
        ActivityStatus::SuccessWithWarning => Some(Color::Yellow),
        ActivityStatus::Failed => Some(Color::Red),
        _ => None,
    }
}

/// Line color for a log category
#[must_use]
pub const fn category_color(category: &LogCategory) -> Option<Color> {
    match category {
        LogCategory::Error | LogCategory::Fatal => Some(Color::Red),
        LogCategory::Warning => Some(Color::Yellow),
        _ => None,
    }
}

/// Word-wrap `message` to `width` columns, assuming it starts right after
/// `prefix`. Continuation lines, including those from embedded newlines,
/// are prefixed with `prefix`.
#[must_use]
pub fn wrap_message(prefix: &str, message: &str, width: usize) -> String {
    let options = textwrap::Options::new(width.max(1))
        .initial_indent(prefix)
        .subsequent_indent(prefix);

    let lines = textwrap::wrap(message, options);
    let mut wrapped = String::with_capacity(message.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            wrapped.push_str(line.strip_prefix(prefix).unwrap_or(line));
        } else {
            wrapped.push('\n');
            wrapped.push_str(line);
        }
    }
    wrapped
}

/// Writes the activity tree as colored, indented text
pub struct ConsoleSink<W: Write> {
    out: W,
    colorize: bool,
    width: usize,
}

impl ConsoleSink<io::Stdout> {
    /// Console sink on stdout, sized to the terminal.
    ///
    /// Colors follow `colored`'s global decision (`NO_COLOR`, `CLICOLOR`,
    /// `CLICOLOR_FORCE`, tty detection).
    #[must_use]
    pub fn stdout() -> Self {
        let colorize = colored::control::SHOULD_COLORIZE.should_colorize();
        Self::new(io::stdout(), colorize, textwrap::termwidth())
    }
}

impl<W: Write> ConsoleSink<W> {
    /// Console sink on any writer with an explicit wrap width
    pub const fn new(out: W, colorize: bool, width: usize) -> Self {
        Self {
            out,
            colorize,
            width,
        }
    }

    /// Consume the sink, returning the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write `text` with each physical line individually colored and reset,
    /// then hand the whole block to the writer in one call.
    fn write_colored(&mut self, color: Option<Color>, text: &str) -> io::Result<()> {
        let color = color.filter(|_| self.colorize);
        let mut buf = Vec::with_capacity(text.len() + 16);
        for line in text.split('\n') {
            {
                let mut scope = ColorScope::acquire(&mut buf, color);
                scope.write_all(line.as_bytes())?;
            }
            buf.push(b'\n');
        }
        self.out.write_all(&buf)?;
        self.out.flush()
    }
}

impl<W: Write + Send> ActivitySink for ConsoleSink<W> {
    fn begin_element(&mut self, element: &ActivityElement, depth: usize) -> io::Result<()> {
        let indent = indent_for(depth);
        let line = format!("{indent}         {}: {}", element.status, element.name);
        self.write_colored(status_color(&element.status), &line)
    }

    fn log_entry(&mut self, entry: &LogEntry, depth: usize) -> io::Result<()> {
        let indent = indent_for(depth);
        let continuation = format!("{indent}{}", " ".repeat(MESSAGE_COLUMN));
        let message = wrap_message(&continuation, &entry.message_text, self.width);
        let text = format!("{indent}{:<8}   {message}", entry.category);
        self.write_colored(category_color(&entry.category), &text)
    }
}
