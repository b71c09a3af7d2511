//! Task, activity and log entry types
//!
//! Mirrors the JSON returned by `/api/tasks/{id}` and
//! `/api/tasks/{id}/details`. Field names on the wire are PascalCase.
//! Enum-like string fields fall back to an `Unknown` variant so a newer
//! server can never break rendering.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Completion status of a single activity node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityStatus {
    /// Not started yet
    Pending,
    /// Currently executing
    Running,
    /// Finished without problems
    Success,
    /// Finished, but logged warnings
    SuccessWithWarning,
    /// Finished with an error
    Failed,
    /// Skipped by a run condition
    Skipped,
    /// Canceled before finishing
    Canceled,
    /// Status string this version doesn't recognize
    Unknown(String),
}

impl ActivityStatus {
    /// Wire name of the status
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "Pending",
            Self::Running => "Running",
            Self::Success => "Success",
            Self::SuccessWithWarning => "SuccessWithWarning",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
            Self::Canceled => "Canceled",
            Self::Unknown(raw) => raw,
        }
    }

    /// True while the node's log and final status are still changing
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

impl From<String> for ActivityStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Success" => Self::Success,
            "SuccessWithWarning" => Self::SuccessWithWarning,
            "Failed" => Self::Failed,
            "Skipped" => Self::Skipped,
            "Canceled" => Self::Canceled,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ActivityStatus> for String {
    fn from(value: ActivityStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Category of a log line
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogCategory {
    /// Trace
    Trace,
    /// Verbose
    Verbose,
    /// Info
    Info,
    /// Planned
    Planned,
    /// Highlight
    Highlight,
    /// Wait
    Wait,
    /// Gap in the log
    Gap,
    /// Alert
    Alert,
    /// Warning
    Warning,
    /// Error
    Error,
    /// Fatal
    Fatal,
    /// Category string this version doesn't recognize
    Unknown(String),
}

impl LogCategory {
    /// Wire name of the category
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Trace => "Trace",
            Self::Verbose => "Verbose",
            Self::Info => "Info",
            Self::Planned => "Planned",
            Self::Highlight => "Highlight",
            Self::Wait => "Wait",
            Self::Gap => "Gap",
            Self::Alert => "Alert",
            Self::Warning => "Warning",
            Self::Error => "Error",
            Self::Fatal => "Fatal",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for LogCategory {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Trace" => Self::Trace,
            "Verbose" => Self::Verbose,
            "Info" => Self::Info,
            "Planned" => Self::Planned,
            "Highlight" => Self::Highlight,
            "Wait" => Self::Wait,
            "Gap" => Self::Gap,
            "Alert" => Self::Alert,
            "Warning" => Self::Warning,
            "Error" => Self::Error,
            "Fatal" => Self::Fatal,
            _ => Self::Unknown(value),
        }
    }
}

impl From<LogCategory> for String {
    fn from(value: LogCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for LogCategory {
    // `pad` so `{:<8}` alignment works
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// One line (possibly multi-line text) logged by an activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    /// Severity category
    pub category: LogCategory,
    /// Message body, may contain newlines
    #[serde(default)]
    pub message_text: String,
    /// Extra detail (stack traces and the like)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// When the line was logged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_at: Option<DateTime<FixedOffset>>,
}

impl LogEntry {
    /// Create an entry with just a category and text
    #[must_use]
    pub fn new(category: LogCategory, message_text: impl Into<String>) -> Self {
        Self {
            category,
            message_text: message_text.into(),
            detail: None,
            occurred_at: None,
        }
    }
}

/// A node in a task's activity tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivityElement {
    /// Identifier, stable across fetches of the same task
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Current status
    pub status: ActivityStatus,
    /// Log lines in emission order
    #[serde(default)]
    pub log_elements: Vec<LogEntry>,
    /// Child activities in execution order
    #[serde(default)]
    pub children: Vec<ActivityElement>,
    /// When the activity started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started: Option<DateTime<FixedOffset>>,
    /// When the activity ended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<DateTime<FixedOffset>>,
    /// Reported progress, 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
    /// Reported progress message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,
}

impl ActivityElement {
    /// Create a leaf element with no log lines
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: ActivityStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            log_elements: Vec::new(),
            children: Vec::new(),
            started: None,
            ended: None,
            progress_percentage: None,
            progress_message: None,
        }
    }

    /// Append a log line
    #[must_use]
    pub fn with_log(mut self, category: LogCategory, text: impl Into<String>) -> Self {
        self.log_elements.push(LogEntry::new(category, text));
        self
    }

    /// Append a child activity
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

/// Lifecycle state of a server task as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    /// Waiting for a worker
    Queued,
    /// Running
    Executing,
    /// Finished successfully
    Success,
    /// Finished with a failure
    Failed,
    /// Canceled by a user
    Canceled,
    /// Exceeded its allotted time
    TimedOut,
    /// Cancellation requested
    Cancelling,
    /// State string this version doesn't recognize
    Unknown(String),
}

impl TaskState {
    /// Wire name of the state
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "Queued",
            Self::Executing => "Executing",
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::TimedOut => "TimedOut",
            Self::Cancelling => "Cancelling",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for TaskState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Queued" => Self::Queued,
            "Executing" => Self::Executing,
            "Success" => Self::Success,
            "Failed" => Self::Failed,
            "Canceled" => Self::Canceled,
            "TimedOut" => Self::TimedOut,
            "Cancelling" => Self::Cancelling,
            _ => Self::Unknown(value),
        }
    }
}

impl From<TaskState> for String {
    fn from(value: TaskState) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Handle to a server task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskResource {
    /// Task identifier, e.g. `ServerTasks-123`
    pub id: String,
    /// Task type name, e.g. `Deploy`
    #[serde(default)]
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Current lifecycle state
    pub state: TaskState,
    /// Whether the task has reached a final state
    #[serde(default)]
    pub is_completed: bool,
    /// Whether the task completed without failure
    #[serde(default)]
    pub finished_successfully: bool,
    /// Whether any warnings or errors were logged
    #[serde(default)]
    pub has_warnings_or_errors: bool,
    /// Failure message for failed tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Link relations, e.g. `Self`, `Details`
    #[serde(default)]
    pub links: BTreeMap<String, String>,
}

impl TaskResource {
    /// The `Details` link with any URI template suffix (`{?verbose,tail}`) removed
    #[must_use]
    pub fn details_link(&self) -> Option<&str> {
        self.links
            .get("Details")
            .map(|href| href.split_once('{').map_or(href.as_str(), |(path, _)| path))
    }
}

/// Task plus its full activity tree
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskDetails {
    /// The task itself, when the server includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskResource>,
    /// Top-level activity logs; absent until the task has logged anything
    #[serde(default)]
    pub activity_logs: Option<Vec<ActivityElement>>,
}
