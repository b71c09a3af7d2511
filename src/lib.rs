//! Tasklog - deployment task log renderer
//!
//! Tasklog polls a deployment server task and renders its hierarchical
//! activity log as it completes: colored text on a console, block-structured
//! service messages under TeamCity, or structured records under Azure DevOps.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

pub mod client;
pub mod config;
pub mod render;
pub mod task;
pub mod watch;

#[cfg(test)]
pub mod testutil;

// Re-export commonly used types
pub use client::{FileTaskSource, HttpTaskSource, TaskSource};
pub use config::{OutputMode, TasklogConfig};
pub use render::{
    ActivitySink, ConsoleSink, OutputTarget, StructuredLogSink, TaskOutputRenderer, TeamCitySink,
};
pub use task::{
    ActivityElement, ActivityStatus, LogCategory, LogEntry, ReleaseTemplatePackage, TaskDetails,
    TaskResource, TaskState,
};
pub use watch::{watch_task, watch_tasks, WatchOptions};
