//! Server task data model
//!
//! Types deserialized from the deployment server's task API. Everything here
//! is plain data; rendering lives in [`crate::render`].

pub mod model;
pub mod package;

pub use model::{
    ActivityElement, ActivityStatus, LogCategory, LogEntry, TaskDetails, TaskResource, TaskState,
};
pub use package::ReleaseTemplatePackage;
