//! HTTP task source
//!
//! Reads tasks from the server REST API:
//! - `GET /api/tasks/{id}` - task state
//! - `GET /api/tasks/{id}/details?verbose=true` - task plus activity tree
//!
//! Requests authenticate with the `X-Octopus-ApiKey` header.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::TaskSource;
use crate::task::{TaskDetails, TaskResource};

const API_KEY_HEADER: &str = "X-Octopus-ApiKey";

/// Task source backed by the server's REST API
#[derive(Clone)]
pub struct HttpTaskSource {
    base_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpTaskSource {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
        })
    }

    /// Server base URL without a trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn task_url(&self, task_id: &str) -> String {
        format!("{}/api/tasks/{task_id}", self.base_url)
    }

    /// Details URL, preferring the task's own `Details` link
    fn details_url(&self, task: &TaskResource) -> String {
        let path = task
            .details_link()
            .map_or_else(|| format!("/api/tasks/{}/details", task.id), str::to_string);
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        };
        format!("{url}?verbose=true")
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut request = self.http_client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        tracing::debug!(%url, "fetching");
        let response = request
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{}", describe_status(status, url));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {url}"))
    }
}

/// Human-readable error for a failed HTTP status
fn describe_status(status: StatusCode, url: &str) -> String {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("Server rejected the API key ({status}) for {url}. Check --api-key.")
        }
        StatusCode::NOT_FOUND => format!("Task not found ({status}): {url}"),
        _ => format!("Server returned {status} for {url}"),
    }
}

#[async_trait]
impl TaskSource for HttpTaskSource {
    async fn get_task(&self, task_id: &str) -> Result<TaskResource> {
        self.get_json(&self.task_url(task_id)).await
    }

    async fn get_details(&self, task: &TaskResource) -> Result<TaskDetails> {
        self.get_json(&self.details_url(task)).await
    }
}
