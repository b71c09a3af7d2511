//! Configuration
//!
//! Parses `tasklog.toml` and layers environment variables on top. CLI flags
//! are applied last by the binary.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::render::OutputTarget;

/// Environment variable holding the server URL
pub const SERVER_ENV: &str = "TASKLOG_SERVER";
/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "TASKLOG_API_KEY";

/// Requested output target; `auto` detects the CI environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Detect from the environment
    #[default]
    Auto,
    /// Colored console text
    Console,
    /// TeamCity service messages
    #[value(name = "teamcity")]
    #[serde(rename = "teamcity")]
    TeamCity,
    /// Structured log records
    Structured,
}

impl OutputMode {
    /// Resolve to a concrete target, detecting from the environment for `auto`
    #[must_use]
    pub fn resolve(self) -> OutputTarget {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` to read environment variables
    pub fn resolve_with<F>(self, lookup: F) -> OutputTarget
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Self::Auto => OutputTarget::detect_with(lookup),
            Self::Console => OutputTarget::Console,
            Self::TeamCity => OutputTarget::TeamCity,
            Self::Structured => OutputTarget::StructuredLog,
        }
    }
}

/// Server connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL, e.g. `https://octopus.example.com`
    pub url: Option<String>,
    /// API key sent as `X-Octopus-ApiKey`
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout_secs: 30,
        }
    }
}

/// Polling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between polls (default: 5)
    pub poll_interval_secs: u64,
    /// Give up after this many seconds; 0 waits forever (default: 0)
    pub timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            timeout_secs: 0,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output target (default: auto)
    pub target: OutputMode,
}

/// Top-level configuration parsed from tasklog.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TasklogConfig {
    /// Server connection
    pub server: ServerConfig,
    /// Polling
    pub watch: WatchConfig,
    /// Output
    pub output: OutputConfig,
}

impl TasklogConfig {
    /// Parse a config file from a path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Load a config file, or defaults when `path` doesn't exist and
    /// `required` is false
    pub fn load<P: AsRef<Path>>(path: P, required: bool) -> Result<Self> {
        let path = path.as_ref();
        if !required && !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    /// Parse config content from a string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse tasklog.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `TASKLOG_SERVER` and `TASKLOG_API_KEY` from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay server settings read through `lookup`; empty values are ignored
    #[must_use]
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(SERVER_ENV) {
            self.server.url = Some(url);
        }
        if let Some(key) = non_empty(API_KEY_ENV) {
            self.server.api_key = Some(key);
        }
        self
    }

    /// Poll interval as a `Duration`
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.watch.poll_interval_secs)
    }

    /// Watch timeout, `None` when unlimited
    #[must_use]
    pub const fn watch_timeout(&self) -> Option<Duration> {
        match self.watch.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Request timeout as a `Duration`
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }

    /// The server URL, required when talking to a live server
    pub fn server_url(&self) -> Result<&str> {
        let Some(url) = self.server.url.as_deref() else {
            bail!("No server URL configured. Pass --server, set {SERVER_ENV}, or add [server] url to tasklog.toml");
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Invalid server URL '{url}': must start with http:// or https://");
        }
        Ok(url)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.watch.poll_interval_secs == 0 {
            bail!("watch.poll_interval_secs must be greater than 0");
        }
        if self.server.timeout_secs == 0 {
            bail!("server.timeout_secs must be greater than 0");
        }
        if let Some(url) = &self.server.url {
            if url.trim().is_empty() {
                bail!("server.url cannot be empty");
            }
        }
        Ok(())
    }
}
