//! Tasklog - deployment task log renderer
//!
//! CLI entry point: watches server tasks and renders their activity logs.

// Allow multiple crate versions from dependencies (can't easily control)
#![allow(clippy::multiple_crate_versions)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use tasklog::render::structured::{activity_layer, ACTIVITY_TARGET};
use tasklog::{
    watch_tasks, FileTaskSource, HttpTaskSource, OutputMode, OutputTarget, TaskResource,
    TaskSource, TasklogConfig, WatchOptions,
};

const DEFAULT_CONFIG: &str = "tasklog.toml";

/// Deployment task log renderer
///
/// Polls server tasks until they finish and renders their activity logs to
/// the console, as TeamCity service messages, or as structured build logs.
#[derive(Parser, Debug)]
#[command(name = "tasklog", version, about)]
struct Cli {
    /// Server task id to watch (repeatable)
    #[arg(long = "task", required_unless_present = "from_file")]
    tasks: Vec<String>,

    /// Render a saved task details JSON document instead of querying a server
    #[arg(long, conflicts_with = "tasks")]
    from_file: Option<PathBuf>,

    /// Path to the tasklog.toml configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server base URL (overrides config and TASKLOG_SERVER)
    #[arg(long)]
    server: Option<String>,

    /// API key (overrides config and TASKLOG_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Output target
    #[arg(long, value_enum)]
    output: Option<OutputMode>,

    /// Seconds between polls
    #[arg(long)]
    poll_interval: Option<u64>,

    /// Give up after this many seconds (0 waits forever)
    #[arg(long)]
    timeout: Option<u64>,
}

/// Load the config file and apply environment and CLI overrides.
fn load_config(cli: &Cli) -> Result<TasklogConfig> {
    let (path, required) = cli
        .config
        .as_ref()
        .map_or_else(|| (PathBuf::from(DEFAULT_CONFIG), false), |p| (p.clone(), true));

    let config = TasklogConfig::load(&path, required)
        .with_context(|| format!("Failed to load config from '{}'", path.display()))?
        .with_env();

    apply_overrides(config, cli)
}

/// CLI flags win over everything else.
fn apply_overrides(mut config: TasklogConfig, cli: &Cli) -> Result<TasklogConfig> {
    if let Some(server) = &cli.server {
        config.server.url = Some(server.clone());
    }
    if let Some(api_key) = &cli.api_key {
        config.server.api_key = Some(api_key.clone());
    }
    if let Some(output) = cli.output {
        config.output.target = output;
    }
    if let Some(secs) = cli.poll_interval {
        config.watch.poll_interval_secs = secs;
    }
    if let Some(secs) = cli.timeout {
        config.watch.timeout_secs = secs;
    }
    config.validate()?;
    Ok(config)
}

/// `RUST_LOG` (default `tasklog=info`), never matching activity records.
fn diagnostics_filter(env: Option<&str>) -> EnvFilter {
    let filter = env
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("tasklog=info"));

    match format!("{ACTIVITY_TARGET}=off").parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

/// Activity records go to stdout through their own layer; diagnostics go to
/// stderr and follow `RUST_LOG`.
fn init_logging(target: OutputTarget) {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let diagnostics = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(target != OutputTarget::StructuredLog)
        .with_target(false)
        .with_filter(diagnostics_filter(env.as_deref()));

    tracing_subscriber::registry()
        .with(activity_layer(std::io::stdout))
        .with(diagnostics)
        .init();
}

/// Id reported for a details file: the file stem, or the path itself.
fn file_task_id(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}

/// One-line outcome for a finished task.
fn format_outcome(task: &TaskResource) -> String {
    let label = if task.description.is_empty() {
        task.id.clone()
    } else {
        format!("{} ({})", task.description, task.id)
    };

    if task.finished_successfully {
        format!("{} {label}", "COMPLETED".green().bold())
    } else {
        let reason = task
            .error_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .map_or_else(|| format!("state {}", task.state), str::to_string);
        format!("{} {label}: {reason}", "FAILED".red().bold())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let target = config.output.target.resolve();
    init_logging(target);
    tracing::debug!(?target, "output target selected");

    let options = WatchOptions {
        poll_interval: config.poll_interval(),
        timeout: config.watch_timeout(),
    };

    let (source, task_ids): (Arc<dyn TaskSource>, Vec<String>) = match &cli.from_file {
        Some(path) => (
            Arc::new(FileTaskSource::new(path)),
            vec![file_task_id(path)],
        ),
        None => {
            let http = HttpTaskSource::new(
                config.server_url()?,
                config.server.api_key.clone(),
                config.request_timeout(),
            )?;
            (Arc::new(http), cli.tasks.clone())
        }
    };

    let tasks = watch_tasks(source, &task_ids, move |_| target.stdout_sink(), options).await?;

    for task in &tasks {
        eprintln!("{}", format_outcome(task));
    }

    // Exit with appropriate code
    if tasks.iter().all(|t| t.finished_successfully) {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
