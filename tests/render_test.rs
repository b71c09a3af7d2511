#![allow(missing_docs)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing_subscriber::fmt::MakeWriter;

use tasklog::render::console::ConsoleSink;
use tasklog::render::teamcity::TeamCitySink;
use tasklog::{
    ActivityElement, ActivityStatus, LogCategory, StructuredLogSink, TaskDetails,
    TaskOutputRenderer, TaskResource, TaskSource,
};

const DETAILS_JSON: &str = r#"{
    "Task": {
        "Id": "ServerTasks-1",
        "Name": "Deploy",
        "Description": "Deploy Web to Production",
        "State": "Success",
        "IsCompleted": true,
        "FinishedSuccessfully": true
    },
    "ActivityLogs": [
        {
            "Id": "ServerTasks-1",
            "Name": "Deploy Web to Production",
            "Status": "Success",
            "Children": [
                {
                    "Id": "ServerTasks-1_0",
                    "Name": "Deploy",
                    "Status": "Success",
                    "LogElements": [ { "Category": "Info", "MessageText": "Starting" } ],
                    "Children": [
                        {
                            "Id": "ServerTasks-1_0_0",
                            "Name": "Step 1",
                            "Status": "Success",
                            "LogElements": [ { "Category": "Error", "MessageText": "Failed once but retried" } ]
                        }
                    ]
                }
            ]
        }
    ]
}"#;

/// Clonable in-memory writer shared between a sink and the test
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuf {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Serves a details document parsed from JSON
struct StaticSource {
    details: Mutex<TaskDetails>,
}

impl StaticSource {
    fn from_json(json: &str) -> Self {
        Self {
            details: Mutex::new(serde_json::from_str(json).unwrap()),
        }
    }

    fn replace(&self, details: TaskDetails) {
        *self.details.lock().unwrap() = details;
    }

    fn task(&self) -> TaskResource {
        self.details.lock().unwrap().task.clone().unwrap()
    }
}

#[async_trait]
impl TaskSource for StaticSource {
    async fn get_task(&self, _task_id: &str) -> Result<TaskResource> {
        Ok(self.task())
    }

    async fn get_details(&self, _task: &TaskResource) -> Result<TaskDetails> {
        Ok(self.details.lock().unwrap().clone())
    }
}

struct UnreachableSource;

#[async_trait]
impl TaskSource for UnreachableSource {
    async fn get_task(&self, _task_id: &str) -> Result<TaskResource> {
        bail!("401 Unauthorized")
    }

    async fn get_details(&self, _task: &TaskResource) -> Result<TaskDetails> {
        bail!("401 Unauthorized")
    }
}

/// Console output for the two-node deployment: four lines, child indented.
#[tokio::test]
async fn test_console_end_to_end() {
    let source = StaticSource::from_json(DETAILS_JSON);
    let mut renderer = TaskOutputRenderer::new();
    let mut sink = ConsoleSink::new(Vec::new(), false, 120);

    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "         Success: Deploy",
            "Info       Starting",
            "           Success: Step 1",
            "  Error      Failed once but retried",
        ]
    );
}

/// TeamCity output for the two-node deployment: properly nested blocks.
#[tokio::test]
async fn test_teamcity_end_to_end() {
    let source = StaticSource::from_json(DETAILS_JSON);
    let mut renderer = TaskOutputRenderer::new();
    let mut sink = TeamCitySink::new(Vec::new());

    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "##teamcity[blockOpened name='Success: Deploy']",
            "##teamcity[message text='Starting' status='NORMAL']",
            "##teamcity[blockOpened name='Success: Step 1']",
            "##teamcity[message text='Failed once but retried' status='ERROR']",
            "##teamcity[blockClosed name='Success: Step 1']",
            "##teamcity[blockClosed name='Success: Deploy']",
        ]
    );
}

/// Structured output emits one record per element and per log line.
#[tokio::test]
async fn test_structured_end_to_end() {
    let source = StaticSource::from_json(DETAILS_JSON);
    let details = source.get_details(&source.task()).await.unwrap();

    let buf = SharedBuf::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buf.clone())
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_level(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut renderer = TaskOutputRenderer::new();
        renderer.render_details(&details, &mut StructuredLogSink::new());
    });

    let out = buf.contents();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 4, "{out}");
    assert!(lines[0].contains("Success: Deploy"));
    assert!(lines[1].contains("Info       Starting"));
    assert!(lines[2].contains("Success: Step 1"));
    assert!(lines[2].contains("indent="));
    assert!(lines[3].contains("Failed once but retried"));
}

/// A second render of an unchanged, finished tree writes nothing.
#[tokio::test]
async fn test_repeated_render_is_idempotent() {
    let source = StaticSource::from_json(DETAILS_JSON);
    let mut renderer = TaskOutputRenderer::new();
    let buf = SharedBuf::default();
    let mut sink = TeamCitySink::new(buf.clone());

    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();
    let after_first = buf.contents();

    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();
    assert_eq!(buf.contents(), after_first);
}

/// A running parent holds back its finished child until the parent completes.
#[tokio::test]
async fn test_running_parent_delays_finished_child() {
    let source = StaticSource::from_json(DETAILS_JSON);
    let running = TaskDetails {
        task: Some(source.task()),
        activity_logs: Some(vec![ActivityElement::new(
            "ServerTasks-1",
            "Deploy Web to Production",
            ActivityStatus::Running,
        )
        .with_child(
            ActivityElement::new("ServerTasks-1_0", "Deploy", ActivityStatus::Running).with_child(
                ActivityElement::new("ServerTasks-1_0_0", "Step 1", ActivityStatus::Success)
                    .with_log(LogCategory::Info, "done"),
            ),
        )]),
    };
    source.replace(running);

    let mut renderer = TaskOutputRenderer::new();
    let buf = SharedBuf::default();
    let mut sink = ConsoleSink::new(buf.clone(), false, 120);

    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();
    assert!(buf.contents().is_empty());

    source.replace(serde_json::from_str(DETAILS_JSON).unwrap());
    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();

    let out = buf.contents();
    let parent = out.find("Success: Deploy").unwrap();
    let child = out.find("Success: Step 1").unwrap();
    assert!(parent < child);
}

/// Fetch errors come back to the caller untouched.
#[tokio::test]
async fn test_fetch_error_propagates() {
    let source = StaticSource::from_json(DETAILS_JSON);
    let mut renderer = TaskOutputRenderer::new();
    let mut sink = TeamCitySink::new(Vec::new());

    let err = renderer
        .render(&UnreachableSource, &source.task(), &mut sink)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "401 Unauthorized");
    assert!(sink.into_inner().is_empty());
}

/// Absent activity logs render nothing and are not an error.
#[tokio::test]
async fn test_missing_activity_logs_is_noop() {
    let source = StaticSource::from_json(DETAILS_JSON);
    source.replace(TaskDetails {
        task: Some(source.task()),
        activity_logs: None,
    });

    let mut renderer = TaskOutputRenderer::new();
    let mut sink = TeamCitySink::new(Vec::new());
    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();

    assert!(sink.into_inner().is_empty());
    assert_eq!(renderer.printed_count(), 0);
}

/// Unknown statuses and categories render with defaults instead of failing.
#[tokio::test]
async fn test_unknown_values_render_with_defaults() {
    let json = r#"{
        "Task": { "Id": "ServerTasks-2", "State": "Success", "IsCompleted": true },
        "ActivityLogs": [ { "Id": "c", "Status": "Success", "Children": [
            { "Id": "x", "Name": "Odd", "Status": "Quarantined",
              "LogElements": [ { "Category": "Mystery", "MessageText": "hm" } ] }
        ] } ]
    }"#;
    let source = StaticSource::from_json(json);
    let mut renderer = TaskOutputRenderer::new();
    let mut sink = TeamCitySink::new(Vec::new());

    renderer
        .render(&source, &source.task(), &mut sink)
        .await
        .unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    assert!(out.contains("blockOpened name='Quarantined: Odd'"));
    assert!(out.contains("message text='hm' status='NORMAL'"));
}

/// Block open/close messages balance for a deeper tree.
#[test]
fn test_teamcity_blocks_balance_for_deep_tree() {
    let leaf = |id: &str| ActivityElement::new(id, id, ActivityStatus::Success);
    let tree = ActivityElement::new("root", "root", ActivityStatus::Failed)
        .with_child(
            leaf("a")
                .with_child(leaf("a1").with_child(leaf("a1x")))
                .with_child(leaf("a2")),
        )
        .with_child(leaf("b"));

    let mut renderer = TaskOutputRenderer::new();
    let mut sink = TeamCitySink::new(Vec::new());
    renderer.render_tree(&[tree], &mut sink);

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let mut stack = Vec::new();
    for line in out.lines() {
        if let Some(name) = line.strip_prefix("##teamcity[blockOpened name='") {
            stack.push(name.to_string());
        } else if let Some(name) = line.strip_prefix("##teamcity[blockClosed name='") {
            assert_eq!(stack.pop().as_deref(), Some(name));
        }
    }
    assert!(stack.is_empty());
    assert_eq!(out.lines().count(), 12);
}

/// Separate renderers for separate tasks can run concurrently.
#[tokio::test]
async fn test_concurrent_renders_of_different_tasks() {
    let first = Arc::new(StaticSource::from_json(DETAILS_JSON));
    let second = Arc::new(StaticSource::from_json(DETAILS_JSON));

    let spawn = |source: Arc<StaticSource>| {
        tokio::spawn(async move {
            let mut renderer = TaskOutputRenderer::new();
            let mut sink = TeamCitySink::new(Vec::new());
            renderer
                .render(source.as_ref(), &source.task(), &mut sink)
                .await
                .unwrap();
            String::from_utf8(sink.into_inner()).unwrap()
        })
    };

    let (a, b) = tokio::join!(spawn(first), spawn(second));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a, b);
    assert_eq!(a.lines().count(), 6);
}
