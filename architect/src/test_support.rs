//! Shared fixtures for tests: canned backlog trees and a scripted runner.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;

use crate::agent::runner::{AgentRunner, RunOutcome, RunRequest};
use crate::agent::tools::Toolbox;
use crate::core::model::{Backlog, Epic, Story, Task};

pub fn task(id: &str) -> Task {
    Task {
        task_id: id.to_string(),
        summary: format!("Task {id}"),
        description: format!("Do the work for {id}."),
        acceptance_criteria: vec!["It works".to_string()],
        priority: "Medium".to_string(),
        status: "To Do".to_string(),
        assignee: "Unassigned".to_string(),
        reporter: "qa".to_string(),
        created: "2025-11-01T08:00:00Z".to_string(),
        updated: "2025-11-01T08:00:00Z".to_string(),
    }
}

pub fn story(id: &str, tasks: Vec<Task>) -> Story {
    Story {
        story_id: id.to_string(),
        name: format!("Story {id}"),
        description: format!("As a user, I want {id}."),
        acceptance_criteria: vec!["Accepted".to_string()],
        technical_notes: vec![],
        dependencies: vec![],
        effort: "S".to_string(),
        tasks,
    }
}

pub fn epic(id: &str, stories: Vec<Story>) -> Epic {
    Epic {
        epic_id: id.to_string(),
        name: format!("Epic {id}"),
        description: format!("Everything under {id}."),
        key_objectives: vec![],
        stories,
    }
}

/// One epic `E1` with empty objectives, one story `S1` depending on the
/// nonexistent `S0`, one task `T1`.
pub fn sample_backlog() -> Backlog {
    let mut s1 = story("S1", vec![task("T1")]);
    s1.dependencies = vec!["S0".to_string()];
    Backlog {
        epics: vec![epic("E1", vec![s1])],
    }
}

/// Write `backlog` as pretty JSON to `dir/jira_data.json`.
pub fn write_backlog(dir: &Path, backlog: &Backlog) -> PathBuf {
    let path = dir.join("jira_data.json");
    let mut buf = serde_json::to_string_pretty(backlog).expect("serialize backlog");
    buf.push('\n');
    fs::write(&path, buf).expect("write backlog fixture");
    path
}

/// One step a [`ScriptedRunner`] replays.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Stream a line of text to the sink.
    Text(String),
    /// Dispatch a tool call through the toolbox.
    Call { tool: String, args: Value },
    /// Declare the run finished with an optional summary.
    Done(Option<String>),
}

/// Runner that replays a fixed script without spawning a process.
pub struct ScriptedRunner {
    script: Vec<ScriptStep>,
}

impl ScriptedRunner {
    pub fn new(script: Vec<ScriptStep>) -> Self {
        Self { script }
    }
}

impl AgentRunner for ScriptedRunner {
    fn run(
        &self,
        _request: &RunRequest,
        tools: &Toolbox,
        sink: &mut dyn Write,
    ) -> Result<RunOutcome> {
        let mut summary = None;
        let mut tool_calls = 0u64;
        for step in &self.script {
            match step {
                ScriptStep::Text(text) => writeln!(sink, "{text}")?,
                ScriptStep::Call { tool, args } => {
                    tool_calls += 1;
                    tools.dispatch(tool, args)?;
                }
                ScriptStep::Done(s) => {
                    summary = s.clone();
                    break;
                }
            }
        }
        Ok(RunOutcome {
            summary,
            tool_calls,
        })
    }
}
