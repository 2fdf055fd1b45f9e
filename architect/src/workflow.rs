//! Orchestration of one requirements-analysis run.
//!
//! Coordinates config, prompt building, tools and the agent runner. The
//! runner does the actual model work; this module only wires the pieces
//! together and reports what came out.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::agent::runner::{AgentRunner, RunRequest};
use crate::agent::tools::{BacklogTool, Toolbox, WriteFileTool};
use crate::core::error::LoadError;
use crate::io::config::WorkflowConfig;
use crate::io::loader::load_backlog;
use crate::io::prompt::{PromptBuilder, PromptInputs};

/// Instruction used when the caller supplies no request of their own.
pub const DEFAULT_INPUT: &str = "Analyze requirements for project";

/// What one workflow run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    /// Path of the analysis report, if the agent wrote it.
    pub report_path: Option<PathBuf>,
    /// Agent-declared closing summary, if any.
    pub summary: Option<String>,
    pub tool_calls: u64,
}

/// Run the requirements-analysis workflow rooted at `root`.
///
/// Builds the toolbox (backlog loader on the configured data path, file
/// writer sandboxed to the configured output directory), renders the
/// instruction prompt and hands both to `runner`, streaming agent output to
/// `sink`.
pub fn run_workflow(
    root: &Path,
    input: &str,
    config: &WorkflowConfig,
    runner: &dyn AgentRunner,
    sink: &mut dyn Write,
) -> Result<WorkflowOutcome> {
    let data_path = root.join(&config.data_path);
    let output_dir = root.join(&config.output_dir);

    let mut tools = Toolbox::new();
    tools.register(BacklogTool::new(data_path.clone()))?;
    tools.register(WriteFileTool::new(output_dir.clone()))?;

    let pack = PromptBuilder::new(config.prompt_budget_bytes).build_analyst(&PromptInputs {
        project_input: input.to_string(),
        report_filename: config.report_filename.clone(),
        tools: tools.specs(),
    });

    let request = RunRequest {
        prompt: pack.render(),
        workdir: root.to_path_buf(),
        timeout: Duration::from_secs(config.run_timeout_secs),
        output_limit_bytes: config.output_limit_bytes,
    };

    info!(
        data_path = %data_path.display(),
        output_dir = %output_dir.display(),
        "running requirements analysis"
    );
    let outcome = runner.run(&request, &tools, sink)?;

    let report_path = output_dir.join(&config.report_filename);
    let report_path = if report_path.exists() {
        Some(report_path)
    } else {
        warn!(
            report = %config.report_filename,
            "agent finished without writing the report"
        );
        None
    };

    Ok(WorkflowOutcome {
        report_path,
        summary: outcome.summary,
        tool_calls: outcome.tool_calls,
    })
}

/// Counts reported by `architect validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSummary {
    pub epics: usize,
    pub stories: usize,
    pub tasks: usize,
}

/// Load and validate the configured backlog file, returning tree counts.
pub fn validate_data(root: &Path, config: &WorkflowConfig) -> Result<DataSummary, LoadError> {
    let backlog = load_backlog(&root.join(&config.data_path))?;
    Ok(DataSummary {
        epics: backlog.epics.len(),
        stories: backlog.story_count(),
        tasks: backlog.task_count(),
    })
}
