//! Agent-runner boundary and the process-backed implementation.
//!
//! The [`AgentRunner`] trait decouples workflow orchestration from the agent
//! backend. Tests use scripted runners that invoke tools directly without
//! spawning processes; [`ProcessRunner`] drives an external agent command
//! over newline-delimited JSON:
//!
//! - runner -> agent: one `{"type":"prompt","text":…}` line, then one reply
//!   line per tool call (`{"id":…,"ok":…,"value"|"error","kind"}`).
//! - agent -> runner: `text` lines (streamed to the sink), `tool_call` lines
//!   (dispatched through the [`Toolbox`]) and a final `done` line.
//!
//! Stdout lines that do not parse as events pass through to the sink as
//! plain streamed text. The event vocabulary is private to this
//! implementation; other runners may expose the tools however they like.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::agent::tools::Toolbox;
use crate::io::process::AgentSession;

/// Parameters for one agent run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Rendered instruction prompt.
    pub prompt: String,
    /// Working directory for the agent process.
    pub workdir: PathBuf,
    /// Wall-clock budget for the whole session.
    pub timeout: Duration,
    /// Truncate agent stderr kept in memory beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// What a finished run reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Agent-declared closing summary, if any.
    pub summary: Option<String>,
    /// Number of tool calls dispatched during the run.
    pub tool_calls: u64,
}

/// Abstraction over agent execution backends.
pub trait AgentRunner {
    /// Drive one agent session: stream output text to `sink`, dispatch tool
    /// calls through `tools`.
    fn run(
        &self,
        request: &RunRequest,
        tools: &Toolbox,
        sink: &mut dyn Write,
    ) -> Result<RunOutcome>;
}

/// One stdout line from the agent process.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AgentEvent {
    Text {
        text: String,
    },
    ToolCall {
        id: u64,
        tool: String,
        #[serde(default)]
        args: Value,
    },
    Done {
        #[serde(default)]
        summary: Option<String>,
    },
}

#[derive(Debug, Serialize)]
struct PromptMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct ToolReply<'a> {
    id: u64,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'a str>,
}

/// Runner that spawns a configured external agent command.
pub struct ProcessRunner {
    command: Vec<String>,
}

impl ProcessRunner {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl AgentRunner for ProcessRunner {
    fn run(
        &self,
        request: &RunRequest,
        tools: &Toolbox,
        sink: &mut dyn Write,
    ) -> Result<RunOutcome> {
        info!(workdir = %request.workdir.display(), "starting agent session");
        let mut session = AgentSession::spawn(
            &self.command,
            &request.workdir,
            request.timeout,
            request.output_limit_bytes,
        )?;

        let prompt = serde_json::to_string(&PromptMessage {
            kind: "prompt",
            text: &request.prompt,
        })
        .context("serialize prompt message")?;
        session.send_line(&prompt)?;

        let mut summary = None;
        let mut tool_calls = 0u64;
        let mut done = false;

        while let Some(line) = session.next_line()? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let event = match serde_json::from_str::<AgentEvent>(trimmed) {
                Ok(event) => event,
                Err(_) => {
                    // Plain output from the agent, stream it through.
                    writeln!(sink, "{line}").context("write to output sink")?;
                    continue;
                }
            };
            match event {
                AgentEvent::Text { text } => {
                    writeln!(sink, "{text}").context("write to output sink")?;
                }
                AgentEvent::ToolCall { id, tool, args } => {
                    tool_calls += 1;
                    let reply = match tools.dispatch(&tool, &args) {
                        Ok(value) => ToolReply {
                            id,
                            ok: true,
                            value: Some(value),
                            error: None,
                            kind: None,
                        },
                        Err(err) => {
                            warn!(tool = %tool, kind = err.kind(), "tool call failed: {err}");
                            ToolReply {
                                id,
                                ok: false,
                                value: None,
                                error: Some(err.to_string()),
                                kind: Some(err.kind()),
                            }
                        }
                    };
                    let reply =
                        serde_json::to_string(&reply).context("serialize tool reply")?;
                    session.send_line(&reply)?;
                }
                AgentEvent::Done { summary: s } => {
                    debug!("agent declared done");
                    summary = s;
                    done = true;
                    break;
                }
            }
        }

        let output = session.finish()?;
        if output.timed_out {
            return Err(anyhow!("agent timed out after {:?}", request.timeout));
        }
        if !done && !output.status.success() {
            return Err(anyhow!(
                "agent exited with status {:?}: {}",
                output.status.code(),
                output.stderr_lossy()
            ));
        }
        if !done {
            warn!("agent stream ended without a done event");
        }

        info!(tool_calls, "agent session finished");
        Ok(RunOutcome {
            summary,
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tools::{BacklogTool, WriteFileTool};
    use std::fs;

    fn sh_runner(script: &str) -> ProcessRunner {
        ProcessRunner::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
        ])
    }

    fn request(workdir: PathBuf) -> RunRequest {
        RunRequest {
            prompt: "analyze".to_string(),
            workdir,
            timeout: Duration::from_secs(10),
            output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn tool_call_events_parse_from_tagged_json() {
        let event: AgentEvent = serde_json::from_str(
            r#"{"type":"tool_call","id":3,"tool":"load_backlog","args":{}}"#,
        )
        .expect("parse");
        assert!(matches!(event, AgentEvent::ToolCall { id: 3, .. }));

        let event: AgentEvent =
            serde_json::from_str(r#"{"type":"done"}"#).expect("parse bare done");
        assert_eq!(event, AgentEvent::Done { summary: None });
    }

    /// Full session against a scripted shell agent: reads the prompt, emits
    /// text, calls a tool, reads the reply, declares done.
    #[test]
    fn process_runner_streams_text_and_dispatches_tools() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut tools = Toolbox::new();
        tools
            .register(WriteFileTool::new(temp.path().join("out")))
            .expect("register");

        let script = r##"
read prompt
echo '{"type":"text","text":"analyzing"}'
echo '{"type":"tool_call","id":1,"tool":"write_file","args":{"file_name":"report.md","contents":"# done"}}'
read reply
case "$reply" in *'"ok":true'*) ;; *) exit 1 ;; esac
echo '{"type":"done","summary":"wrote report"}'
"##;
        let mut sink = Vec::new();
        let outcome = sh_runner(script)
            .run(&request(temp.path().to_path_buf()), &tools, &mut sink)
            .expect("run");

        assert_eq!(outcome.summary.as_deref(), Some("wrote report"));
        assert_eq!(outcome.tool_calls, 1);
        assert_eq!(String::from_utf8(sink).expect("utf8"), "analyzing\n");
        let report = fs::read_to_string(temp.path().join("out/report.md")).expect("read");
        assert_eq!(report, "# done");
    }

    /// Tool failures are reported back to the agent with their kind, not
    /// swallowed; the run itself still completes.
    #[test]
    fn tool_failures_are_replied_with_kind() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut tools = Toolbox::new();
        tools
            .register(BacklogTool::new(temp.path().join("absent.json")))
            .expect("register");

        let script = r#"
read prompt
echo '{"type":"tool_call","id":1,"tool":"load_backlog","args":{}}'
read reply
case "$reply" in *'"kind":"not_found"'*) echo '{"type":"done","summary":"saw failure"}' ;; *) exit 1 ;; esac
"#;
        let mut sink = Vec::new();
        let outcome = sh_runner(script)
            .run(&request(temp.path().to_path_buf()), &tools, &mut sink)
            .expect("run");
        assert_eq!(outcome.summary.as_deref(), Some("saw failure"));
    }

    #[test]
    fn non_json_lines_pass_through_to_the_sink() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tools = Toolbox::new();

        let script = r#"
read prompt
echo 'plain progress line'
echo '{"type":"done"}'
"#;
        let mut sink = Vec::new();
        sh_runner(script)
            .run(&request(temp.path().to_path_buf()), &tools, &mut sink)
            .expect("run");
        assert_eq!(
            String::from_utf8(sink).expect("utf8"),
            "plain progress line\n"
        );
    }

    #[test]
    fn failing_agent_without_done_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tools = Toolbox::new();

        let script = r#"
read prompt
echo boom >&2
exit 7
"#;
        let mut sink = Vec::new();
        let err = sh_runner(script)
            .run(&request(temp.path().to_path_buf()), &tools, &mut sink)
            .unwrap_err();
        assert!(err.to_string().contains("status"), "got {err:#}");
    }
}
