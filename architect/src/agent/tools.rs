//! Tools exposed to the agent runner.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::core::error::LoadError;
use crate::io::loader::load_backlog;

/// Failure kinds surfaced by tool invocation. Never swallowed: the runner
/// reports these back to the agent with their kind.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool '{0}' already registered")]
    Duplicate(String),

    #[error("tool name must not be empty")]
    EmptyName,

    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArgs { tool: String, reason: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Stable lowercase kind name for tool replies.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::Duplicate(_) | ToolError::EmptyName => "registration",
            ToolError::InvalidArgs { .. } => "invalid_args",
            ToolError::Load(err) => err.kind(),
            ToolError::Io { .. } => "io",
        }
    }
}

/// A capability the runner may invoke on behalf of the agent.
pub trait Tool {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    fn invoke(&self, args: &Value) -> Result<Value, ToolError>;
}

/// Name, description and parameter schema of a registered tool, as rendered
/// into the instruction prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// The registered tools for one workflow run.
#[derive(Default)]
pub struct Toolbox {
    tools: Vec<Box<dyn Tool>>,
}

impl Toolbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Empty and duplicate names are rejected.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<(), ToolError> {
        let name = tool.name().trim();
        if name.is_empty() {
            return Err(ToolError::EmptyName);
        }
        if self.tools.iter().any(|t| t.name() == name) {
            return Err(ToolError::Duplicate(name.to_string()));
        }
        self.tools.push(Box::new(tool));
        Ok(())
    }

    /// Route a call to the named tool.
    pub fn dispatch(&self, name: &str, args: &Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        debug!(tool = name, "dispatching tool call");
        tool.invoke(args)
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }
}

/// Loads the backlog data file and returns the whole tree as JSON.
///
/// Takes no arguments. Each invocation re-reads the file, so the agent always
/// sees the current contents.
pub struct BacklogTool {
    data_path: PathBuf,
}

impl BacklogTool {
    pub fn new(data_path: PathBuf) -> Self {
        Self { data_path }
    }
}

impl Tool for BacklogTool {
    fn name(&self) -> &str {
        "load_backlog"
    }

    fn description(&self) -> &str {
        "Load the project backlog (epics, stories and tasks) from the Jira data file."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        })
    }

    fn invoke(&self, _args: &Value) -> Result<Value, ToolError> {
        let backlog = load_backlog(&self.data_path)?;
        Ok(serde_json::to_value(backlog).expect("backlog serializes to JSON"))
    }
}

/// Writes a named text file under a sandboxed base directory.
///
/// File names must be relative and must not escape the base directory.
/// Concurrent writes to the same file name are the caller's problem to
/// serialize.
pub struct WriteFileTool {
    base_dir: PathBuf,
}

impl WriteFileTool {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn sandboxed_path(&self, file_name: &str) -> Result<PathBuf, ToolError> {
        let invalid = |reason: &str| ToolError::InvalidArgs {
            tool: "write_file".to_string(),
            reason: reason.to_string(),
        };
        if file_name.trim().is_empty() {
            return Err(invalid("file_name must not be empty"));
        }
        let relative = Path::new(file_name);
        if relative.is_absolute() {
            return Err(invalid("file_name must be relative"));
        }
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => return Err(invalid("file_name must not traverse outside the output directory")),
            }
        }
        Ok(self.base_dir.join(relative))
    }
}

impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write a text file under the analysis output directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["file_name", "contents"],
            "properties": {
                "file_name": {
                    "type": "string",
                    "description": "File name relative to the output directory, e.g. requirements_analysis.md"
                },
                "contents": { "type": "string" }
            }
        })
    }

    fn invoke(&self, args: &Value) -> Result<Value, ToolError> {
        let str_arg = |key: &str| -> Result<&str, ToolError> {
            args.get(key)
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::InvalidArgs {
                    tool: "write_file".to_string(),
                    reason: format!("missing string argument '{key}'"),
                })
        };
        let file_name = str_arg("file_name")?;
        let contents = str_arg("contents")?;

        let path = self.sandboxed_path(file_name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ToolError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, contents).map_err(|source| ToolError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(path = %path.display(), bytes = contents.len(), "wrote file");
        Ok(json!({
            "path": path.display().to_string(),
            "bytes": contents.len(),
        }))
    }
}
