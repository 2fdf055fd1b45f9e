//! Workflow configuration stored at `architect.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Workflow configuration (TOML).
///
/// This file is intended to be edited by humans. Missing fields default to
/// values that make a fresh checkout runnable without any configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Backlog data file, relative to the project root.
    pub data_path: PathBuf,

    /// Sandboxed directory the file-write tool may write under.
    pub output_dir: PathBuf,

    /// Conventional name of the analysis report the agent must produce.
    pub report_filename: String,

    /// Wall-clock budget for one agent run in seconds.
    pub run_timeout_secs: u64,

    /// Truncate agent stderr kept in memory beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Byte budget for the rendered instruction prompt.
    pub prompt_budget_bytes: usize,

    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Command to spawn as the external agent process (argv form).
    pub command: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: vec!["architect-agent".to_string()],
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/jira_data.json"),
            output_dir: PathBuf::from("tmp"),
            report_filename: "requirements_analysis.md".to_string(),
            run_timeout_secs: 15 * 60,
            output_limit_bytes: 100_000,
            prompt_budget_bytes: 24_000,
            agent: AgentConfig::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_path.as_os_str().is_empty() {
            return Err(anyhow!("data_path must not be empty"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must not be empty"));
        }
        if self.report_filename.trim().is_empty() {
            return Err(anyhow!("report_filename must not be empty"));
        }
        if self.run_timeout_secs == 0 {
            return Err(anyhow!("run_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("prompt_budget_bytes must be > 0"));
        }
        if self.agent.command.is_empty() || self.agent.command[0].trim().is_empty() {
            return Err(anyhow!("agent.command must be a non-empty array"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `WorkflowConfig::default()`.
pub fn load_config(path: &Path) -> Result<WorkflowConfig> {
    if !path.exists() {
        let cfg = WorkflowConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: WorkflowConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &WorkflowConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, WorkflowConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("architect.toml");
        let mut cfg = WorkflowConfig::default();
        cfg.agent.command = vec!["sh".to_string(), "-c".to_string(), "true".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("architect.toml");
        fs::write(&path, "run_timeout_secs = 60\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.run_timeout_secs, 60);
        assert_eq!(cfg.report_filename, "requirements_analysis.md");
    }

    #[test]
    fn empty_agent_command_is_rejected() {
        let cfg = WorkflowConfig {
            agent: AgentConfig { command: vec![] },
            ..WorkflowConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = WorkflowConfig {
            run_timeout_secs: 0,
            ..WorkflowConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
