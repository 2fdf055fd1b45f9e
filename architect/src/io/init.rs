//! Project scaffolding for a fresh workspace.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::io::config::{WorkflowConfig, write_config};

const SAMPLE_DATA: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/jira_data.json"));

/// Create `architect.toml`, the backlog data file and the output directory
/// if missing.
///
/// With `force`, existing files are overwritten with the defaults.
pub fn init_project(root: &Path, force: bool) -> Result<()> {
    let config = WorkflowConfig::default();

    let config_path = root.join("architect.toml");
    if force || !config_path.exists() {
        write_config(&config_path, &config)?;
        info!(path = %config_path.display(), "wrote default config");
    }

    let data_path = root.join(&config.data_path);
    write_if_missing_or_force(&data_path, SAMPLE_DATA, force)?;

    let output_dir = root.join(&config.output_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("create output directory {}", output_dir.display()))?;

    Ok(())
}

fn write_if_missing_or_force(path: &Path, contents: &str, force: bool) -> Result<()> {
    if !force && path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "wrote file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::loader::load_backlog;

    #[test]
    fn init_scaffolds_config_and_loadable_sample_data() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_project(temp.path(), false).expect("init");

        assert!(temp.path().join("architect.toml").exists());
        assert!(temp.path().join("tmp").is_dir());

        let backlog = load_backlog(&temp.path().join("data/jira_data.json")).expect("load sample");
        assert!(!backlog.epics.is_empty());
    }

    #[test]
    fn init_without_force_keeps_existing_data() {
        let temp = tempfile::tempdir().expect("tempdir");
        let data_path = temp.path().join("data/jira_data.json");
        fs::create_dir_all(data_path.parent().unwrap()).expect("mkdir");
        fs::write(&data_path, "{\"epics\": []}").expect("write");

        init_project(temp.path(), false).expect("init");
        let contents = fs::read_to_string(&data_path).expect("read");
        assert_eq!(contents, "{\"epics\": []}");

        init_project(temp.path(), true).expect("init force");
        let contents = fs::read_to_string(&data_path).expect("read");
        assert_ne!(contents, "{\"epics\": []}");
    }
}
