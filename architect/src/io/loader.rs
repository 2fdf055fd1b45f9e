//! Backlog load with schema validation.
//!
//! Each call re-reads and re-parses the data file from scratch; no state is
//! retained between calls, so repeated loads are idempotent and observe
//! external replacement of the file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use jsonschema::validator_for;
use serde_json::Value;
use tracing::debug;

use crate::core::error::LoadError;
use crate::core::model::Backlog;

const V1_SCHEMA: &str = include_str!("../../schemas/backlog/v1.schema.json");

/// Load and validate the backlog document at `path`.
///
/// Validation is eager: the whole tree is checked against the embedded schema
/// before anything is handed to the caller. Failures are classified by
/// [`LoadError`] kind (missing file, unreadable file, malformed JSON,
/// schema violation).
pub fn load_backlog(path: &Path) -> Result<Backlog, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::NotFound {
            path: path.to_path_buf(),
        },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;

    let value: Value = serde_json::from_str(&contents).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    validate_schema(&value)?;

    // Residual mismatches (the schema and the structs are maintained
    // together, so this normally cannot fire) still classify as validation.
    let backlog: Backlog = serde_json::from_value(value).map_err(|err| LoadError::Validation {
        violations: vec![err.to_string()],
    })?;

    debug!(
        epics = backlog.epics.len(),
        stories = backlog.story_count(),
        tasks = backlog.task_count(),
        "loaded backlog"
    );
    Ok(backlog)
}

/// Validate a parsed document against the embedded backlog schema, collecting
/// every violation with its instance path.
fn validate_schema(instance: &Value) -> Result<(), LoadError> {
    let schema: Value =
        serde_json::from_str(V1_SCHEMA).expect("embedded backlog schema should be valid JSON");
    let compiled = validator_for(&schema).expect("embedded backlog schema should compile");

    let violations: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| {
            let path = err.instance_path().to_string();
            if path.is_empty() {
                err.to_string()
            } else {
                format!("{path}: {err}")
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LoadError::Validation { violations })
    }
}
