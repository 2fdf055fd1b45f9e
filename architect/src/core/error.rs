//! Failure classification for backlog loading.

use std::path::PathBuf;

use thiserror::Error;

/// Failure kinds surfaced by [`crate::io::loader::load_backlog`].
///
/// Callers match on the variant to tell a missing data file apart from
/// unreadable, syntactically malformed, or schema-invalid content. Nothing is
/// retried or recovered internally.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The backlog file does not exist at the expected path.
    #[error("backlog file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read (permissions, transient
    /// filesystem failure).
    #[error("read backlog file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file contents are not syntactically valid JSON.
    #[error("invalid JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The parsed document does not match the backlog schema. Each violation
    /// is prefixed with the instance path of the offending field.
    #[error("backlog validation failed:\n- {}", .violations.join("\n- "))]
    Validation { violations: Vec<String> },
}

impl LoadError {
    /// Stable lowercase kind name, used in logs and tool replies.
    pub fn kind(&self) -> &'static str {
        match self {
            LoadError::NotFound { .. } => "not_found",
            LoadError::Io { .. } => "io",
            LoadError::Parse { .. } => "parse",
            LoadError::Validation { .. } => "validation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_each_violation() {
        let err = LoadError::Validation {
            violations: vec![
                "/epics/0: \"stories\" is a required property".to_string(),
                "/epics/1/epic_id: 7 is not of type \"string\"".to_string(),
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("/epics/0"));
        assert!(rendered.contains("/epics/1/epic_id"));
    }

    #[test]
    fn kinds_are_distinct() {
        let not_found = LoadError::NotFound {
            path: "data/jira_data.json".into(),
        };
        let validation = LoadError::Validation { violations: vec![] };
        assert_eq!(not_found.kind(), "not_found");
        assert_eq!(validation.kind(), "validation");
        assert_ne!(not_found.kind(), validation.kind());
    }
}
