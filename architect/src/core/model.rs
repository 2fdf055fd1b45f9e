//! Backlog tree: epics containing stories containing tasks.
//!
//! The tree is read-only output of the loader. Identifiers are opaque
//! strings; uniqueness and cross-references are not checked. List fields are
//! required in the source document and are never defaulted to empty.

use serde::{Deserialize, Serialize};

/// Smallest unit of implementation work under a story.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub task_id: String,
    pub summary: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub priority: String,
    pub status: String,
    pub assignee: String,
    pub reporter: String,
    pub created: String,
    pub updated: String,
}

/// User-facing requirement with acceptance criteria and implementation tasks.
///
/// `dependencies` holds story ids and may reference ids absent from the
/// dataset; the loader preserves such entries verbatim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Story {
    pub story_id: String,
    pub name: String,
    pub description: String,
    pub acceptance_criteria: Vec<String>,
    pub technical_notes: Vec<String>,
    pub dependencies: Vec<String>,
    pub effort: String,
    pub tasks: Vec<Task>,
}

/// Top-level grouping of related stories around a feature or objective.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Epic {
    pub epic_id: String,
    pub name: String,
    pub description: String,
    pub key_objectives: Vec<String>,
    pub stories: Vec<Story>,
}

/// Complete loaded tree, the sole output of the loader.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Backlog {
    pub epics: Vec<Epic>,
}

impl Backlog {
    pub fn story_count(&self) -> usize {
        self.epics.iter().map(|epic| epic.stories.len()).sum()
    }

    pub fn task_count(&self) -> usize {
        self.epics
            .iter()
            .flat_map(|epic| epic.stories.iter())
            .map(|story| story.tasks.len())
            .sum()
    }
}
