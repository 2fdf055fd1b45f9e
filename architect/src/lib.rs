//! Backlog-driven requirements-analysis agent.
//!
//! Loads a Jira-style backlog dataset (epics containing stories containing
//! tasks), validates it against an embedded schema, and drives a single
//! external LLM agent equipped with two tools — a backlog loader and a
//! sandboxed file writer — to produce a markdown requirements-analysis
//! report. The architecture keeps a strict separation:
//!
//! - **[`core`]**: pure data model and error taxonomy. No I/O, fully
//!   testable in isolation.
//! - **[`io`]**: side-effecting operations (loading, config, prompt
//!   rendering, process execution).
//! - **[`agent`]**: the tool surface and the runner boundary behind which
//!   the actual model backend lives.
//!
//! [`workflow`] coordinates core logic with I/O to implement the CLI
//! commands.

pub mod agent;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
