//! Tool surface and the agent-runner boundary.
//!
//! The core exposes exactly two capabilities to whatever runner drives the
//! model: a backlog-loading tool and a sandboxed file-write tool. How a
//! runner discovers and invokes them is its own business; tests use scripted
//! runners that never spawn a process.

pub mod runner;
pub mod tools;
