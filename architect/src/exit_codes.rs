//! Stable exit codes for architect CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Command failed: invalid config, invalid backlog data, or a failed run.
pub const INVALID: i32 = 1;
/// The backlog data file does not exist at the configured path.
pub const MISSING_DATA: i32 = 2;
