//! Stable exit codes for warden commands.

/// Health passed; the pending-change commit step is authorized.
pub const OK: i32 = 0;
/// Health failed (rollback or noop), or the command itself errored.
pub const UNHEALTHY: i32 = 1;
