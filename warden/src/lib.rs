//! Autonomous site warden: scan, health-check, and guarded self-replication.
//!
//! One invocation performs exactly one monitoring cycle against a running
//! site: a headless-browser scan captures console output and page errors, a
//! deep health check (run as an isolated subprocess) gates the outcome, an
//! optional population-governed replication step propagates the agent, and
//! the cycle ends by appending to two persisted reports and deciding whether
//! pending working-tree changes may be committed or must be rolled back.
//!
//! The architecture separates:
//!
//! - **[`core`]**: pure, deterministic logic (data contracts, the
//!   commit/rollback decision, path containment). No I/O.
//! - **[`io`]**: side-effecting adapters (network probes, headless browser,
//!   subprocesses, git, report files), each behind a seam that tests can
//!   script.
//!
//! [`cycle`] and [`health`] coordinate core logic with I/O to implement the
//! CLI commands.

pub mod config;
pub mod core;
pub mod cycle;
pub mod exit_codes;
pub mod health;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
