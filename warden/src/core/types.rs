//! Shared data contracts for one warden cycle.
//!
//! These types are the stable boundary between components: every probe, scan
//! and replication attempt is captured as data here, never as a raised error.

use serde::{Deserialize, Serialize};

/// Category of an individual health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Connectivity,
    Asset,
    SystemLoad,
}

/// Outcome of a single health check. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(rename = "check")]
    pub kind: CheckKind,
    /// Probed URL; absent for host-local checks such as system load.
    #[serde(rename = "url", skip_serializing_if = "Option::is_none", default)]
    pub target: Option<String>,
    pub passed: bool,
    pub detail: String,
}

/// Aggregate of all health checks for one cycle.
///
/// This is also the JSON wire contract emitted by the health subprocess:
/// `{ "passed": bool, "checks": [...] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub passed: bool,
    pub checks: Vec<CheckResult>,
}

impl HealthSummary {
    /// Build a summary; `passed` is the AND over all individual checks.
    pub fn from_checks(checks: Vec<CheckResult>) -> Self {
        let passed = checks.iter().all(|c| c.passed);
        Self { passed, checks }
    }

    /// Check results that did not pass, in original order.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.passed)
    }
}

/// What a headless-browser visit to one page produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageScanResult {
    pub url: String,
    /// HTTP status of the main document, if navigation produced one.
    pub http_status: Option<u16>,
    /// Console messages in emission order, tagged `[severity] text`.
    pub console_messages: Vec<String>,
    /// Uncaught page errors plus navigation failures.
    pub errors: Vec<String>,
    /// Bounded excerpt of the rendered document.
    pub html_excerpt: String,
}

impl PageScanResult {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_status: None,
            console_messages: Vec::new(),
            errors: Vec::new(),
            html_excerpt: String::new(),
        }
    }
}

/// Result of a guarded replication attempt. Logged, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationOutcome {
    pub attempted: bool,
    pub succeeded: bool,
    pub reason: String,
}

impl ReplicationOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            attempted: false,
            succeeded: false,
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            attempted: true,
            succeeded: false,
            reason: reason.into(),
        }
    }

    pub fn completed(reason: impl Into<String>) -> Self {
        Self {
            attempted: true,
            succeeded: true,
            reason: reason.into(),
        }
    }
}

/// Terminal decision of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    /// Health passed; pending changes may be committed by the external step.
    Commit,
    /// Health failed and the working tree was reverted.
    Rollback,
    /// Health failed; changes left in place for manual inspection.
    Noop,
}

/// Root aggregate for one warden invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleOutcome {
    pub scans: Vec<PageScanResult>,
    pub health: HealthSummary,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replication: Option<ReplicationOutcome>,
    pub decision: Decision,
    /// Why an intended rollback did not happen (index lock, read-only tree).
    /// The decision degrades to NOOP and the cycle still reports.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rollback_failure: Option<String>,
}
