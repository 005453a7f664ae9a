//! Cycle controller: scan → optional replication → health check → decide →
//! report.
//!
//! One invocation performs exactly one cycle; periodic execution belongs to
//! an external scheduler. Every branch records its outcome through the report
//! writer before the process exit code is decided; silent failure is a bug.

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::config::WardenConfig;
use crate::core::decision::{decide, exit_code_for};
use crate::core::types::{CycleOutcome, Decision, ReplicationOutcome};
use crate::health::{HealthRunner, HealthVerdict};
use crate::io::browser::{ScanRequest, Scanner};
use crate::io::git::Git;
use crate::io::governor::{ReplicationRequest, replicate};
use crate::io::report::{ReportPaths, append_cycle};

/// Result of one full cycle, plus the exit code it maps to.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub exit_code: i32,
}

/// Run one warden cycle with injected collaborators.
///
/// Scanning and replication failures degrade to recorded data; the only
/// fatal path is being unable to persist the cycle report.
#[instrument(skip_all, fields(target = %cfg.base_url))]
pub fn run_cycle(
    cfg: &WardenConfig,
    scanner: &dyn Scanner,
    health: &dyn HealthRunner,
) -> Result<CycleReport> {
    // SCANNING
    let scans = match scanner.scan(&scan_request(cfg)) {
        Ok(scans) => scans,
        Err(e) => {
            warn!(err = %e, "browser scan failed, continuing without page results");
            Vec::new()
        }
    };

    // REPLICATING (optional; outcome never blocks health checking)
    let replication = replication_step(cfg);

    // HEALTH_CHECKING
    let verdict = health.check(cfg);
    info!(passed = verdict.passed, detail = %verdict.detail, "health verdict");

    // DECIDING
    let mut decision = decide_step(cfg, &verdict);
    let mut rollback_failure = None;
    if decision == Decision::Rollback {
        // ROLLING_BACK: revert tracked and untracked changes. A failed
        // rollback degrades to NOOP so the cycle still reaches the report
        // writer; the failure is recorded, never swallowed.
        let git = Git::new(&cfg.repo_root);
        match git.rollback_working_tree() {
            Ok(()) => info!("working tree rolled back to last known-good state"),
            Err(e) => {
                warn!(err = %e, "rollback failed, leaving changes in place");
                rollback_failure = Some(format!("{e:#}"));
                decision = Decision::Noop;
            }
        }
    }

    let outcome = CycleOutcome {
        scans,
        health: verdict
            .summary
            .unwrap_or_else(|| failed_summary_placeholder(&verdict.detail)),
        replication,
        decision,
        rollback_failure,
    };

    // DONE: reporting happens on every branch.
    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let paths = ReportPaths::new(&cfg.reports_dir());
    append_cycle(&paths, &cfg.base_url, &timestamp, &outcome).context("append cycle reports")?;

    Ok(CycleReport {
        exit_code: exit_code_for(outcome.decision),
        outcome,
    })
}

fn scan_request(cfg: &WardenConfig) -> ScanRequest {
    ScanRequest {
        urls: cfg.scan_paths.iter().map(|path| cfg.url_for(path)).collect(),
        timeout: cfg.nav_timeout,
        screenshot_path: Some(cfg.logs_dir().join("current_state.png")),
    }
}

fn replication_step(cfg: &WardenConfig) -> Option<ReplicationOutcome> {
    if !cfg.allow_replication {
        return None;
    }
    let request = ReplicationRequest {
        root: cfg.agent_root.clone(),
        target_name: cfg.agent_name.clone(),
        max_agents: cfg.max_agents,
        dna_files: cfg
            .dna_files
            .iter()
            .map(|path| cfg.repo_root.join(path))
            .collect(),
        repo_root: cfg.repo_root.clone(),
        entry_point: std::env::current_exe()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|_| "warden".to_string()),
    };
    let outcome = replicate(true, &request);
    info!(
        attempted = outcome.attempted,
        succeeded = outcome.succeeded,
        reason = %outcome.reason,
        "replication step finished"
    );
    Some(outcome)
}

fn decide_step(cfg: &WardenConfig, verdict: &HealthVerdict) -> Decision {
    if verdict.passed {
        return decide(true, cfg.enable_rollback, false);
    }
    let dirty = if cfg.enable_rollback {
        let git = Git::new(&cfg.repo_root);
        match git.has_pending_changes() {
            Ok(dirty) => dirty,
            Err(e) => {
                // A broken worktree query degrades to NOOP; the cycle still
                // reports and exits unhealthy.
                warn!(err = %e, "could not query working tree, skipping rollback");
                false
            }
        }
    } else {
        false
    };
    decide(false, cfg.enable_rollback, dirty)
}

/// Stand-in summary when the subprocess produced no parseable checks.
fn failed_summary_placeholder(detail: &str) -> crate::core::types::HealthSummary {
    use crate::core::types::{CheckKind, CheckResult, HealthSummary};
    HealthSummary {
        passed: false,
        checks: vec![CheckResult {
            kind: CheckKind::Connectivity,
            target: None,
            passed: false,
            detail: detail.to_string(),
        }],
    }
}
