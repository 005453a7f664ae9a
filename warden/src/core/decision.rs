//! Pure commit/rollback decision rules and boss-log error counting.

use crate::core::types::{CycleOutcome, Decision, HealthSummary, PageScanResult};
use crate::exit_codes;

/// Decide the terminal state of a cycle.
///
/// COMMIT is only reachable when health passed. ROLLBACK additionally requires
/// that rollback is enabled and the working tree actually has pending changes;
/// otherwise a failed cycle is a NOOP so operators can inspect the tree.
pub fn decide(health_passed: bool, rollback_enabled: bool, worktree_dirty: bool) -> Decision {
    if health_passed {
        return Decision::Commit;
    }
    if rollback_enabled && worktree_dirty {
        return Decision::Rollback;
    }
    Decision::Noop
}

/// Process exit code for a decision: `0` commit, `1` otherwise.
pub fn exit_code_for(decision: Decision) -> i32 {
    match decision {
        Decision::Commit => exit_codes::OK,
        Decision::Rollback | Decision::Noop => exit_codes::UNHEALTHY,
    }
}

/// Error count recorded in the boss log: failed health checks plus page
/// errors across all scans.
pub fn error_count(health: &HealthSummary, scans: &[PageScanResult]) -> usize {
    let failed_checks = health.failures().count();
    let page_errors: usize = scans.iter().map(|scan| scan.errors.len()).sum();
    failed_checks + page_errors
}

/// Convenience wrapper over a full cycle outcome.
pub fn cycle_error_count(outcome: &CycleOutcome) -> usize {
    error_count(&outcome.health, &outcome.scans)
}
