//! End-to-end cycle scenarios with scripted collaborators and a real git
//! repository in a temp directory.

use std::fs;

use warden::config::WardenConfig;
use warden::core::types::{Decision, PageScanResult};
use warden::cycle::run_cycle;
use warden::exit_codes;
use warden::test_support::{FailingScanner, ScriptedHealthRunner, ScriptedScanner, TestRepo};

fn config_for(repo: &TestRepo) -> WardenConfig {
    WardenConfig {
        repo_root: repo.root().to_path_buf(),
        ..WardenConfig::default()
    }
}

fn one_page_scan() -> ScriptedScanner {
    let mut page = PageScanResult::new("http://localhost:3000");
    page.http_status = Some(200);
    page.console_messages.push("[log] booted".to_string());
    page.html_excerpt = "<html>ok</html>".to_string();
    ScriptedScanner { results: vec![page] }
}

#[test]
fn healthy_cycle_commits_and_reports_once() {
    let repo = TestRepo::new().expect("repo");
    let cfg = config_for(&repo);

    let report = run_cycle(&cfg, &one_page_scan(), &ScriptedHealthRunner::passing())
        .expect("cycle");

    assert_eq!(report.outcome.decision, Decision::Commit);
    assert_eq!(report.exit_code, exit_codes::OK);
    assert!(report.outcome.replication.is_none());

    let improvement = fs::read_to_string(repo.root().join("reports/improvement_report.md"))
        .expect("read improvement report");
    assert_eq!(improvement.matches("## Warden Scan").count(), 1);
    assert!(improvement.contains("http://localhost:3000"));

    let boss = fs::read_to_string(repo.root().join("reports/BOSS_LOG.md")).expect("read boss log");
    assert_eq!(boss.lines().count(), 1);
    assert!(boss.contains("health=pass"));
    assert!(boss.contains("errors=0"));
}

#[test]
fn unhealthy_cycle_with_rollback_reverts_the_working_tree() {
    let repo = TestRepo::new().expect("repo");
    let (tracked, untracked) = repo.make_dirty().expect("dirty");
    let cfg = WardenConfig {
        enable_rollback: true,
        ..config_for(&repo)
    };

    let report = run_cycle(
        &cfg,
        &one_page_scan(),
        &ScriptedHealthRunner::failing("host: HTTP 500 (expected 200)"),
    )
    .expect("cycle");

    assert_eq!(report.outcome.decision, Decision::Rollback);
    assert_eq!(report.exit_code, exit_codes::UNHEALTHY);
    // Tracked content is back to the committed state; the untracked
    // experiment is gone.
    assert_eq!(
        fs::read_to_string(&tracked).expect("read tracked"),
        "<html>known good</html>"
    );
    assert!(!untracked.exists());

    let boss = fs::read_to_string(repo.root().join("reports/BOSS_LOG.md")).expect("read boss log");
    assert!(boss.contains("health=fail"));
}

#[test]
fn failed_rollback_still_reports_and_exits_unhealthy() {
    let repo = TestRepo::new().expect("repo");
    let (tracked, untracked) = repo.make_dirty().expect("dirty");
    // A held index lock makes `git reset --hard` fail while `git status`
    // still answers.
    fs::write(repo.root().join(".git/index.lock"), "").expect("hold lock");
    let cfg = WardenConfig {
        enable_rollback: true,
        ..config_for(&repo)
    };

    let report = run_cycle(
        &cfg,
        &one_page_scan(),
        &ScriptedHealthRunner::failing("host: HTTP 500 (expected 200)"),
    )
    .expect("cycle");

    // The rollback did not happen, so the decision degrades and the changes
    // stay in place.
    assert_eq!(report.outcome.decision, Decision::Noop);
    assert_eq!(report.exit_code, exit_codes::UNHEALTHY);
    assert!(report.outcome.rollback_failure.is_some());
    assert_eq!(
        fs::read_to_string(&tracked).expect("read tracked"),
        "<html>experimental edit</html>"
    );
    assert!(untracked.exists());

    // Both logs still got their entry.
    let improvement = fs::read_to_string(repo.root().join("reports/improvement_report.md"))
        .expect("read improvement report");
    assert!(improvement.contains("**Rollback failed:**"));
    let boss = fs::read_to_string(repo.root().join("reports/BOSS_LOG.md")).expect("read boss log");
    assert_eq!(boss.lines().count(), 1);
    assert!(boss.contains("health=fail"));
}

#[test]
fn unhealthy_cycle_without_rollback_leaves_changes_in_place() {
    let repo = TestRepo::new().expect("repo");
    let (tracked, untracked) = repo.make_dirty().expect("dirty");
    let cfg = config_for(&repo);

    let report = run_cycle(
        &cfg,
        &one_page_scan(),
        &ScriptedHealthRunner::failing("host: load=9.00 exceeds threshold=4"),
    )
    .expect("cycle");

    assert_eq!(report.outcome.decision, Decision::Noop);
    assert_eq!(report.exit_code, exit_codes::UNHEALTHY);
    assert_eq!(
        fs::read_to_string(&tracked).expect("read tracked"),
        "<html>experimental edit</html>"
    );
    assert!(untracked.exists());
}

#[test]
fn unhealthy_cycle_with_clean_tree_is_a_noop() {
    let repo = TestRepo::new().expect("repo");
    let cfg = WardenConfig {
        enable_rollback: true,
        ..config_for(&repo)
    };

    let report = run_cycle(
        &cfg,
        &one_page_scan(),
        &ScriptedHealthRunner::failing("host: HTTP 503 (expected 200)"),
    )
    .expect("cycle");

    // Nothing to revert; rollback is not pretended.
    assert_eq!(report.outcome.decision, Decision::Noop);
    assert_eq!(report.exit_code, exit_codes::UNHEALTHY);
}

#[test]
fn scanner_failure_degrades_to_an_unavailable_scan_section() {
    let repo = TestRepo::new().expect("repo");
    let cfg = config_for(&repo);

    let report = run_cycle(&cfg, &FailingScanner, &ScriptedHealthRunner::passing())
        .expect("cycle");

    assert!(report.outcome.scans.is_empty());
    assert_eq!(report.outcome.decision, Decision::Commit);

    let improvement = fs::read_to_string(repo.root().join("reports/improvement_report.md"))
        .expect("read improvement report");
    assert!(improvement.contains("_Browser scan unavailable._"));
}

#[test]
fn failed_verdict_without_summary_still_reports_a_failed_check() {
    let repo = TestRepo::new().expect("repo");
    let cfg = config_for(&repo);

    let report = run_cycle(
        &cfg,
        &one_page_scan(),
        &ScriptedHealthRunner::failing("health check timed out after 120s"),
    )
    .expect("cycle");

    assert!(!report.outcome.health.passed);
    assert_eq!(report.outcome.health.checks.len(), 1);
    assert!(
        report.outcome.health.checks[0]
            .detail
            .contains("timed out")
    );

    let boss = fs::read_to_string(repo.root().join("reports/BOSS_LOG.md")).expect("read boss log");
    assert!(boss.contains("errors=1"));
}

#[test]
fn replication_step_records_an_outcome_when_enabled() {
    let repo = TestRepo::new().expect("repo");
    let agents = repo.root().join("agents");
    fs::create_dir(&agents).expect("mkdir");
    let cfg = WardenConfig {
        allow_replication: true,
        agent_root: agents.clone(),
        agent_name: "spawn-1".to_string(),
        dna_files: vec!["index.html".into()],
        ..config_for(&repo)
    };

    let report = run_cycle(&cfg, &one_page_scan(), &ScriptedHealthRunner::passing())
        .expect("cycle");

    let replication = report.outcome.replication.expect("replication outcome");
    assert!(replication.attempted);
    assert!(replication.succeeded, "reason: {}", replication.reason);
    assert!(agents.join("spawn-1/index.html").is_file());
    assert!(agents.join("spawn-1/start_agent.sh").is_file());
}
