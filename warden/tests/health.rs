//! Subprocess health-runner scenarios against real (scripted) child
//! processes.

#![cfg(unix)]

use std::time::Duration;

use warden::config::WardenConfig;
use warden::health::{HealthRunner, SubprocessHealthRunner};

fn runner_for_script(script: &str) -> SubprocessHealthRunner {
    SubprocessHealthRunner {
        command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
    }
}

#[test]
fn valid_passing_summary_yields_a_passing_verdict() {
    let runner = runner_for_script(
        r#"printf '{"passed": true, "checks": [{"check": "connectivity", "url": "http://site", "passed": true, "detail": "HTTP 200"}]}'"#,
    );

    let verdict = runner.check(&WardenConfig::default());

    assert!(verdict.passed);
    assert_eq!(verdict.detail, "all checks passed");
    let summary = verdict.summary.expect("summary");
    assert_eq!(summary.checks.len(), 1);
}

#[test]
fn failing_summary_details_name_each_failed_target() {
    let runner = runner_for_script(
        r#"printf '{"passed": false, "checks": [{"check": "asset", "url": "http://site/app.js", "passed": false, "detail": "HTTP 404 (expected 200)"}, {"check": "system_load", "passed": false, "detail": "load=9.00 exceeds threshold=4"}]}'; exit 1"#,
    );

    let verdict = runner.check(&WardenConfig::default());

    assert!(!verdict.passed);
    assert!(verdict.detail.contains("http://site/app.js: HTTP 404"));
    assert!(verdict.detail.contains("host: load=9.00"));
    assert!(verdict.summary.is_some());
}

#[test]
fn garbage_output_yields_a_failed_verdict_with_stderr_context() {
    let runner = runner_for_script("echo 'panic: everything is on fire' >&2; exit 7");

    let verdict = runner.check(&WardenConfig::default());

    assert!(!verdict.passed);
    assert!(verdict.summary.is_none());
    assert!(verdict.detail.contains("no valid summary"));
    assert!(verdict.detail.contains("everything is on fire"));
}

#[test]
fn hung_subprocess_is_killed_and_reported_as_a_timeout() {
    let runner = runner_for_script("sleep 30");
    let cfg = WardenConfig {
        health_timeout: Duration::from_secs(1),
        ..WardenConfig::default()
    };

    let verdict = runner.check(&cfg);

    assert!(!verdict.passed);
    assert_eq!(verdict.detail, "health check timed out after 1s");
    assert!(verdict.summary.is_none());
}

#[test]
fn missing_executable_is_a_launch_failure() {
    let runner = SubprocessHealthRunner {
        command: vec!["/nonexistent/warden-health-check".to_string()],
    };

    let verdict = runner.check(&WardenConfig::default());

    assert!(!verdict.passed);
    assert!(verdict.detail.contains("launch failed"));
}

#[test]
fn subprocess_receives_the_target_url_explicitly() {
    // The child reflects its TARGET_URL back through a check detail.
    let runner = runner_for_script(
        r#"printf '{"passed": true, "checks": [{"check": "connectivity", "url": "%s", "passed": true, "detail": "HTTP 200"}]}' "$TARGET_URL""#,
    );
    let cfg = WardenConfig {
        base_url: "http://10.0.0.7:8080".to_string(),
        ..WardenConfig::default()
    };

    let verdict = runner.check(&cfg);

    let summary = verdict.summary.expect("summary");
    assert_eq!(
        summary.checks[0].target.as_deref(),
        Some("http://10.0.0.7:8080")
    );
}

#[test]
fn empty_command_fails_closed() {
    let runner = SubprocessHealthRunner { command: Vec::new() };
    let verdict = runner.check(&WardenConfig::default());
    assert!(!verdict.passed);
}

#[test]
fn from_config_prefers_the_configured_override() {
    let cfg = WardenConfig {
        health_command: Some(vec!["custom-health".to_string(), "--json".to_string()]),
        ..WardenConfig::default()
    };
    let runner = SubprocessHealthRunner::from_config(&cfg);
    assert_eq!(runner.command, vec!["custom-health", "--json"]);
}
