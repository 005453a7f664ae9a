//! Deep health check: connectivity, assets, system load.
//!
//! The checks themselves are plain data producers. The cycle controller never
//! runs them in-process: it spawns `warden health` as an isolated subprocess
//! and parses the JSON summary from stdout, so a crash in health-check logic
//! cannot corrupt the controller's own state. The subprocess summary is
//! validated against an embedded schema before it is trusted.

use std::process::Command;

use anyhow::{Context, Result, bail};
use jsonschema::Draft;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::config::WardenConfig;
use crate::core::types::{CheckKind, HealthSummary};
use crate::io::http::{HttpProbe, probe, probe_assets};
use crate::io::load::check_load;
use crate::io::process::run_with_timeout;

const SUMMARY_SCHEMA: &str = include_str!("../schemas/health_summary.schema.json");
const OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// Run every health check and aggregate the results.
///
/// Order is stable: connectivity, then one check per asset path, then load.
/// Individual failures never short-circuit later checks.
#[instrument(skip_all)]
pub fn run_health_check(cfg: &WardenConfig, http: &dyn HttpProbe) -> HealthSummary {
    let mut checks = Vec::with_capacity(cfg.asset_paths.len() + 2);

    checks.push(probe(
        http,
        CheckKind::Connectivity,
        &cfg.base_url,
        cfg.request_timeout,
    ));

    let asset_urls: Vec<String> = cfg
        .asset_paths
        .iter()
        .map(|path| cfg.url_for(path))
        .collect();
    checks.extend(probe_assets(http, &asset_urls, cfg.request_timeout));

    checks.push(check_load(cfg.load_threshold));

    let summary = HealthSummary::from_checks(checks);
    info!(passed = summary.passed, checks = summary.checks.len(), "health check finished");
    summary
}

/// Controller-side view of the health subprocess.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthVerdict {
    pub passed: bool,
    pub detail: String,
    /// Parsed summary when the subprocess produced a valid one.
    pub summary: Option<HealthSummary>,
}

impl HealthVerdict {
    fn failed(detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            detail: detail.into(),
            summary: None,
        }
    }
}

/// Abstraction over the health-check boundary.
///
/// The real implementation is a subprocess; tests script verdicts directly.
pub trait HealthRunner {
    fn check(&self, cfg: &WardenConfig) -> HealthVerdict;
}

/// Health runner that spawns the health command as an isolated subprocess.
pub struct SubprocessHealthRunner {
    pub command: Vec<String>,
}

impl SubprocessHealthRunner {
    /// Build from config: explicit `HEALTH_COMMAND` override, or re-invoke
    /// this binary with the `health` subcommand.
    pub fn from_config(cfg: &WardenConfig) -> Self {
        let command = cfg.health_command.clone().unwrap_or_else(|| {
            let exe = std::env::current_exe()
                .map(|path| path.display().to_string())
                .unwrap_or_else(|_| "warden".to_string());
            vec![exe, "health".to_string()]
        });
        Self { command }
    }
}

impl HealthRunner for SubprocessHealthRunner {
    /// Launch failure, timeout, and unparseable output are all folded into a
    /// failed verdict with a descriptive detail, never a fatal abort.
    #[instrument(skip_all, fields(command = %self.command.join(" ")))]
    fn check(&self, cfg: &WardenConfig) -> HealthVerdict {
        let Some((program, args)) = self.command.split_first() else {
            return HealthVerdict::failed("health command is empty");
        };
        let mut cmd = Command::new(program);
        cmd.args(args);
        // The subprocess builds its own config; hand it the relevant keys
        // explicitly instead of relying on inherited ambient state.
        cmd.env("TARGET_URL", &cfg.base_url)
            .env("ASSET_PATHS", cfg.asset_paths.join(","))
            .env("LOAD_THRESHOLD", cfg.load_threshold.to_string())
            .env(
                "ENABLE_RESTART",
                if cfg.enable_restart { "1" } else { "0" },
            )
            .env("RESTART_SERVICE", &cfg.restart_service)
            .env(
                "REQUEST_TIMEOUT_SECS",
                cfg.request_timeout.as_secs().to_string(),
            );

        let output = match run_with_timeout(cmd, cfg.health_timeout, OUTPUT_LIMIT_BYTES) {
            Ok(output) => output,
            Err(e) => {
                warn!(err = %e, "health check launch failed");
                return HealthVerdict::failed(format!("health check launch failed: {e:#}"));
            }
        };
        if output.timed_out {
            warn!(timeout_secs = cfg.health_timeout.as_secs(), "health check timed out");
            return HealthVerdict::failed(format!(
                "health check timed out after {}s",
                cfg.health_timeout.as_secs()
            ));
        }

        match parse_summary(&output.stdout_text()) {
            Ok(summary) => verdict_from_summary(summary),
            Err(e) => {
                debug!(err = %e, "health output was not a valid summary");
                HealthVerdict::failed(format!(
                    "health check exited with {:?} and no valid summary: {} ({e:#})",
                    output.status.code(),
                    output.stderr_text().trim(),
                ))
            }
        }
    }
}

fn verdict_from_summary(summary: HealthSummary) -> HealthVerdict {
    let detail = if summary.passed {
        "all checks passed".to_string()
    } else {
        summary
            .failures()
            .map(|check| {
                let target = check.target.as_deref().unwrap_or("host");
                format!("{target}: {}", check.detail)
            })
            .collect::<Vec<_>>()
            .join("; ")
    };
    HealthVerdict {
        passed: summary.passed,
        detail,
        summary: Some(summary),
    }
}

/// Parse and schema-validate a health summary from subprocess stdout.
pub fn parse_summary(stdout: &str) -> Result<HealthSummary> {
    let instance: Value =
        serde_json::from_str(stdout.trim()).context("parse health summary json")?;
    validate_schema(&instance)?;
    let summary: HealthSummary =
        serde_json::from_value(instance).context("parse health summary struct")?;
    Ok(summary)
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(SUMMARY_SCHEMA).context("parse embedded summary schema")?;
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile summary schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("summary schema violations:\n- {}", messages.join("\n- "));
    }
    Ok(())
}
