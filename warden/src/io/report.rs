//! Append-only cycle reports.
//!
//! Two persisted logs: a human-readable improvement report (one timestamped
//! markdown section per cycle) and a terse rolling boss log (one line per
//! cycle). Both are append-only; history is never rewritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, instrument};

use crate::core::decision::cycle_error_count;
use crate::core::types::{CycleOutcome, PageScanResult};

/// Console messages included per page in the improvement report.
const CONSOLE_MESSAGE_LIMIT: usize = 20;
/// Chars of HTML excerpt embedded per page.
const HTML_EXCERPT_LIMIT: usize = 500;

/// Locations of the two persisted logs.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub improvement_report: PathBuf,
    pub boss_log: PathBuf,
}

impl ReportPaths {
    pub fn new(reports_dir: &Path) -> Self {
        Self {
            improvement_report: reports_dir.join("improvement_report.md"),
            boss_log: reports_dir.join("BOSS_LOG.md"),
        }
    }
}

/// Append one cycle's summary to both logs.
///
/// Called exactly once per cycle, on every branch: failures are always
/// recorded, never silently dropped.
#[instrument(skip_all, fields(target))]
pub fn append_cycle(
    paths: &ReportPaths,
    target: &str,
    timestamp: &str,
    outcome: &CycleOutcome,
) -> Result<()> {
    if let Some(parent) = paths.improvement_report.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create reports dir {}", parent.display()))?;
    }

    append(
        &paths.improvement_report,
        &render_report_section(target, timestamp, outcome),
    )?;
    append(&paths.boss_log, &render_boss_line(target, timestamp, outcome))?;
    debug!("cycle reports appended");
    Ok(())
}

fn render_report_section(target: &str, timestamp: &str, outcome: &CycleOutcome) -> String {
    let mut section = format!("\n## Warden Scan — {timestamp}\n\n**Target:** `{target}`\n\n");
    if let Some(failure) = &outcome.rollback_failure {
        section.push_str(&format!("**Rollback failed:** `{failure}`\n\n"));
    }
    if outcome.scans.is_empty() {
        section.push_str("_Browser scan unavailable._\n");
    }
    for scan in &outcome.scans {
        section.push_str(&render_page(scan));
    }
    section
}

fn render_page(scan: &PageScanResult) -> String {
    let status = scan
        .http_status
        .map(|code| code.to_string())
        .unwrap_or_else(|| "none".to_string());

    let errors = if scan.errors.is_empty() {
        "_None detected._".to_string()
    } else {
        scan.errors
            .iter()
            .map(|e| format!("- `{e}`"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let console = if scan.console_messages.is_empty() {
        "_None._".to_string()
    } else {
        scan.console_messages
            .iter()
            .take(CONSOLE_MESSAGE_LIMIT)
            .map(|m| format!("- `{m}`"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let excerpt: String = scan.html_excerpt.chars().take(HTML_EXCERPT_LIMIT).collect();

    format!(
        "### {url} (status: {status})\n\n\
         #### Page Errors\n{errors}\n\n\
         #### Console Messages (first {limit})\n{console}\n\n\
         #### HTML Excerpt\n```html\n{excerpt}\n```\n\n",
        url = scan.url,
        limit = CONSOLE_MESSAGE_LIMIT,
    )
}

fn render_boss_line(target: &str, timestamp: &str, outcome: &CycleOutcome) -> String {
    let health = if outcome.health.passed { "pass" } else { "fail" };
    let errors = cycle_error_count(outcome);
    format!("| {timestamp} | {target} | health={health} | errors={errors} |\n")
}

fn append(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("append {}", path.display()))
}
