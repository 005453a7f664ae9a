//! Test-only collaborators: scripted probes, scanners, health runners, and a
//! real-git temp repository fixture.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::config::WardenConfig;
use crate::core::types::{HealthSummary, PageScanResult};
use crate::health::{HealthRunner, HealthVerdict};
use crate::io::browser::{ScanRequest, Scanner};
use crate::io::http::HttpProbe;

/// Probe that answers from a URL → status/transport-failure map.
pub struct ScriptedProbe {
    responses: HashMap<String, Result<u16, String>>,
}

impl ScriptedProbe {
    pub fn new<const N: usize>(entries: [(&str, Result<u16, &str>); N]) -> Self {
        let responses = entries
            .into_iter()
            .map(|(url, result)| {
                (
                    url.to_string(),
                    result.map_err(ToString::to_string),
                )
            })
            .collect();
        Self { responses }
    }
}

impl HttpProbe for ScriptedProbe {
    fn get_status(&self, url: &str, _timeout: Duration) -> Result<u16, String> {
        self.responses
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(format!("no scripted response for {url}")))
    }
}

/// Scanner that returns predetermined page results.
pub struct ScriptedScanner {
    pub results: Vec<PageScanResult>,
}

impl Scanner for ScriptedScanner {
    fn scan(&self, _request: &ScanRequest) -> Result<Vec<PageScanResult>> {
        Ok(self.results.clone())
    }
}

/// Scanner that fails outright, for degradation tests.
pub struct FailingScanner;

impl Scanner for FailingScanner {
    fn scan(&self, _request: &ScanRequest) -> Result<Vec<PageScanResult>> {
        Err(anyhow!("scanner exploded"))
    }
}

/// Health runner that returns a scripted verdict.
pub struct ScriptedHealthRunner {
    pub verdict: HealthVerdict,
}

impl ScriptedHealthRunner {
    pub fn passing() -> Self {
        let summary = HealthSummary::from_checks(Vec::new());
        Self {
            verdict: HealthVerdict {
                passed: true,
                detail: "all checks passed".to_string(),
                summary: Some(summary),
            },
        }
    }

    pub fn failing(detail: &str) -> Self {
        Self {
            verdict: HealthVerdict {
                passed: false,
                detail: detail.to_string(),
                summary: None,
            },
        }
    }
}

impl HealthRunner for ScriptedHealthRunner {
    fn check(&self, _cfg: &WardenConfig) -> HealthVerdict {
        self.verdict.clone()
    }
}

/// Temp directory with a real git repository and one committed file.
pub struct TestRepo {
    temp: tempfile::TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let temp = tempfile::tempdir().context("create tempdir")?;
        let root = temp.path();
        git(root, &["init", "--initial-branch=main"])?;
        git(root, &["config", "user.email", "warden@test.invalid"])?;
        git(root, &["config", "user.name", "Warden Test"])?;
        std::fs::write(root.join("index.html"), "<html>known good</html>")
            .context("write index.html")?;
        git(root, &["add", "-A"])?;
        git(root, &["commit", "-m", "known good state"])?;
        Ok(Self { temp })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// Introduce pending changes: modify a tracked file, add an untracked one.
    pub fn make_dirty(&self) -> Result<(PathBuf, PathBuf)> {
        let tracked = self.root().join("index.html");
        std::fs::write(&tracked, "<html>experimental edit</html>").context("modify tracked")?;
        let untracked = self.root().join("experiment.js");
        std::fs::write(&untracked, "console.log('new');").context("write untracked")?;
        Ok((tracked, untracked))
    }
}

fn git(root: &Path, args: &[&str]) -> Result<()> {
    let output = Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .with_context(|| format!("spawn git {}", args.join(" ")))?;
    if !output.status.success() {
        return Err(anyhow!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}
