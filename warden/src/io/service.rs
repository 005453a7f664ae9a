//! Privileged service restart, gated behind `ENABLE_RESTART`.

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, instrument};

use crate::io::process::run_with_timeout;

const RESTART_TIMEOUT: Duration = Duration::from_secs(30);
const OUTPUT_LIMIT_BYTES: usize = 64 * 1024;

/// Restart a named system service via `sudo systemctl restart`.
///
/// Only called after a failed health check when the operator explicitly
/// enabled restarts; the outcome never changes the health verdict.
#[instrument]
pub fn restart_service(name: &str) -> Result<()> {
    info!(service = name, "attempting service restart");
    let mut cmd = Command::new("sudo");
    cmd.args(["systemctl", "restart", name]);

    let output = run_with_timeout(cmd, RESTART_TIMEOUT, OUTPUT_LIMIT_BYTES)?;
    if output.timed_out {
        return Err(anyhow!("restart of {name} timed out"));
    }
    if !output.status.success() {
        return Err(anyhow!(
            "restart of {name} failed: {}",
            output.stderr_text().trim()
        ));
    }
    info!(service = name, "service restarted");
    Ok(())
}
