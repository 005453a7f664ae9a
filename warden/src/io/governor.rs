//! Population governor: counts sibling agents and performs guarded
//! replication into the governed root.
//!
//! Replication is data-driven: the governor copies an explicit manifest of
//! DNA files, it never introspects the running binary. The containment check
//! runs on fully resolved paths; see [`crate::core::containment`] for why a
//! plain string prefix on unresolved input is not enough.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::containment::{is_strict_descendant, normalize_lexically};
use crate::core::types::ReplicationOutcome;

const LAUNCHER_NAME: &str = "start_agent.sh";

/// Count immediate sub-directories of the governed root.
///
/// A root that does not exist yet holds zero agents; that is not an error.
/// The count is always measured fresh, never cached. One warden instance per
/// governed root is assumed.
pub fn population_count(root: &Path) -> Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }
    let entries = fs::read_dir(root).with_context(|| format!("read {}", root.display()))?;
    let mut count = 0;
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry under {}", root.display()))?;
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            count += 1;
        }
    }
    Ok(count)
}

/// Inputs for one replication attempt.
#[derive(Debug, Clone)]
pub struct ReplicationRequest {
    /// Governed root; every target must resolve strictly inside it.
    pub root: PathBuf,
    /// Sub-directory name for the new sibling.
    pub target_name: String,
    /// Population cap, re-checked at attempt time.
    pub max_agents: usize,
    /// DNA manifest: artifact paths copied into the sibling.
    pub dna_files: Vec<PathBuf>,
    /// Base the relative layout of DNA files is preserved against.
    pub repo_root: PathBuf,
    /// Entry point the launcher script re-invokes.
    pub entry_point: String,
}

/// Attempt a guarded replication. All outcomes are data; nothing here
/// propagates as an error past this boundary.
#[instrument(skip_all, fields(target = %request.target_name))]
pub fn replicate(enabled: bool, request: &ReplicationRequest) -> ReplicationOutcome {
    if !enabled {
        debug!("replication disabled by configuration");
        return ReplicationOutcome::skipped("replication disabled");
    }

    let target_dir = match resolve_target(&request.root, &request.target_name) {
        Ok(dir) => dir,
        Err(outcome) => return outcome,
    };

    // Population is re-measured at the moment of the attempt, never cached.
    let population = match population_count(&request.root) {
        Ok(count) => count,
        Err(e) => return ReplicationOutcome::rejected(format!("population count failed: {e:#}")),
    };
    if population >= request.max_agents {
        info!(
            population,
            max_agents = request.max_agents,
            "population limit reached, replication skipped"
        );
        return ReplicationOutcome::rejected("population limit reached");
    }

    match copy_dna(request, &target_dir) {
        Ok(()) => {
            info!(target = %target_dir.display(), "replicated agent");
            ReplicationOutcome::completed(format!("replicated to {}", target_dir.display()))
        }
        // The partial directory is left in place for post-mortem inspection.
        Err(e) => ReplicationOutcome::rejected(format!("replication failed: {e:#}")),
    }
}

/// Resolve `target_name` against the root and require strict containment.
///
/// Both sides of the comparison are resolved: the root is canonicalized, and
/// the candidate is canonicalized down to its deepest existing ancestor
/// (following symlinks in every intermediate component) with the missing tail
/// re-appended after lexical normalization. Any escape or resolution failure
/// is a security-relevant rejection surfaced to the caller.
fn resolve_target(root: &Path, target_name: &str) -> Result<PathBuf, ReplicationOutcome> {
    let resolved_root = match fs::canonicalize(root) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(root = %root.display(), err = %e, "governed root did not resolve");
            return Err(ReplicationOutcome::rejected("path traversal rejected"));
        }
    };

    let candidate = normalize_lexically(&resolved_root.join(target_name));
    let resolved = match resolve_existing_prefix(&candidate) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(candidate = %candidate.display(), err = %e, "target did not resolve");
            return Err(ReplicationOutcome::rejected("path traversal rejected"));
        }
    };

    if !is_strict_descendant(&resolved_root, &resolved) {
        warn!(
            target = %resolved.display(),
            root = %resolved_root.display(),
            "replication target escapes governed root"
        );
        return Err(ReplicationOutcome::rejected("path traversal rejected"));
    }
    Ok(resolved)
}

/// Canonicalize the deepest existing ancestor of `candidate` and re-append
/// the missing tail.
///
/// A nested target like `sneaky/sub` where `sneaky` is a symlink must resolve
/// through the symlink even though the leaf does not exist yet; canonicalizing
/// only existing paths would let such a prefix escape undetected. `candidate`
/// is expected to be lexically normalized already, so the tail is `..`-free.
fn resolve_existing_prefix(candidate: &Path) -> std::io::Result<PathBuf> {
    let mut existing = candidate;
    let mut tail = Vec::new();
    // Symlinks count as existing even when broken, so a broken link in the
    // prefix fails canonicalization instead of being skipped over.
    while existing.symlink_metadata().is_err() {
        let Some(parent) = existing.parent() else {
            break;
        };
        if let Some(name) = existing.file_name() {
            tail.push(name.to_os_string());
        }
        existing = parent;
    }

    let mut resolved = fs::canonicalize(existing)?;
    for name in tail.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

fn copy_dna(request: &ReplicationRequest, target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)
        .with_context(|| format!("create {}", target_dir.display()))?;

    for source in &request.dna_files {
        let relative = source
            .strip_prefix(&request.repo_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| relative_fallback(source));
        let destination = target_dir.join(&relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::copy(source, &destination).with_context(|| {
            format!("copy {} to {}", source.display(), destination.display())
        })?;
        debug!(file = %relative.display(), "copied dna file");
    }

    write_launcher(target_dir, &request.entry_point)
}

fn relative_fallback(source: &Path) -> PathBuf {
    source
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("dna"))
}

/// Write the minimal launcher that re-invokes the warden entry point.
fn write_launcher(target_dir: &Path, entry_point: &str) -> Result<()> {
    let path = target_dir.join(LAUNCHER_NAME);
    let script = format!(
        "#!/usr/bin/env bash\nset -euo pipefail\nexec {entry_point} cycle\n"
    );
    fs::write(&path, script).with_context(|| format!("write {}", path.display()))?;
    mark_executable(&path)?;
    Ok(())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod {}", path.display()))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn population_of_missing_root_is_zero() {
        let temp = tempfile::tempdir().expect("tempdir");
        let count = population_count(&temp.path().join("nowhere")).expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn population_counts_only_directories() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir(temp.path().join("agent-1")).expect("mkdir");
        fs::create_dir(temp.path().join("agent-2")).expect("mkdir");
        fs::write(temp.path().join("stray.md"), "not an agent").expect("write");

        let count = population_count(temp.path()).expect("count");
        assert_eq!(count, 2);
    }

    #[test]
    fn disabled_replication_is_not_attempted() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = ReplicationRequest {
            root: temp.path().to_path_buf(),
            target_name: "spawn".to_string(),
            max_agents: 21,
            dna_files: Vec::new(),
            repo_root: temp.path().to_path_buf(),
            entry_point: "warden".to_string(),
        };

        let outcome = replicate(false, &request);
        assert!(!outcome.attempted);
        assert!(!outcome.succeeded);
        assert!(!temp.path().join("spawn").exists());
    }
}
