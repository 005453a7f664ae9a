//! Path-containment rules for the replication governor.
//!
//! The governor only ever creates directories strictly inside the governed
//! root. The comparison here is a separator-qualified prefix check on already
//! resolved paths: a plain `starts_with` on the unresolved strings would let
//! `..` segments or sibling directories that merely share a name prefix
//! (`/opt/agents-evil` vs `/opt/agents`) slip through.

use std::path::{Component, Path, PathBuf};

/// True if `candidate` is a strict descendant of `root`.
///
/// Both paths must already be resolved by the caller (symlinks followed where
/// the path exists, `..` segments folded where it does not). `root` itself is
/// not its own descendant.
pub fn is_strict_descendant(root: &Path, candidate: &Path) -> bool {
    let root = root.to_string_lossy();
    let candidate = candidate.to_string_lossy();
    let root = root.trim_end_matches(std::path::MAIN_SEPARATOR);
    let mut prefix = String::with_capacity(root.len() + 1);
    prefix.push_str(root);
    prefix.push(std::path::MAIN_SEPARATOR);
    candidate.starts_with(&prefix) && candidate.len() > prefix.len()
}

/// Fold `.` and `..` components without touching the filesystem.
///
/// Used for replication targets that do not exist yet and therefore cannot be
/// canonicalized. `..` at the root is kept, so escapes still fail the
/// descendant check rather than silently clamping to the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                if last_is_normal {
                    normalized.pop();
                } else {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
