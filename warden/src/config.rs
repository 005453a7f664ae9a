//! Warden configuration read once from the process environment.
//!
//! Components never consult ambient environment state themselves: the config
//! is built at process start and handed to each component, which keeps every
//! component testable with an injected configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};

/// Immutable configuration for one warden invocation.
///
/// All keys are optional in the environment; missing keys fall back to the
/// defaults below. Booleans accept `1` or `true`.
#[derive(Debug, Clone, PartialEq)]
pub struct WardenConfig {
    /// Base URL probed for connectivity and scanned by the browser
    /// (`TARGET_URL`). Stored without a trailing slash.
    pub base_url: String,
    /// Asset paths that must answer HTTP 200 (`ASSET_PATHS`, comma-separated).
    pub asset_paths: Vec<String>,
    /// Page paths visited by the browser scanner (`SCAN_PATHS`).
    pub scan_paths: Vec<String>,
    /// Max acceptable 1-minute load average (`LOAD_THRESHOLD`).
    pub load_threshold: f64,
    /// Allow a privileged service restart on health failure (`ENABLE_RESTART`).
    pub enable_restart: bool,
    /// Service restarted when `enable_restart` is set (`RESTART_SERVICE`).
    pub restart_service: String,
    /// Governed root for sibling-agent directories (`AGENT_ROOT`).
    pub agent_root: PathBuf,
    /// Population cap under the governed root (`MAX_AGENTS`).
    pub max_agents: usize,
    /// Master switch for replication (`ALLOW_REPLICATION`).
    pub allow_replication: bool,
    /// Sub-directory name for a replicated sibling (`AGENT_NAME`).
    pub agent_name: String,
    /// Allow reverting the working tree on health failure (`ENABLE_ROLLBACK`).
    pub enable_rollback: bool,
    /// Artifact paths copied into a new sibling (`DNA_FILES`, comma-separated,
    /// resolved against `repo_root`).
    pub dna_files: Vec<PathBuf>,
    /// Working tree the warden reports into and may roll back (`REPO_ROOT`).
    pub repo_root: PathBuf,
    /// Per-request timeout for probes (`REQUEST_TIMEOUT_SECS`).
    pub request_timeout: Duration,
    /// Per-page navigation timeout (`NAV_TIMEOUT_SECS`).
    pub nav_timeout: Duration,
    /// Hard timeout for the health-check subprocess (`HEALTH_TIMEOUT_SECS`).
    pub health_timeout: Duration,
    /// Override for the health-check command line (`HEALTH_COMMAND`,
    /// comma-separated argv). Defaults to re-invoking this binary.
    pub health_command: Option<Vec<String>>,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            asset_paths: vec![
                "/static/css/style.css".to_string(),
                "/static/js/app.js".to_string(),
            ],
            scan_paths: vec!["/".to_string()],
            load_threshold: 4.0,
            enable_restart: false,
            restart_service: "nginx".to_string(),
            agent_root: PathBuf::from("/opt/warden/agents"),
            max_agents: 21,
            allow_replication: false,
            agent_name: "warden-spawn".to_string(),
            enable_rollback: false,
            dna_files: Vec::new(),
            repo_root: PathBuf::from("."),
            request_timeout: Duration::from_secs(10),
            nav_timeout: Duration::from_secs(30),
            health_timeout: Duration::from_secs(120),
            health_command: None,
        }
    }
}

impl WardenConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an injected key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            base_url: lookup("TARGET_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            asset_paths: lookup("ASSET_PATHS")
                .map(|raw| split_list(&raw))
                .filter(|paths| !paths.is_empty())
                .unwrap_or(defaults.asset_paths),
            scan_paths: lookup("SCAN_PATHS")
                .map(|raw| split_list(&raw))
                .filter(|paths| !paths.is_empty())
                .unwrap_or(defaults.scan_paths),
            load_threshold: parse_or("LOAD_THRESHOLD", &lookup, defaults.load_threshold)?,
            enable_restart: parse_bool(lookup("ENABLE_RESTART")),
            restart_service: lookup("RESTART_SERVICE").unwrap_or(defaults.restart_service),
            agent_root: lookup("AGENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.agent_root),
            max_agents: parse_or("MAX_AGENTS", &lookup, defaults.max_agents)?,
            allow_replication: parse_bool(lookup("ALLOW_REPLICATION")),
            agent_name: lookup("AGENT_NAME").unwrap_or(defaults.agent_name),
            enable_rollback: parse_bool(lookup("ENABLE_ROLLBACK")),
            dna_files: lookup("DNA_FILES")
                .map(|raw| split_list(&raw).into_iter().map(PathBuf::from).collect())
                .unwrap_or(defaults.dna_files),
            repo_root: lookup("REPO_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.repo_root),
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                &lookup,
                defaults.request_timeout.as_secs(),
            )?),
            nav_timeout: Duration::from_secs(parse_or(
                "NAV_TIMEOUT_SECS",
                &lookup,
                defaults.nav_timeout.as_secs(),
            )?),
            health_timeout: Duration::from_secs(parse_or(
                "HEALTH_TIMEOUT_SECS",
                &lookup,
                defaults.health_timeout.as_secs(),
            )?),
            health_command: lookup("HEALTH_COMMAND")
                .map(|raw| split_list(&raw))
                .filter(|argv| !argv.is_empty()),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(anyhow!("TARGET_URL must not be empty"));
        }
        if !(self.load_threshold.is_finite() && self.load_threshold > 0.0) {
            return Err(anyhow!("LOAD_THRESHOLD must be a positive number"));
        }
        if self.max_agents == 0 {
            return Err(anyhow!("MAX_AGENTS must be > 0"));
        }
        if self.agent_name.trim().is_empty() {
            return Err(anyhow!("AGENT_NAME must not be empty"));
        }
        if self.request_timeout.is_zero()
            || self.nav_timeout.is_zero()
            || self.health_timeout.is_zero()
        {
            return Err(anyhow!("timeouts must be > 0 seconds"));
        }
        Ok(())
    }

    /// Directory for the append-only report files.
    pub fn reports_dir(&self) -> PathBuf {
        self.repo_root.join("reports")
    }

    /// Directory for scan artifacts such as the screenshot.
    pub fn logs_dir(&self) -> PathBuf {
        self.repo_root.join("logs")
    }

    /// Join a path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        if path.is_empty() || path == "/" {
            return self.base_url.clone();
        }
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/{}", self.base_url, path)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn parse_bool(raw: Option<String>) -> bool {
    matches!(
        raw.as_deref().map(str::trim),
        Some("1") | Some("true") | Some("TRUE") | Some("True")
    )
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid {key}: '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = WardenConfig::from_lookup(|_| None).expect("config");
        assert_eq!(cfg, WardenConfig::default());
        assert_eq!(cfg.base_url, "http://localhost:3000");
        assert_eq!(cfg.max_agents, 21);
        assert!(!cfg.allow_replication);
        assert!(!cfg.enable_rollback);
    }

    #[test]
    fn parses_overrides_and_strips_trailing_slash() {
        let cfg = WardenConfig::from_lookup(lookup_from(&[
            ("TARGET_URL", "https://example.com/"),
            ("ASSET_PATHS", "/a.css, /b.js ,"),
            ("SCAN_PATHS", "/,/about"),
            ("LOAD_THRESHOLD", "2.5"),
            ("ALLOW_REPLICATION", "1"),
            ("ENABLE_ROLLBACK", "true"),
            ("MAX_AGENTS", "3"),
        ]))
        .expect("config");

        assert_eq!(cfg.base_url, "https://example.com");
        assert_eq!(cfg.asset_paths, vec!["/a.css", "/b.js"]);
        assert_eq!(cfg.scan_paths, vec!["/", "/about"]);
        assert_eq!(cfg.load_threshold, 2.5);
        assert!(cfg.allow_replication);
        assert!(cfg.enable_rollback);
        assert_eq!(cfg.max_agents, 3);
    }

    #[test]
    fn rejects_unparseable_numbers() {
        let err = WardenConfig::from_lookup(lookup_from(&[("MAX_AGENTS", "many")])).unwrap_err();
        assert!(err.to_string().contains("MAX_AGENTS"));
    }

    #[test]
    fn rejects_zero_max_agents() {
        let err = WardenConfig::from_lookup(lookup_from(&[("MAX_AGENTS", "0")])).unwrap_err();
        assert!(err.to_string().contains("MAX_AGENTS"));
    }

    #[test]
    fn url_for_joins_paths() {
        let cfg = WardenConfig::default();
        assert_eq!(cfg.url_for("/"), "http://localhost:3000");
        assert_eq!(
            cfg.url_for("/static/js/app.js"),
            "http://localhost:3000/static/js/app.js"
        );
    }
}
