use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per network call (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff; doubles per attempt.
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
        }
    }
}

/// How an upstream exposes its builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePolicy {
    /// Only the newest build per version is visible.
    Latest,
    /// Every build per version is listed, with a per-build info lookup.
    History,
}

/// One upstream to track, with the lock file it writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Short name used on the command line and for the default lock path.
    pub name: String,
    pub policy: SourcePolicy,
    /// Base API endpoint (no trailing slash needed).
    pub endpoint: String,
    /// Lock file path; defaults to `<name>/lock.json` under the working directory.
    #[serde(default)]
    pub lock_path: Option<PathBuf>,
}

impl SourceConfig {
    /// Resolve the lock file path relative to `base_dir` when not absolute.
    pub fn lock_path_in(&self, base_dir: &Path) -> PathBuf {
        match &self.lock_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => base_dir.join(p),
            None => base_dir.join(&self.name).join("lock.json"),
        }
    }
}

/// Global configuration loaded from `~/.config/jarlock/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JarlockConfig {
    /// Maximum simultaneous resolve/hash tasks across a run.
    pub max_concurrent: usize,
    /// Connect timeout for every HTTP call, in seconds.
    pub connect_timeout_secs: u64,
    /// Total timeout for listing and build-info calls, in seconds.
    pub timeout_secs: u64,
    /// Upper bound on a whole artifact download, in seconds.
    #[serde(default = "default_artifact_timeout_secs")]
    pub artifact_timeout_secs: u64,
    /// Persist builds upstream marked FAILURE so they are not re-checked.
    #[serde(default = "default_true")]
    pub remember_rejections: bool,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

fn default_true() -> bool {
    true
}

fn default_artifact_timeout_secs() -> u64 {
    1800
}

impl Default for JarlockConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 5,
            connect_timeout_secs: 15,
            timeout_secs: 60,
            artifact_timeout_secs: default_artifact_timeout_secs(),
            remember_rejections: true,
            retry: None,
            sources: vec![
                SourceConfig {
                    name: "forge".to_string(),
                    policy: SourcePolicy::Latest,
                    endpoint: "https://versions.mcjars.app/api/v2/builds/forge".to_string(),
                    lock_path: None,
                },
                SourceConfig {
                    name: "purpur".to_string(),
                    policy: SourcePolicy::History,
                    endpoint: "https://api.purpurmc.org/v2/purpur".to_string(),
                    lock_path: None,
                },
            ],
        }
    }
}

impl JarlockConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn artifact_timeout(&self) -> Duration {
        Duration::from_secs(self.artifact_timeout_secs)
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }

    /// Look up a configured source by name.
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jarlock")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<JarlockConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` but for an explicit path (used by `--config`).
pub fn load_or_init_at(path: &Path) -> Result<JarlockConfig> {
    if !path.exists() {
        let default_cfg = JarlockConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: JarlockConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
