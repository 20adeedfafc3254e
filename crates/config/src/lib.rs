//! Configuration management for Sleuth
//!
//! Fetch governance (timeouts, size caps, retry policy, scheme allow-list,
//! host deny-list) and agent settings. Read once at startup and treated as
//! immutable afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, expand_home};

/// Errors in configuration handling
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("CONFIG I/O ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("MALFORMED CONFIG: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CONFIG NOT FOUND: {0}")]
    NotFound(PathBuf),

    #[error("INVALID CONFIG: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Fetch governance shared by every source handler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Total attempts per request, including the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
    #[serde(default = "default_allowed_schemes")]
    pub allowed_schemes: BTreeSet<String>,
    #[serde(default = "default_blocked_hosts")]
    pub blocked_hosts: BTreeSet<String>,
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_size: default_max_size(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            allowed_schemes: default_allowed_schemes(),
            blocked_hosts: default_blocked_hosts(),
            default_headers: BTreeMap::new(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_size() -> usize {
    10 * 1024 * 1024
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

fn default_allowed_schemes() -> BTreeSet<String> {
    ["http", "https", "ftp", "file", "db"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_blocked_hosts() -> BTreeSet<String> {
    ["localhost", "127.0.0.1", "::1", "0.0.0.0"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_user_agent() -> String {
    format!("sleuth/{}", env!("CARGO_PKG_VERSION"))
}

impl FetchConfig {
    /// Per-attempt deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fixed pause between attempts
    pub fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_delay_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Attempts actually made per request (never below one)
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn is_scheme_allowed(&self, key: &str) -> bool {
        self.allowed_schemes
            .iter()
            .any(|s| s.eq_ignore_ascii_case(key))
    }

    /// Reject values that would make every fetch fail
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        if self.max_size == 0 {
            return Err(ConfigError::Invalid("max_size must be positive".into()));
        }
        if self.retry_delay_secs < 0.0
            || Duration::try_from_secs_f64(self.retry_delay_secs).is_err()
        {
            return Err(ConfigError::Invalid(
                "retry_delay_secs must be a non-negative number of seconds in range".into(),
            ));
        }
        Ok(())
    }
}

/// Reasoning strategy requested from the external reasoner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningMode {
    #[default]
    Simple,
    Chain,
    Tree,
}

impl fmt::Display for ReasoningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReasoningMode::Simple => "simple",
            ReasoningMode::Chain => "chain",
            ReasoningMode::Tree => "tree",
        };
        f.write_str(name)
    }
}

impl FromStr for ReasoningMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(ReasoningMode::Simple),
            "chain" => Ok(ReasoningMode::Chain),
            "tree" => Ok(ReasoningMode::Tree),
            other => Err(ConfigError::Invalid(format!(
                "unknown reasoning mode '{}'",
                other
            ))),
        }
    }
}

/// Orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_knowledge_top_k")]
    pub knowledge_top_k: usize,
    #[serde(default)]
    pub reasoning_mode: ReasoningMode,
    /// Named local logs available to the diagnostic tools
    #[serde(default = "default_log_paths")]
    pub log_paths: BTreeMap<String, String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            knowledge_top_k: default_knowledge_top_k(),
            reasoning_mode: ReasoningMode::default(),
            log_paths: default_log_paths(),
        }
    }
}

fn default_history_limit() -> usize {
    20
}

fn default_knowledge_top_k() -> usize {
    5
}

fn default_log_paths() -> BTreeMap<String, String> {
    [
        ("application", "/var/log/application.log"),
        ("error", "/var/log/error.log"),
        ("access", "/var/log/access.log"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from specific location, falling back to defaults when absent
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("◆ NO CONFIG AT {:?}, USING DEFAULTS", path);
            return Ok(Config::default());
        }

        debug!("◆ READING CONFIG FROM {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.fetch.validate()?;
        Ok(config)
    }

    /// Load from specific location, failing when absent
    pub async fn load_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::load_from(path).await
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("◆ WRITING CONFIG TO {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Resolved path of a named log, if configured
    pub fn log_path(&self, name: &str) -> Option<PathBuf> {
        self.agent.log_paths.get(name).map(|p| expand_home(p))
    }
}

/// Write a default config unless one already exists, then load it
pub async fn init_at(path: &Path) -> Result<Config> {
    if path.exists() {
        warn!("◆ CONFIG ALREADY PRESENT AT {:?}", path);
    } else {
        Config::default().save_to(path).await?;
        info!("◆ CONFIG CREATED AT {:?}", path);
    }

    Config::load_from(path).await
}

/// Initialize the default data directory
pub async fn init() -> Result<Config> {
    paths::ensure_dir(&data_dir()).await?;
    init_at(&config_path()).await
}
