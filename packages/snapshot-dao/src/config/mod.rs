//! Store configuration
//!
//! `StoreConfig` describes how the snapshot store connection is opened.
//!
//! # Sources
//!
//! - Defaults: in-memory database, 5s busy timeout, read-write
//! - YAML (v1 schema): `StoreConfig::from_yaml("store.yaml")?`
//! - Environment: `SNAPSHOT_DB_PATH`, `SNAPSHOT_DB_BUSY_TIMEOUT_MS`, `SNAPSHOT_DB_READ_ONLY`
//!
//! ```yaml
//! version: 1
//! path: /var/lib/cloud/snapshots.db
//! busy_timeout_ms: 2000
//! read_only: true
//! ```

pub mod error;

pub use error::{ConfigError, ConfigResult};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "SNAPSHOT_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "SNAPSHOT_DB_BUSY_TIMEOUT_MS";
pub const ENV_READ_ONLY: &str = "SNAPSHOT_DB_READ_ONLY";

const SUPPORTED_VERSIONS: [u32; 1] = [1];
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;

/// Connection settings for `SqliteStore`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Database file (None = in-memory)
    pub path: Option<PathBuf>,
    /// How long SQLite waits on a locked database before reporting busy
    pub busy_timeout_ms: u64,
    /// Open with SQLITE_OPEN_READ_ONLY
    pub read_only: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            read_only: false,
        }
    }
}

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreConfigV1 {
    version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,

    #[serde(default = "default_busy_timeout_ms")]
    busy_timeout_ms: u64,

    #[serde(default)]
    read_only: bool,
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl StoreConfig {
    /// File-backed configuration with defaults for everything else
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Load from YAML file (v1 schema)
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse a YAML document (v1 schema)
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: StoreConfigV1 = serde_yaml::from_str(content)?;

        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let config = Self {
            path: export.path,
            busy_timeout_ms: export.busy_timeout_ms,
            read_only: export.read_only,
        };
        config.validate()?;
        Ok(config)
    }

    /// Export to YAML
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let export = StoreConfigV1 {
            version: Some(1),
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            read_only: self.read_only,
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    /// Defaults overridden by `SNAPSHOT_DB_*` environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH).filter(|p| !p.is_empty()) {
            config.path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout_ms = raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid_env(ENV_BUSY_TIMEOUT_MS, &raw, e))?;
        }

        if let Some(raw) = lookup(ENV_READ_ONLY) {
            config.read_only = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::invalid_env(
                        ENV_READ_ONLY,
                        &raw,
                        "expected true or false",
                    ))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.busy_timeout_ms == 0 || self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::range_with_hint(
                "busy_timeout_ms",
                self.busy_timeout_ms,
                1,
                MAX_BUSY_TIMEOUT_MS,
                "SQLite needs a positive busy timeout of at most ten minutes",
            ));
        }

        if self.read_only && self.path.is_none() {
            return Err(ConfigError::Custom(
                "read_only requires a database path; an in-memory database cannot be opened read-only"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
