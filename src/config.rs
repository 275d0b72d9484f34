//! Config loading and persistence.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::replica::{RegistryError, ReplicaEntry, ReplicaRegistry};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sync: SyncTuning,
    pub replicas: Vec<ReplicaEntry>,
}

impl Config {
    /// Validated registry view over the configured replicas.
    pub fn registry(&self) -> Result<ReplicaRegistry, RegistryError> {
        let registry = ReplicaRegistry {
            replicas: self.replicas.clone(),
        };
        registry.validate()?;
        Ok(registry)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncTuning {
    pub poll_interval_ms: u64,
    pub batch_size: usize,
    pub request_timeout_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            batch_size: 50,
            request_timeout_ms: 10_000,
            backoff_base_ms: 250,
            backoff_max_ms: 30_000,
        }
    }
}

impl SyncTuning {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write {path}: {reason}")]
    Write { path: String, reason: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: Config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    config.registry()?;
    Ok(config)
}

pub fn load_or_default(path: &Path) -> Config {
    if path.exists() {
        match load(path) {
            Ok(config) => return config,
            Err(err) => {
                tracing::warn!("config load failed, using defaults: {err}");
                return Config::default();
            }
        }
    }
    Config::default()
}

pub fn write_config(path: &Path, config: &Config) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|err| ConfigError::Write {
            path: path.display().to_string(),
            reason: format!("failed to create {}: {err}", dir.display()),
        })?;
    }
    let contents = toml::to_string_pretty(config).map_err(|err| ConfigError::Write {
        path: path.display().to_string(),
        reason: format!("failed to render config: {err}"),
    })?;
    atomic_write(path, contents.as_bytes())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), ConfigError> {
    let dir = path.parent().ok_or_else(|| ConfigError::Write {
        path: path.display().to_string(),
        reason: "config path missing parent directory".to_string(),
    })?;
    let temp = tempfile::NamedTempFile::new_in(dir).map_err(|err| ConfigError::Write {
        path: path.display().to_string(),
        reason: format!("failed to create temp file in {}: {err}", dir.display()),
    })?;
    fs::write(temp.path(), data).map_err(|err| ConfigError::Write {
        path: path.display().to_string(),
        reason: format!("failed to write config temp file: {err}"),
    })?;
    temp.persist(path).map_err(|err| ConfigError::Write {
        path: path.display().to_string(),
        reason: err.to_string(),
    })?;
    Ok(())
}
