use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::connection_registry::DatastoreKind;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";
pub const DEFAULT_TRANSITION_DELAY_MS: u64 = 1_000;
pub const DEFAULT_HISTORY_CAPACITY: usize = 500;
pub const DEFAULT_LOG_LEVEL: &str = "info";

const CONFIG_DIR_ENV: &str = "QUERYDECK_CONFIG_DIR";
const BASE_URL_ENV: &str = "QUERYDECK_BASE_URL";
pub const LOG_FILTER_ENV: &str = "QUERYDECK_LOG";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub transition_delay_ms: u64,
    pub history_capacity: usize,
    pub request_timeout_ms: Option<u64>,
    pub demo_mode: bool,
    pub journal: bool,
    pub log_level: String,
    pub connections: Vec<ConnectionSeed>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectionSeed {
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            transition_delay_ms: DEFAULT_TRANSITION_DELAY_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            request_timeout_ms: None,
            demo_mode: false,
            journal: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            connections: Vec::new(),
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.transition_delay_ms)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(base_url) = env::var(BASE_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            self.base_url = base_url.trim().to_string();
        }
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "history_capacity must be greater than 0".to_string(),
            });
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "base_url must not be empty".to_string(),
            });
        }
        for seed in &self.connections {
            if let Err(error) = seed.kind.parse::<DatastoreKind>() {
                return Err(ConfigError::Invalid {
                    path: path.to_path_buf(),
                    reason: error.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config directory is unavailable for this platform")]
    ConfigDirUnavailable,
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config file at {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
    config: AppConfig,
}

impl FileConfigStore {
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path()?;
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self {
                path,
                config: AppConfig::default(),
            });
        }

        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        if raw.trim().is_empty() {
            return Ok(Self {
                path,
                config: AppConfig::default(),
            });
        }

        let config: AppConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate(&path)?;

        Ok(Self { path, config })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn into_config(self) -> AppConfig {
        self.config
    }
}

pub fn default_config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(custom) = env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(custom));
    }

    let base_dir = if cfg!(target_os = "windows") {
        env::var_os("APPDATA")
            .map(PathBuf::from)
            .ok_or(ConfigError::ConfigDirUnavailable)?
    } else if let Some(xdg_config_home) = env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config_home)
    } else {
        let home = env::var_os("HOME").ok_or(ConfigError::ConfigDirUnavailable)?;
        PathBuf::from(home).join(".config")
    };

    Ok(base_dir.join("querydeck"))
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(default_config_dir()?.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, FileConfigStore, DEFAULT_BASE_URL};

    fn temp_config_path(temp_dir: &TempDir) -> PathBuf {
        temp_dir.path().join("config.toml")
    }

    #[test]
    fn missing_config_file_loads_defaults() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let store =
            FileConfigStore::load_from_path(temp_config_path(&temp_dir)).expect("load failed");

        assert_eq!(store.config(), &AppConfig::default());
        assert_eq!(store.config().base_url, DEFAULT_BASE_URL);
        assert_eq!(store.config().transition_delay(), Duration::from_secs(1));
        assert!(store.config().request_timeout().is_none());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_config_path(&temp_dir);
        fs::write(
            &path,
            "base_url = \"http://api.internal:8080\"\nrequest_timeout_ms = 2500\n",
        )
        .expect("failed to write config");

        let config = FileConfigStore::load_from_path(&path)
            .expect("load failed")
            .into_config();
        assert_eq!(config.base_url, "http://api.internal:8080");
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(2_500)));
        assert_eq!(config.history_capacity, 500);
        assert!(!config.demo_mode);
    }

    #[test]
    fn zero_history_capacity_is_rejected() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_config_path(&temp_dir);
        fs::write(&path, "history_capacity = 0\n").expect("failed to write config");

        let err = FileConfigStore::load_from_path(&path).expect_err("capacity 0 should fail");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn connection_seeds_load_and_unknown_kinds_are_rejected() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_config_path(&temp_dir);
        fs::write(
            &path,
            "[[connections]]\nkind = \"postgresql\"\nvalue = \"postgres://db/app\"\n\n[[connections]]\nkind = \"redis\"\n",
        )
        .expect("failed to write config");

        let config = FileConfigStore::load_from_path(&path)
            .expect("load failed")
            .into_config();
        assert_eq!(config.connections.len(), 2);
        assert_eq!(config.connections[0].value, "postgres://db/app");
        assert!(config.connections[1].value.is_empty());

        fs::write(&path, "[[connections]]\nkind = \"oracle\"\n").expect("failed to write config");
        let err = FileConfigStore::load_from_path(&path).expect_err("unknown kind should fail");
        assert!(err.to_string().contains("oracle"));
    }

    #[test]
    fn malformed_file_reports_parse_error() {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let path = temp_config_path(&temp_dir);
        fs::write(&path, "base_url = [").expect("failed to write config");

        let err = FileConfigStore::load_from_path(&path).expect_err("parse should fail");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
