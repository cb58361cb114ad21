use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::WatchHiveError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub metadata: MetadataConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_to_file: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub language: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

impl MetadataConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Explicit database path; the data directory is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl AppConfig {
    /// Load config: user file (if exists) merged over built-in defaults.
    pub fn load() -> Result<Self, WatchHiveError> {
        let user_path = Self::config_path();
        if user_path.exists() {
            Self::load_from(&user_path)
        } else {
            toml::from_str(DEFAULT_CONFIG).map_err(|e| WatchHiveError::Config(e.to_string()))
        }
    }

    /// Load a specific config file.
    pub fn load_from(path: &Path) -> Result<Self, WatchHiveError> {
        let user_str = std::fs::read_to_string(path)
            .map_err(|e| WatchHiveError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&user_str)
    }

    /// Parse a user config, filling missing keys from the built-in defaults.
    pub fn parse(user_str: &str) -> Result<Self, WatchHiveError> {
        let mut merged: toml::Table =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| WatchHiveError::Config(e.to_string()))?;
        let user: toml::Table =
            toml::from_str(user_str).map_err(|e| WatchHiveError::Config(e.to_string()))?;
        merge_tables(&mut merged, user);
        toml::Value::Table(merged)
            .try_into()
            .map_err(|e: toml::de::Error| WatchHiveError::Config(e.to_string()))
    }

    /// Save current config to the user config file.
    pub fn save(&self) -> Result<(), WatchHiveError> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WatchHiveError::Config(e.to_string()))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Path to user config file (XDG on Linux, AppData on Windows).
    pub fn config_path() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    /// Directory for the database and log files.
    pub fn data_dir() -> PathBuf {
        Self::project_dirs()
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Path to the database file.
    pub fn db_path(&self) -> PathBuf {
        self.storage
            .database
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("watchhive.db"))
    }

    /// Ensure the database directory exists and return the DB path.
    pub fn ensure_db_path(&self) -> Result<PathBuf, WatchHiveError> {
        let path = self.db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "watchhive")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                merge_tables(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_parses() {
        let config = AppConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.metadata.timeout_secs, 10);
        assert_eq!(config.metadata.language, "en-US");
        assert!(config.metadata.api_key.is_none());
        assert!(config.storage.database.is_none());
    }

    #[test]
    fn test_partial_user_config_keeps_defaults() {
        let config = AppConfig::parse(
            "[metadata]\napi_key = \"abc123\"\ntimeout_secs = 3\n\n[storage]\ndatabase = \"/tmp/wh.db\"\n",
        )
        .unwrap();
        assert_eq!(config.metadata.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.metadata.timeout(), Duration::from_secs(3));
        assert_eq!(config.metadata.requests_per_second, 30);
        assert!(config.general.log_to_file);
        assert_eq!(config.db_path(), PathBuf::from("/tmp/wh.db"));
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let err = AppConfig::parse("[metadata]\ntimeout_secs = \"soon\"\n").unwrap_err();
        assert!(matches!(err, WatchHiveError::Config(_)));
    }

    #[test]
    fn test_roundtrip() {
        let config = AppConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: AppConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.metadata.base_url, config.metadata.base_url);
    }
}
