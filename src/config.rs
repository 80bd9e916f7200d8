// App configuration: config.json in the app data directory plus env overrides
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::state::storage::{self, StorageError};
use crate::state::MigrationOptions;
use crate::sync::SyncConfig;

pub const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_URL: &str =
    "https://data.jabarprov.go.id/api-backend/bigdata/bps/od_15048_rata_rata_lama_sekolah_berdasarkan_kabupatenkota";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Endpoint returning `{"error": .., "data": [..]}`
    pub api_url: String,
    /// No timeout when unset: a hung request keeps the loading flag raised
    pub request_timeout_ms: Option<u64>,
    /// Return remote failures from `sync` instead of keeping stale data silently
    pub surface_sync_errors: bool,
    /// Rebuild the database when its schema cannot be migrated. Wipes local data.
    pub destructive_fallback: bool,
    /// Database file name, relative to the app data directory
    pub database_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_ms: None,
            surface_sync_errors: false,
            destructive_fallback: false,
            database_file: "opendata_jabar.db".to_string(),
        }
    }
}

impl AppConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            surface_sync_errors: self.surface_sync_errors,
        }
    }

    pub fn migration_options(&self) -> MigrationOptions {
        MigrationOptions {
            destructive_fallback: self.destructive_fallback,
        }
    }

    pub fn database_path(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(&self.database_file)
    }
}

pub fn config_path() -> ConfigResult<PathBuf> {
    Ok(storage::app_data_file(CONFIG_FILE)?)
}

/// Read a config file; `None` when it does not exist
pub fn load_from(path: &Path) -> ConfigResult<Option<AppConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

pub fn write_config(path: &Path, config: &AppConfig) -> ConfigResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, serde_json::to_string_pretty(config)?)?;
    Ok(())
}

/// Load the config at `path`, falling back to defaults on any problem.
/// A missing file is created with the defaults.
pub fn load_or_init_at(path: &Path) -> AppConfig {
    let mut config = match load_from(path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            let config = AppConfig::default();
            if let Err(e) = write_config(path, &config) {
                log::warn!("Failed to write default config to {}: {}", path.display(), e);
            }
            config
        }
        Err(e) => {
            log::warn!("Config load failed for {}, using defaults: {}", path.display(), e);
            AppConfig::default()
        }
    };
    apply_env_overrides(&mut config);
    config
}

pub fn load_or_init() -> ConfigResult<AppConfig> {
    Ok(load_or_init_at(&config_path()?))
}

pub fn apply_env_overrides(config: &mut AppConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let value = |key: &str| {
        lookup(key)
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
    };

    if let Some(url) = value("OPENDATA_API_URL") {
        config.api_url = url;
    }

    if let Some(raw) = value("OPENDATA_REQUEST_TIMEOUT_MS") {
        match raw.parse::<u64>() {
            Ok(ms) => config.request_timeout_ms = Some(ms),
            Err(e) => log::warn!("Invalid OPENDATA_REQUEST_TIMEOUT_MS, ignoring: {}", e),
        }
    }

    if let Some(raw) = value("OPENDATA_SURFACE_SYNC_ERRORS") {
        match parse_flag(&raw) {
            Some(flag) => config.surface_sync_errors = flag,
            None => log::warn!("Invalid OPENDATA_SURFACE_SYNC_ERRORS {:?}, ignoring", raw),
        }
    }

    if let Some(raw) = value("OPENDATA_DESTRUCTIVE_FALLBACK") {
        match parse_flag(&raw) {
            Some(flag) => config.destructive_fallback = flag,
            None => log::warn!("Invalid OPENDATA_DESTRUCTIVE_FALLBACK {:?}, ignoring", raw),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn overrides(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = AppConfig::default();
        apply_overrides(&mut config, |key| env.get(key).cloned());
        config
    }

    #[test]
    fn test_defaults_keep_source_behaviour() {
        let config = AppConfig::default();
        assert!(!config.surface_sync_errors);
        assert!(!config.destructive_fallback);
        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = load_or_init_at(&path);
        assert!(path.exists());
        assert_eq!(load_from(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, r#"{"api_url": "http://localhost:8080/data", "request_timeout_ms": 1500}"#)
            .unwrap();

        let config = load_from(&path).unwrap().unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/data");
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.database_file, AppConfig::default().database_file);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_from(&path), Err(ConfigError::Parse(_))));
        let config = load_or_init_at(&path);
        assert_eq!(config.database_file, AppConfig::default().database_file);
    }

    #[test]
    fn test_env_overrides() {
        let config = overrides(&[
            ("OPENDATA_API_URL", " http://example.test/api "),
            ("OPENDATA_REQUEST_TIMEOUT_MS", "2500"),
            ("OPENDATA_SURFACE_SYNC_ERRORS", "yes"),
            ("OPENDATA_DESTRUCTIVE_FALLBACK", "1"),
        ]);
        assert_eq!(config.api_url, "http://example.test/api");
        assert_eq!(config.request_timeout_ms, Some(2500));
        assert!(config.surface_sync_errors);
        assert!(config.destructive_fallback);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let config = overrides(&[
            ("OPENDATA_REQUEST_TIMEOUT_MS", "soon"),
            ("OPENDATA_SURFACE_SYNC_ERRORS", "maybe"),
            ("OPENDATA_API_URL", "   "),
        ]);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_database_path_is_relative_to_app_dir() {
        let config = AppConfig::default();
        let path = config.database_path(Path::new("/data/app"));
        assert_eq!(path, Path::new("/data/app/opendata_jabar.db"));
    }
}
