//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CACHEGATE_*)
//! 2. TOML config file (if CACHEGATE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::{ConfigError, SUPPORTED_SCHEMES};

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (CACHEGATE_*)
/// 2. TOML config file (if CACHEGATE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// MongoDB connection string.
    ///
    /// Set via CACHEGATE_MONGODB_URI. When absent the server runs cache-only.
    #[serde(default)]
    pub mongodb_uri: Option<String>,

    /// Database the connection manager verifies against.
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Enables debug-level logging when RUST_LOG is not set.
    ///
    /// Set via CACHEGATE_DEBUG.
    #[serde(default)]
    pub debug: bool,

    /// Clears the cache store right after it is opened, before any reads.
    ///
    /// Set via CACHEGATE_RESET_CACHE.
    #[serde(default)]
    pub reset_cache: bool,

    /// Path to the SQLite cache database.
    ///
    /// Set via CACHEGATE_CACHE_PATH.
    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    /// Site whose content must be available before rendering starts.
    ///
    /// Set via CACHEGATE_SITE_ID.
    #[serde(default = "default_site_id")]
    pub site_id: String,

    /// Reachability probe timeout in milliseconds.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Driver server selection timeout in milliseconds.
    #[serde(default = "default_server_selection_timeout_ms")]
    pub server_selection_timeout_ms: u64,

    /// Driver initial connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound on a single socket round trip in milliseconds.
    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,
}

fn default_database_name() -> String {
    "site".into()
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("./cachegate-cache.sqlite")
}

fn default_site_id() -> String {
    "default".into()
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

fn default_server_selection_timeout_ms() -> u64 {
    5_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_socket_timeout_ms() -> u64 {
    45_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: None,
            database_name: default_database_name(),
            debug: false,
            reset_cache: false,
            cache_path: default_cache_path(),
            site_id: default_site_id(),
            probe_timeout_ms: default_probe_timeout_ms(),
            server_selection_timeout_ms: default_server_selection_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            socket_timeout_ms: default_socket_timeout_ms(),
        }
    }
}

impl AppConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CACHEGATE_`
    /// 2. TOML file from `CACHEGATE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CACHEGATE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CACHEGATE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The configured connection string, treating blank values as unset.
    pub fn database_uri(&self) -> Option<&str> {
        self.mongodb_uri.as_deref().map(str::trim).filter(|uri| !uri.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.mongodb_uri.is_none());
        assert_eq!(config.database_name, "site");
        assert!(!config.debug);
        assert!(!config.reset_cache);
        assert_eq!(config.cache_path, PathBuf::from("./cachegate-cache.sqlite"));
        assert_eq!(config.site_id, "default");
        assert_eq!(config.probe_timeout_ms, 3_000);
        assert_eq!(config.server_selection_timeout_ms, 5_000);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.socket_timeout_ms, 45_000);
    }

    #[test]
    fn test_timeout_durations() {
        let config = AppConfig::default();
        assert_eq!(config.probe_timeout(), Duration::from_millis(3_000));
        assert_eq!(config.server_selection_timeout(), Duration::from_millis(5_000));
        assert_eq!(config.connect_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.socket_timeout(), Duration::from_millis(45_000));
    }

    #[test]
    fn test_blank_uri_is_unset() {
        let config = AppConfig { mongodb_uri: Some("   ".into()), ..Default::default() };
        assert!(config.database_uri().is_none());
    }

    #[test]
    fn test_database_uri_trimmed() {
        let config = AppConfig { mongodb_uri: Some(" mongodb://localhost:27017 ".into()), ..Default::default() };
        assert_eq!(config.database_uri(), Some("mongodb://localhost:27017"));
    }

    #[test]
    fn test_load_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("CACHEGATE_MONGODB_URI", "mongodb://db.internal:27018/site");
            jail.set_env("CACHEGATE_SITE_ID", "marketing");
            jail.set_env("CACHEGATE_RESET_CACHE", "true");
            jail.set_env("CACHEGATE_PROBE_TIMEOUT_MS", "1500");

            let config = AppConfig::load().map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.database_uri(), Some("mongodb://db.internal:27018/site"));
            assert_eq!(config.site_id, "marketing");
            assert!(config.reset_cache);
            assert!(!config.debug);
            assert_eq!(config.probe_timeout_ms, 1_500);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("cachegate.toml", "site_id = \"from-file\"\ndebug = true\n")?;
            jail.set_env("CACHEGATE_CONFIG_FILE", "cachegate.toml");
            jail.set_env("CACHEGATE_SITE_ID", "from-env");

            let config = AppConfig::load().map_err(|e| figment::Error::from(e.to_string()))?;
            assert_eq!(config.site_id, "from-env");
            assert!(config.debug);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("CACHEGATE_PROBE_TIMEOUT_MS", "10");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "probe_timeout_ms"));
            Ok(())
        });
    }
}
