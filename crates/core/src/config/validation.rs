//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;

/// Connection string schemes accepted by the document database driver.
pub const SUPPORTED_SCHEMES: &[&str] = &["mongodb", "mongodb+srv"];

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn check_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value < MIN_TIMEOUT_MS {
        return Err(ConfigError::Invalid { field: field.into(), reason: "must be at least 100ms".into() });
    }
    if value > MAX_TIMEOUT_MS {
        return Err(ConfigError::Invalid {
            field: field.into(),
            reason: "must not exceed 5 minutes (300000ms)".into(),
        });
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `site_id` or `database_name` is empty
    /// - any timeout is below 100ms or exceeds 5 minutes
    /// - `mongodb_uri` is set but does not use a `mongodb` scheme
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_id.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "site_id".into(), reason: "must not be empty".into() });
        }
        if self.database_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "database_name".into(), reason: "must not be empty".into() });
        }

        check_timeout("probe_timeout_ms", self.probe_timeout_ms)?;
        check_timeout("server_selection_timeout_ms", self.server_selection_timeout_ms)?;
        check_timeout("connect_timeout_ms", self.connect_timeout_ms)?;
        check_timeout("socket_timeout_ms", self.socket_timeout_ms)?;

        if let Some(uri) = self.database_uri() {
            // the driver matches schemes case-sensitively
            match uri.split_once("://").map(|(scheme, _)| scheme) {
                Some(s) if SUPPORTED_SCHEMES.contains(&s) => {}
                Some(s) => {
                    return Err(ConfigError::Invalid {
                        field: "mongodb_uri".into(),
                        reason: format!("unsupported scheme: {s}"),
                    });
                }
                None => {
                    return Err(ConfigError::Invalid {
                        field: "mongodb_uri".into(),
                        reason: "missing scheme (expected mongodb:// or mongodb+srv://)".into(),
                    });
                }
            }
        } else {
            tracing::debug!("no database URI configured; bootstrap will assume cache-only operation");
        }

        if self.probe_timeout_ms > self.server_selection_timeout_ms {
            tracing::warn!(
                probe_timeout_ms = self.probe_timeout_ms,
                server_selection_timeout_ms = self.server_selection_timeout_ms,
                "probe timeout exceeds server selection timeout"
            );
        }

        Ok(())
    }
}
