//! Application settings configuration
//!
//! Defines connection, analysis and HTTP service settings.

use crate::certificate::analysis::DEFAULT_EXPIRING_SOON_DAYS;
use crate::utils::ConfigError;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Connection settings for certificate retrieval
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub port: u16,
    pub timeout_ms: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            port: 443,
            timeout_ms: 10_000,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Analyzer thresholds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub expiring_soon_days: i64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            expiring_soon_days: DEFAULT_EXPIRING_SOON_DAYS,
        }
    }
}

/// HTTP service settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
    pub history_limit: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            history_limit: 50,
        }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind.parse().map_err(|_| ConfigError::InvalidValue {
            key: "server.bind".to_string(),
            message: format!("'{}' is not a socket address", self.bind),
        })
    }
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub analysis: AnalysisSettings,
    pub server: ServerSettings,
}

impl Settings {
    /// Load settings from the default config file
    pub fn load_default() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_PATH);
        if config_path.exists() {
            Self::load_from_file(config_path)
        } else {
            tracing::debug!("No {} found, using built-in settings", DEFAULT_CONFIG_PATH);
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.port".to_string(),
                message: "must be between 1 and 65535".to_string(),
            });
        }
        if self.fetch.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.timeout_ms".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.analysis.expiring_soon_days < 0 {
            return Err(ConfigError::InvalidValue {
                key: "analysis.expiring_soon_days".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        self.server.bind_addr()?;
        Ok(())
    }
}
