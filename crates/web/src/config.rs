//! Server configuration, loadable from JSON.
//!
//! Every field has a default, so a partial document such as
//!
//! ```json
//! { "address": "0.0.0.0:9000", "connection": { "require_encryption": true } }
//! ```
//!
//! is enough.

use std::io;
use std::path::Path;

use sealed_http::connection::ConnectionConfig;
use serde::Deserialize;
use thiserror::Error;
use tracing::Level;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid log level '{level}': {source}")]
    LogLevel {
        level: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` to bind
    pub address: String,
    pub connection: ConnectionSettings,
    /// Maximum level for the installed subscriber; none installs nothing
    pub log_level: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: DEFAULT_ADDRESS.to_owned(), connection: ConnectionSettings::default(), log_level: None }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.log_level()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = Some(level.to_string());
        self
    }

    pub fn log_level(&self) -> Result<Option<Level>, ConfigError> {
        self.log_level
            .as_deref()
            .map(|level| level.parse::<Level>().map_err(|source| ConfigError::LogLevel { level: level.to_owned(), source: source.into() }))
            .transpose()
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        self.connection.clone().into()
    }
}

/// The serializable mirror of [`ConnectionConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
    pub read_buffer_capacity: usize,
    pub rsa_key_bits: usize,
    pub require_encryption: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        ConnectionConfig::default().into()
    }
}

impl From<ConnectionConfig> for ConnectionSettings {
    fn from(config: ConnectionConfig) -> Self {
        Self {
            max_header_bytes: config.max_header_bytes,
            max_body_bytes: config.max_body_bytes,
            read_buffer_capacity: config.read_buffer_capacity,
            rsa_key_bits: config.rsa_key_bits,
            require_encryption: config.require_encryption,
        }
    }
}

impl From<ConnectionSettings> for ConnectionConfig {
    fn from(settings: ConnectionSettings) -> Self {
        ConnectionConfig::default()
            .max_header_bytes(settings.max_header_bytes)
            .max_body_bytes(settings.max_body_bytes)
            .read_buffer_capacity(settings.read_buffer_capacity)
            .rsa_key_bits(settings.rsa_key_bits)
            .require_encryption(settings.require_encryption)
    }
}
