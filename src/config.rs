//! Configuration module for filedepot.

use serde::Deserialize;
use std::path::Path;

use crate::file::DEFAULT_MAX_FILE_SIZE;
use crate::{DepotError, Result};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (multipart framing included).
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// CORS allowed origins. Empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_request_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_request_bytes: default_max_request_bytes(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/filedepot.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Path to the blob storage directory.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum file size in bytes (exclusive).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_storage_path() -> String {
    "data/files".to_string()
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filedepot.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DepotError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DepotError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEDEPOT_API_HOST`: bind address
    /// - `FILEDEPOT_API_PORT`: listen port
    /// - `FILEDEPOT_MAX_FILE_SIZE`: maximum file size in bytes
    /// - `FILEDEPOT_STORAGE_DIR`: blob storage directory
    /// - `FILEDEPOT_DATABASE_PATH`: SQLite database file
    /// - `FILEDEPOT_LOG_LEVEL`: log level
    ///
    /// Empty values are ignored, as are numbers that fail to parse.
    pub fn apply_env_overrides(&mut self) {
        if let Some(host) = env_value("FILEDEPOT_API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("FILEDEPOT_API_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(size) = env_value("FILEDEPOT_MAX_FILE_SIZE").and_then(|v| v.parse().ok()) {
            self.files.max_file_size = size;
        }
        if let Some(dir) = env_value("FILEDEPOT_STORAGE_DIR") {
            self.files.storage_path = dir;
        }
        if let Some(path) = env_value("FILEDEPOT_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(level) = env_value("FILEDEPOT_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - `files.max_file_size` is zero
    /// - `files.storage_path` is empty
    /// - `server.max_request_bytes` is smaller than `files.max_file_size`
    pub fn validate(&self) -> Result<()> {
        if self.files.max_file_size == 0 {
            return Err(DepotError::Config(
                "files.max_file_size must be greater than zero".to_string(),
            ));
        }
        // Sizes are stored as SQLite INTEGER.
        if i64::try_from(self.files.max_file_size).is_err() {
            return Err(DepotError::Config(format!(
                "files.max_file_size must not exceed {}",
                i64::MAX
            )));
        }
        if self.files.storage_path.trim().is_empty() {
            return Err(DepotError::Config(
                "files.storage_path must not be empty".to_string(),
            ));
        }
        if (self.server.max_request_bytes as u64) < self.files.max_file_size {
            return Err(DepotError::Config(format!(
                "server.max_request_bytes ({}) is smaller than files.max_file_size ({})",
                self.server.max_request_bytes, self.files.max_file_size
            )));
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
