//! Configuration management for the qbench server.
//!
//! Supports loading configuration from:
//! 1. Configuration files (YAML)
//! 2. Environment variables (`QBENCH_*` and `RABBITMQ_*`)
//! 3. .env files
//!
//! Configuration precedence (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use qbench_sched::{QueueSettings, UnknownStatusPolicy};
use serde::{Deserialize, Serialize};

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Run state storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Message broker configuration
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_address")]
    pub address: String,
}

/// Run state storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "memory" or "sqlite"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Database file for the sqlite backend
    #[serde(default = "default_sqlite_path")]
    pub path: String,
}

/// Message broker settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker backend: "memory" or "amqp"
    #[serde(default = "default_broker_backend")]
    pub backend: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_password")]
    pub password: String,

    #[serde(default = "default_vhost")]
    pub vhost: String,

    #[serde(default = "default_task_queue")]
    pub task_queue: String,

    #[serde(default = "default_result_queue")]
    pub result_queue: String,

    /// Attempts to open a connection before giving up
    #[serde(default = "default_attempts")]
    pub connection_attempts: u32,

    /// Pause between connection attempts, in seconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_seconds: u64,

    /// Attempts to publish one task
    #[serde(default = "default_attempts")]
    pub publish_attempts: u32,

    /// Unacknowledged result messages per consumer
    #[serde(default = "default_prefetch")]
    pub prefetch: u16,

    /// Handling of result messages with an unrecognised status
    #[serde(default)]
    pub unknown_status: UnknownStatusPolicy,
}

impl fmt::Debug for BrokerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("vhost", &self.vhost)
            .field("task_queue", &self.task_queue)
            .field("result_queue", &self.result_queue)
            .field("connection_attempts", &self.connection_attempts)
            .field("retry_delay_seconds", &self.retry_delay_seconds)
            .field("publish_attempts", &self.publish_attempts)
            .field("prefetch", &self.prefetch)
            .field("unknown_status", &self.unknown_status)
            .finish()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "console" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_sqlite_path() -> String {
    "qbench.db".to_string()
}

fn default_broker_backend() -> String {
    "memory".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5672
}

fn default_user() -> String {
    "guest".to_string()
}

fn default_password() -> String {
    "guest".to_string()
}

fn default_vhost() -> String {
    "/".to_string()
}

fn default_task_queue() -> String {
    qbench_sched::broker::DEFAULT_TASK_QUEUE.to_string()
}

fn default_result_queue() -> String {
    qbench_sched::broker::DEFAULT_RESULT_QUEUE.to_string()
}

fn default_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    3
}

fn default_prefetch() -> u16 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "console".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            path: default_sqlite_path(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            backend: default_broker_backend(),
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: default_password(),
            vhost: default_vhost(),
            task_queue: default_task_queue(),
            result_queue: default_result_queue(),
            connection_attempts: default_attempts(),
            retry_delay_seconds: default_retry_delay(),
            publish_attempts: default_attempts(),
            prefetch: default_prefetch(),
            unknown_status: UnknownStatusPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BrokerConfig {
    /// Queue names and retry budgets for the pipeline.
    pub fn queue_settings(&self) -> QueueSettings {
        QueueSettings {
            task_queue: self.task_queue.clone(),
            result_queue: self.result_queue.clone(),
            connection_attempts: self.connection_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_seconds),
            publish_attempts: self.publish_attempts,
            prefetch: self.prefetch,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml_ng::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with the following precedence:
    /// 1. Load .env file if it exists
    /// 2. Load from file if provided
    /// 3. Apply environment variable overrides
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => Config::default(),
        };

        let config = config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    fn merge_env(self) -> Result<Self, ConfigError> {
        self.merge_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Only variables that are set override the current values. Numeric
    /// variables that do not parse are rejected.
    pub fn merge_vars<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(v) = lookup("QBENCH_BIND") {
            self.server.address = v;
        }

        // Storage
        if let Some(v) = lookup("QBENCH_STORAGE") {
            self.storage.backend = v;
        }
        if let Some(v) = lookup("QBENCH_SQLITE_PATH") {
            self.storage.path = v;
        }

        // Broker
        if let Some(v) = lookup("QBENCH_BROKER") {
            self.broker.backend = v;
        }
        if let Some(v) = lookup("RABBITMQ_HOST") {
            self.broker.host = v;
        }
        if let Some(v) = lookup("RABBITMQ_PORT") {
            self.broker.port = parse_var("RABBITMQ_PORT", &v)?;
        }
        if let Some(v) = lookup("RABBITMQ_USER") {
            self.broker.user = v;
        }
        if let Some(v) = lookup("RABBITMQ_PASS") {
            self.broker.password = v;
        }
        if let Some(v) = lookup("RABBITMQ_VHOST") {
            self.broker.vhost = v;
        }
        if let Some(v) = lookup("QBENCH_TASK_QUEUE") {
            self.broker.task_queue = v;
        }
        if let Some(v) = lookup("QBENCH_RESULT_QUEUE") {
            self.broker.result_queue = v;
        }

        // Logging
        if let Some(v) = lookup("QBENCH_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = lookup("QBENCH_LOG_FORMAT") {
            self.logging.format = v;
        }

        Ok(self)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_address()?;

        match self.storage.backend.as_str() {
            "memory" => {}
            "sqlite" => {
                if self.storage.path.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "sqlite storage requires a path".to_string(),
                    ));
                }
            }
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown storage backend: {other}"
                )));
            }
        }

        let broker = &self.broker;
        match broker.backend.as_str() {
            "memory" | "amqp" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Unknown broker backend: {other}"
                )));
            }
        }
        if broker.task_queue.is_empty() || broker.result_queue.is_empty() {
            return Err(ConfigError::ValidationError(
                "queue names must not be empty".to_string(),
            ));
        }
        if broker.task_queue == broker.result_queue {
            return Err(ConfigError::ValidationError(format!(
                "task and result queue must differ (both '{}')",
                broker.task_queue
            )));
        }
        if broker.connection_attempts == 0 || broker.publish_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "connection_attempts and publish_attempts must be greater than 0".to_string(),
            ));
        }
        if broker.prefetch == 0 {
            return Err(ConfigError::ValidationError(
                "prefetch must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log level: {other}"
                )));
            }
        }

        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid log format: {other}"
                )));
            }
        }

        Ok(())
    }

    /// Get the parsed HTTP bind address.
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        self.server.address.parse().map_err(|_| {
            ConfigError::ValidationError(format!("Invalid bind address: {}", self.server.address))
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("Invalid value for {key}: {value}")))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
