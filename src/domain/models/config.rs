use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::device::DeviceKind;

/// Main configuration structure for docsignals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Remote offload service
    #[serde(default)]
    pub remote: RemoteConfig,

    /// In-process execution defaults
    #[serde(default)]
    pub local: LocalConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote offload service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RemoteConfig {
    /// Base URL of the streaming execution service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Request timeout in seconds, covering the whole streamed response
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry policy for the request phase of a call
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_api_key_env() -> String {
    "DOCSIGNALS_API_KEY".to_string()
}

const fn default_timeout_secs() -> u64 {
    300
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy configuration.
///
/// `max_retries: 0` disables retries: a failed request surfaces as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    #[serde(default)]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// In-process execution defaults.
///
/// Selectors use the raw integer form: absent, negative (everything) or a
/// positive count. They are the lowest-precedence layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LocalConfig {
    /// Default batch size selector
    #[serde(default)]
    pub batch_size: Option<i64>,

    /// Default parallelism selector
    #[serde(default)]
    pub parallelism: Option<i64>,

    /// Accelerators present on this host. The CPU is always available.
    #[serde(default)]
    pub accelerators: Vec<DeviceKind>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files. Logs go to stderr only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file logs: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}
