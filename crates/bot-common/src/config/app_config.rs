//! Application configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
///
/// Deserializing runs [`validate`](AppConfig::validate), as does `from_env`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawAppConfig")]
pub struct AppConfig {
    pub app: AppSettings,
    pub operations: OperationConfig,
    pub shards: ShardConfig,
}

/// Unvalidated wire form of [`AppConfig`]
#[derive(Deserialize)]
struct RawAppConfig {
    app: AppSettings,
    operations: OperationConfig,
    shards: ShardConfig,
}

impl TryFrom<RawAppConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAppConfig) -> Result<Self, Self::Error> {
        let config = Self {
            app: raw.app,
            operations: raw.operations,
            shards: raw.shards,
        };
        config.validate()?;
        Ok(config)
    }
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Timed interactive operations (menus, lobbies)
#[derive(Debug, Clone, Deserialize)]
pub struct OperationConfig {
    /// How often the timeout sweeper scans for expired operations
    #[serde(default = "default_sweep_period_ms")]
    pub sweep_period_ms: u64,
    /// Timeout applied when a caller does not pick one
    #[serde(default = "default_operation_timeout_ms")]
    pub default_timeout_ms: u64,
    /// Capacity of the outbound acknowledgement queue
    #[serde(default = "default_ack_buffer")]
    pub ack_buffer: usize,
}

impl OperationConfig {
    #[must_use]
    pub fn sweep_period(&self) -> Duration {
        Duration::from_millis(self.sweep_period_ms)
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

impl Default for OperationConfig {
    fn default() -> Self {
        Self {
            sweep_period_ms: default_sweep_period_ms(),
            default_timeout_ms: default_operation_timeout_ms(),
            ack_buffer: default_ack_buffer(),
        }
    }
}

/// Shard health monitoring
#[derive(Debug, Clone, Deserialize)]
pub struct ShardConfig {
    /// Number of gateway shards
    #[serde(default = "default_shard_count")]
    pub count: u32,
    /// Silence after which a shard is suspected dead
    #[serde(default = "default_liveness_threshold_ms")]
    pub liveness_threshold_ms: u64,
    /// Period of the staleness probe
    #[serde(default = "default_probe_period_ms")]
    pub probe_period_ms: u64,
    /// Period of the dead-shard confirmation pass
    #[serde(default = "default_check_period_ms")]
    pub check_period_ms: u64,
    /// Upper bound on a single restart attempt
    #[serde(default = "default_restart_wait_ms")]
    pub restart_wait_ms: u64,
}

impl ShardConfig {
    #[must_use]
    pub fn liveness_threshold(&self) -> Duration {
        Duration::from_millis(self.liveness_threshold_ms)
    }

    #[must_use]
    pub fn probe_period(&self) -> Duration {
        Duration::from_millis(self.probe_period_ms)
    }

    #[must_use]
    pub fn check_period(&self) -> Duration {
        Duration::from_millis(self.check_period_ms)
    }

    #[must_use]
    pub fn restart_wait(&self) -> Duration {
        Duration::from_millis(self.restart_wait_ms)
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            count: default_shard_count(),
            liveness_threshold_ms: default_liveness_threshold_ms(),
            probe_period_ms: default_probe_period_ms(),
            check_period_ms: default_check_period_ms(),
            restart_wait_ms: default_restart_wait_ms(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "discord-bot".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_sweep_period_ms() -> u64 {
    1_000
}

fn default_operation_timeout_ms() -> u64 {
    300_000 // 5 minutes
}

fn default_ack_buffer() -> usize {
    256
}

fn default_shard_count() -> u32 {
    1
}

fn default_liveness_threshold_ms() -> u64 {
    30_000
}

fn default_probe_period_ms() -> u64 {
    10_000
}

fn default_check_period_ms() -> u64 {
    60_000
}

fn default_restart_wait_ms() -> u64 {
    120_000 // 2 minutes
}

/// Read an optional numeric variable, falling back to `default` when unset
fn parse_var<T: std::str::FromStr>(name: &'static str, default: fn() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default()),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Every setting has a default; only malformed or zero values are rejected.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            operations: OperationConfig {
                sweep_period_ms: parse_var("OPERATION_SWEEP_PERIOD_MS", default_sweep_period_ms)?,
                default_timeout_ms: parse_var(
                    "OPERATION_DEFAULT_TIMEOUT_MS",
                    default_operation_timeout_ms,
                )?,
                ack_buffer: parse_var("ACK_BUFFER", default_ack_buffer)?,
            },
            shards: ShardConfig {
                count: parse_var("SHARD_COUNT", default_shard_count)?,
                liveness_threshold_ms: parse_var(
                    "SHARD_LIVENESS_THRESHOLD_MS",
                    default_liveness_threshold_ms,
                )?,
                probe_period_ms: parse_var("SHARD_PROBE_PERIOD_MS", default_probe_period_ms)?,
                check_period_ms: parse_var("SHARD_CHECK_PERIOD_MS", default_check_period_ms)?,
                restart_wait_ms: parse_var("SHARD_RESTART_WAIT_MS", default_restart_wait_ms)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot work with
    ///
    /// Every period, timeout, buffer and the shard count must be non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let operations = &self.operations;
        let shards = &self.shards;
        let settings = [
            ("OPERATION_SWEEP_PERIOD_MS", operations.sweep_period_ms),
            ("OPERATION_DEFAULT_TIMEOUT_MS", operations.default_timeout_ms),
            ("ACK_BUFFER", operations.ack_buffer as u64),
            ("SHARD_COUNT", u64::from(shards.count)),
            ("SHARD_LIVENESS_THRESHOLD_MS", shards.liveness_threshold_ms),
            ("SHARD_PROBE_PERIOD_MS", shards.probe_period_ms),
            ("SHARD_CHECK_PERIOD_MS", shards.check_period_ms),
            ("SHARD_RESTART_WAIT_MS", shards.restart_wait_ms),
        ];

        match settings.into_iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::InvalidValue(name, "0".to_string())),
            None => Ok(()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSettings {
                name: default_app_name(),
                env: default_env(),
            },
            operations: OperationConfig::default(),
            shards: ShardConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
