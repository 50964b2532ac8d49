//! Outbound shard control

use async_trait::async_trait;
use bot_common::AppError;
use bot_core::ShardId;
use std::time::Duration;

/// Restart capability of one gateway shard
#[async_trait]
pub trait ShardControl: Send + Sync + 'static {
    /// Shard this control belongs to
    fn id(&self) -> ShardId;

    /// Tear down and reconnect the shard
    ///
    /// Resolves once the shard reports it is connected again. The monitor
    /// bounds the wait, so implementations need no timeout of their own.
    async fn restart(&self) -> Result<(), ShardError>;
}

/// Shard lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardError {
    #[error("{shard} failed to restart: {reason}")]
    RestartFailed { shard: ShardId, reason: String },

    #[error("{shard} did not come back within {waited:?}")]
    RestartTimedOut { shard: ShardId, waited: Duration },

    #[error("{0} is not registered")]
    UnknownShard(ShardId),

    #[error("{0} is already restarting")]
    AlreadyRestarting(ShardId),

    #[error("{0} is already registered")]
    AlreadyRegistered(ShardId),

    #[error("{shard} is outside the configured shard count {count}")]
    OutOfRange { shard: ShardId, count: u32 },

    #[error("Monitor setting {0} must be non-zero")]
    InvalidSetting(&'static str),
}

impl ShardError {
    /// Create a restart failure
    pub fn restart_failed(shard: ShardId, reason: impl Into<String>) -> Self {
        Self::RestartFailed {
            shard,
            reason: reason.into(),
        }
    }

    /// Get error code for logs and status output
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::RestartFailed { .. } => "RESTART_FAILED",
            Self::RestartTimedOut { .. } => "RESTART_TIMED_OUT",
            Self::UnknownShard(_) => "UNKNOWN_SHARD",
            Self::AlreadyRestarting(_) => "ALREADY_RESTARTING",
            Self::AlreadyRegistered(_) => "ALREADY_REGISTERED",
            Self::OutOfRange { .. } => "SHARD_OUT_OF_RANGE",
            Self::InvalidSetting(_) => "INVALID_MONITOR_SETTING",
        }
    }

    /// Check if the error came from a restart attempt
    #[must_use]
    pub fn is_restart_failure(&self) -> bool {
        matches!(self, Self::RestartFailed { .. } | Self::RestartTimedOut { .. })
    }
}

impl From<ShardError> for AppError {
    fn from(err: ShardError) -> Self {
        AppError::shard(err)
    }
}
