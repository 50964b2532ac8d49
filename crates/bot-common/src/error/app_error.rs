//! Application error types
//!
//! Unified error handling for the bot runtime.

use bot_core::CoreError;
use serde::Serialize;
use std::fmt;

use crate::config::ConfigError;
use crate::telemetry::TracingError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tracing(#[from] TracingError),

    // Inbound interaction errors
    #[error(transparent)]
    Core(#[from] CoreError),

    // Operation registry errors
    #[error("Operation error: {0}")]
    Operation(String),

    // Shard lifecycle errors
    #[error("Shard error: {0}")]
    Shard(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Get error code for logs and status output
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Tracing(_) => "TRACING_ERROR",
            Self::Core(e) => e.code(),
            Self::Operation(_) => "OPERATION_ERROR",
            Self::Shard(_) => "SHARD_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if the error happened at startup, before anything ran
    #[must_use]
    pub fn is_startup(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Tracing(_))
    }

    /// Create an operation error
    #[must_use]
    pub fn operation(msg: impl fmt::Display) -> Self {
        Self::Operation(msg.to_string())
    }

    /// Create a shard error
    #[must_use]
    pub fn shard(msg: impl fmt::Display) -> Self {
        Self::Shard(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

/// Error report for status output
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
