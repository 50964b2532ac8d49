//! Operation registry errors

use bot_common::AppError;
use std::time::Duration;

/// Errors rejected at the registration boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Operation timeout must be between 1ms and the clock limit, got {0:?}")]
    InvalidTimeout(Duration),

    #[error("Sweep period must be non-zero")]
    InvalidPeriod(Duration),
}

impl RegistryError {
    /// Get error code for logs
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTimeout(_) => "INVALID_TIMEOUT",
            Self::InvalidPeriod(_) => "INVALID_PERIOD",
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        AppError::operation(err)
    }
}
