//! Core errors - failures classifying inbound interactions

use thiserror::Error;

use crate::value_objects::SnowflakeParseError;

/// Core layer errors
#[derive(Debug, Error)]
pub enum CoreError {
    // =========================================================================
    // Decoding Errors
    // =========================================================================
    #[error("Failed to decode interaction: {0}")]
    Decode(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    InvalidSnowflake(#[from] SnowflakeParseError),

    // =========================================================================
    // Classification Errors
    // =========================================================================
    #[error("Unknown interaction type: {0}")]
    UnknownInteractionType(u8),

    #[error("Interaction type {0} is not tied to a message")]
    UnsupportedInteraction(u8),

    #[error("Unsupported component type: {0}")]
    UnsupportedComponent(u8),
}

impl CoreError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DECODE_ERROR",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidSnowflake(_) => "INVALID_SNOWFLAKE",
            Self::UnknownInteractionType(_) => "UNKNOWN_INTERACTION_TYPE",
            Self::UnsupportedInteraction(_) => "UNSUPPORTED_INTERACTION",
            Self::UnsupportedComponent(_) => "UNSUPPORTED_COMPONENT",
        }
    }

    /// Check if the payload itself was malformed, as opposed to well-formed
    /// but not routable to an operation
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::MissingField(_) | Self::InvalidSnowflake(_)
        )
    }
}
