//! Interaction acknowledgements

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::InteractionEvent;
use crate::value_objects::Snowflake;

/// Interaction callback type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseType {
    Pong = 1,
    ChannelMessageWithSource = 4,
    DeferredChannelMessageWithSource = 5,
    /// Acknowledge a component interaction, edit the message later
    DeferredUpdateMessage = 6,
    UpdateMessage = 7,
}

impl ResponseType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Pong),
            4 => Some(Self::ChannelMessageWithSource),
            5 => Some(Self::DeferredChannelMessageWithSource),
            6 => Some(Self::DeferredUpdateMessage),
            7 => Some(Self::UpdateMessage),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl Serialize for ResponseType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ResponseType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid response type: {value}")))
    }
}

/// Acknowledgement of a received interaction
///
/// Sent before the handler runs so the client does not show the
/// "interaction failed" indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionAck {
    pub interaction_id: Snowflake,
    pub token: String,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
}

impl InteractionAck {
    /// Deferred update for a component or modal interaction
    #[must_use]
    pub fn deferred_update(event: &InteractionEvent) -> Self {
        Self {
            interaction_id: event.id,
            token: event.token.clone(),
            response_type: ResponseType::DeferredUpdateMessage,
        }
    }
}
