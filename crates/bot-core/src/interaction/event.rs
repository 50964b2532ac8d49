//! Classified interaction events
//!
//! Raw interaction JSON is decoded and classified here, at the boundary,
//! into an [`InteractionEvent`] carrying the key of the message it belongs to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ComponentType, InteractionKind, InteractionType};
use crate::error::CoreError;
use crate::value_objects::Snowflake;

/// An interaction tied to a bot message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Interaction ID
    pub id: Snowflake,
    /// Interaction token, needed to acknowledge
    pub token: String,
    /// Classified kind
    pub kind: InteractionKind,
    /// Message the interaction originated from (operation key)
    pub message_id: Snowflake,
    /// Channel of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    /// Guild of the message (None in DMs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    /// User who triggered the interaction
    pub user_id: Snowflake,
    /// Developer-defined component or modal ID
    pub custom_id: String,
    /// Selected values (select menus) or submitted field values (modals)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    /// Raw payload as received
    #[serde(default)]
    pub payload: Value,
}

impl InteractionEvent {
    /// Create an event directly, without a raw payload
    #[must_use]
    pub fn new(kind: InteractionKind, message_id: Snowflake, custom_id: impl Into<String>) -> Self {
        Self {
            id: Snowflake::default(),
            token: String::new(),
            kind,
            message_id,
            channel_id: None,
            guild_id: None,
            user_id: Snowflake::default(),
            custom_id: custom_id.into(),
            values: Vec::new(),
            payload: Value::Null,
        }
    }

    /// Set the user who triggered the interaction
    #[must_use]
    pub fn with_user(mut self, user_id: Snowflake) -> Self {
        self.user_id = user_id;
        self
    }

    /// Set the interaction id and token
    #[must_use]
    pub fn with_token(mut self, id: Snowflake, token: impl Into<String>) -> Self {
        self.id = id;
        self.token = token.into();
        self
    }

    /// Set the selected or submitted values
    #[must_use]
    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = values;
        self
    }

    /// Operation key this event routes to
    #[inline]
    pub fn key(&self) -> Snowflake {
        self.message_id
    }

    /// Decode and classify a raw interaction payload
    ///
    /// Only interactions attached to a message are accepted: component
    /// interactions (buttons and select menus) and modal submits opened from
    /// a component. Pings, slash commands and autocomplete are rejected.
    pub fn classify(payload: Value) -> Result<Self, CoreError> {
        let raw: RawInteraction =
            serde_json::from_value(payload.clone()).map_err(|e| CoreError::Decode(e.to_string()))?;

        let interaction_type = InteractionType::from_u8(raw.kind)
            .ok_or(CoreError::UnknownInteractionType(raw.kind))?;

        if !matches!(
            interaction_type,
            InteractionType::MessageComponent | InteractionType::ModalSubmit
        ) {
            return Err(CoreError::UnsupportedInteraction(interaction_type.as_u8()));
        }

        let data = raw.data.ok_or(CoreError::MissingField("data"))?;

        let (kind, values) = match interaction_type {
            InteractionType::MessageComponent => {
                let code = data
                    .component_type
                    .ok_or(CoreError::MissingField("data.component_type"))?;
                let component =
                    ComponentType::from_u8(code).ok_or(CoreError::UnsupportedComponent(code))?;

                if component == ComponentType::Button {
                    (InteractionKind::Button, Vec::new())
                } else if component.is_select_menu() {
                    (InteractionKind::SelectMenu, data.values)
                } else {
                    return Err(CoreError::UnsupportedComponent(code));
                }
            }
            InteractionType::ModalSubmit => {
                let values = data
                    .components
                    .into_iter()
                    .flat_map(|row| row.components)
                    .filter_map(|input| input.value)
                    .collect();
                (InteractionKind::ModalSubmit, values)
            }
            other => return Err(CoreError::UnsupportedInteraction(other.as_u8())),
        };

        let message_id = raw
            .message
            .map(|m| m.id)
            .ok_or(CoreError::MissingField("message"))?;

        // Guild interactions carry `member.user`, DMs carry `user`
        let user_id = raw
            .member
            .and_then(|m| m.user)
            .or(raw.user)
            .map(|u| u.id)
            .ok_or(CoreError::MissingField("user"))?;

        Ok(Self {
            id: raw.id,
            token: raw.token,
            kind,
            message_id,
            channel_id: raw.channel_id,
            guild_id: raw.guild_id,
            user_id,
            custom_id: data.custom_id,
            values,
            payload,
        })
    }

    /// Decode and classify a raw interaction from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(json).map_err(|e| CoreError::Decode(e.to_string()))?;
        Self::classify(value)
    }
}

// === Raw wire shapes ===

#[derive(Debug, Deserialize)]
struct RawInteraction {
    id: Snowflake,
    #[serde(rename = "type")]
    kind: u8,
    token: String,
    #[serde(default)]
    guild_id: Option<Snowflake>,
    #[serde(default)]
    channel_id: Option<Snowflake>,
    #[serde(default)]
    member: Option<RawMember>,
    #[serde(default)]
    user: Option<RawUser>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    data: Option<RawData>,
}

#[derive(Debug, Deserialize)]
struct RawMember {
    #[serde(default)]
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: Snowflake,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: Snowflake,
}

#[derive(Debug, Deserialize)]
struct RawData {
    #[serde(default)]
    custom_id: String,
    #[serde(default)]
    component_type: Option<u8>,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    components: Vec<RawActionRow>,
}

#[derive(Debug, Deserialize)]
struct RawActionRow {
    #[serde(default)]
    components: Vec<RawTextInput>,
}

#[derive(Debug, Deserialize)]
struct RawTextInput {
    #[serde(default)]
    value: Option<String>,
}
