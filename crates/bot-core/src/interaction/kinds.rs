//! Interaction type codes
//!
//! Raw numeric codes Discord uses for interactions and message components,
//! and the closed set of kinds the bot routes to timed operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Interaction type as sent by Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InteractionType {
    Ping = 1,
    ApplicationCommand = 2,
    MessageComponent = 3,
    ApplicationCommandAutocomplete = 4,
    ModalSubmit = 5,
}

impl InteractionType {
    /// Create an `InteractionType` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Ping),
            2 => Some(Self::ApplicationCommand),
            3 => Some(Self::MessageComponent),
            4 => Some(Self::ApplicationCommandAutocomplete),
            5 => Some(Self::ModalSubmit),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Message component type as sent by Discord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ComponentType {
    ActionRow = 1,
    Button = 2,
    StringSelect = 3,
    TextInput = 4,
    UserSelect = 5,
    RoleSelect = 6,
    MentionableSelect = 7,
    ChannelSelect = 8,
}

impl ComponentType {
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::ActionRow),
            2 => Some(Self::Button),
            3 => Some(Self::StringSelect),
            4 => Some(Self::TextInput),
            5 => Some(Self::UserSelect),
            6 => Some(Self::RoleSelect),
            7 => Some(Self::MentionableSelect),
            8 => Some(Self::ChannelSelect),
            _ => None,
        }
    }

    /// Check if this component is one of the select menus
    #[must_use]
    pub const fn is_select_menu(self) -> bool {
        matches!(
            self,
            Self::StringSelect
                | Self::UserSelect
                | Self::RoleSelect
                | Self::MentionableSelect
                | Self::ChannelSelect
        )
    }
}

/// Kinds of interaction that can drive a timed operation
///
/// Every inbound interaction is classified into one of these exactly once,
/// before any registry lookup happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// A button on a tracked message was clicked
    Button,
    /// A select menu on a tracked message was used
    SelectMenu,
    /// A modal opened from a tracked message was submitted
    ModalSubmit,
}

impl InteractionKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Button => "button",
            Self::SelectMenu => "select_menu",
            Self::ModalSubmit => "modal_submit",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_type_from_u8() {
        assert_eq!(InteractionType::from_u8(3), Some(InteractionType::MessageComponent));
        assert_eq!(InteractionType::from_u8(5), Some(InteractionType::ModalSubmit));
        assert_eq!(InteractionType::from_u8(9), None);
        assert_eq!(InteractionType::Ping.as_u8(), 1);
    }

    #[test]
    fn test_component_select_menus() {
        assert!(ComponentType::StringSelect.is_select_menu());
        assert!(ComponentType::ChannelSelect.is_select_menu());
        assert!(!ComponentType::Button.is_select_menu());
        assert!(!ComponentType::TextInput.is_select_menu());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(InteractionKind::SelectMenu.to_string(), "select_menu");
        assert_eq!(
            serde_json::to_string(&InteractionKind::ModalSubmit).unwrap(),
            "\"modal_submit\""
        );
    }
}
