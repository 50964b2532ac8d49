//! # bot-core
//!
//! Domain layer: snowflake identifiers, shard ids, and the classified
//! interaction events that drive timed operations.
//! This crate has no dependencies on runtime infrastructure.

pub mod error;
pub mod interaction;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use error::CoreError;
pub use interaction::{
    ComponentType, InteractionAck, InteractionEvent, InteractionKind, InteractionType,
    ResponseType,
};
pub use value_objects::{ShardId, Snowflake, SnowflakeParseError};
