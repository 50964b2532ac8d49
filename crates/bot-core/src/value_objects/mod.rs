//! Value objects - immutable identifiers

mod shard_id;
mod snowflake;

pub use shard_id::ShardId;
pub use snowflake::{Snowflake, SnowflakeParseError};
