//! Gateway shard health
//!
//! Each shard reports liveness from its own event path through a
//! [`ShardLiveness`] handle. The [`ShardMonitor`] notices silent shards and
//! restarts them through [`ShardControl`].

mod control;
mod liveness;
mod monitor;

pub use control::{ShardControl, ShardError};
pub use liveness::{ShardLiveness, ShardState, ShardStatus};
pub use monitor::{MonitorSettings, ShardMonitor};
