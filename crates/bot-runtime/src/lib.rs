//! # bot-runtime
//!
//! Timed interactive operations, their timeout sweeper, interaction dispatch
//! and shard health monitoring.

pub mod dispatch;
pub mod operation;
pub mod runtime;
pub mod scheduler;
pub mod shard;

// Re-export commonly used types at crate root
pub use dispatch::{
    AckSender, Acknowledge, DispatchListener, DispatchOutcome, DispatchRouter, EventRoute, NoAck,
};
pub use operation::{
    EventOutcome, OperationHandle, OperationHandler, OperationRef, OperationRegistry,
    OperationResult, RegistryError,
};
pub use runtime::BotRuntime;
pub use scheduler::{Lifecycle, PeriodicTask, TaskPool, TickFlow};
pub use shard::{
    MonitorSettings, ShardControl, ShardError, ShardLiveness, ShardMonitor, ShardState,
    ShardStatus,
};
