//! Task scheduling
//!
//! A [`TaskPool`] runs hooks and restarts off the calling task, and a
//! [`PeriodicTask`] drives a fixed-period background loop. Both are
//! owned by whoever starts them and stopped explicitly.

mod periodic;
mod pool;

pub use periodic::{PeriodicTask, TickFlow};
pub use pool::TaskPool;

use async_trait::async_trait;

/// A background service with an explicit start/stop lifecycle
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Start background work; calling twice is a no-op
    fn start(&self);

    /// Stop background work and wait for it to finish
    async fn shutdown(&self);
}
