//! Fixed-period background loop

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::TaskPool;

/// Whether a periodic loop should keep running after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// A loop that calls `tick` every `period` until stopped
///
/// The first tick happens one full period after start. Ticks that overrun
/// delay the schedule instead of bursting. Dropping the task stops the loop.
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// Start the loop on `pool`
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn start<F, Fut>(pool: &TaskPool, name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickFlow> + Send + 'static,
    {
        assert!(!period.is_zero(), "periodic task {name} needs a non-zero period");

        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let handle = pool.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::debug!(task = name, period_ms = period.as_millis(), "Periodic task started");

            loop {
                tokio::select! {
                    // Stop requested, or the owner was dropped
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if tick().await == TickFlow::Stop {
                            break;
                        }
                    }
                }
            }

            tracing::debug!(task = name, "Periodic task ended");
        });

        Self {
            name,
            period,
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Configured period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Check if the loop is still running
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to stop without waiting for it
    pub fn stop(&self) {
        // Fails only if the loop already ended
        let _ = self.shutdown.send(true);
    }

    /// Stop the loop and wait for the current tick to finish
    pub async fn shutdown(&self) {
        self.stop();

        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(task = self.name, error = %e, "Periodic task ended abnormally");
            }
        }
    }
}

impl std::fmt::Debug for PeriodicTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("name", &self.name)
            .field("period", &self.period)
            .finish()
    }
}
