//! Per-shard health record

use bot_core::ShardId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::ShardControl;

/// Health state of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardState {
    /// Reporting liveness within the threshold
    Alive,
    /// Silent past the threshold, awaiting confirmation
    Suspect,
    /// A restart attempt is in flight
    Restarting,
    /// The last restart failed; left for manual intervention
    Failed,
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alive => "alive",
            Self::Suspect => "suspect",
            Self::Restarting => "restarting",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Liveness reporter handed to a shard's event path
///
/// Cloning is cheap. Reporting only touches a small mutex, so it can be
/// called for every event the shard processes.
#[derive(Clone)]
pub struct ShardLiveness {
    shard: ShardId,
    last: Arc<Mutex<Instant>>,
}

impl ShardLiveness {
    pub(crate) fn new(shard: ShardId) -> Self {
        Self {
            shard,
            last: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn shard(&self) -> ShardId {
        self.shard
    }

    /// Record that the shard just processed something
    pub fn report_liveness(&self) {
        *self.last.lock() = Instant::now();
    }

    /// Time since the last report
    pub fn silence(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_report())
    }

    pub(crate) fn last_report(&self) -> Instant {
        *self.last.lock()
    }
}

impl fmt::Debug for ShardLiveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardLiveness")
            .field("shard", &self.shard)
            .field("silence", &self.silence())
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct Health {
    pub(crate) state: ShardState,
    pub(crate) restarts: u32,
    pub(crate) last_restart_at: Option<DateTime<Utc>>,
    pub(crate) last_error: Option<String>,
}

/// Everything the monitor tracks about one shard
pub(crate) struct ShardRecord {
    pub(crate) control: Arc<dyn ShardControl>,
    pub(crate) liveness: ShardLiveness,
    pub(crate) health: Mutex<Health>,
}

impl ShardRecord {
    pub(crate) fn new(control: Arc<dyn ShardControl>) -> Self {
        Self {
            liveness: ShardLiveness::new(control.id()),
            control,
            health: Mutex::new(Health {
                state: ShardState::Alive,
                restarts: 0,
                last_restart_at: None,
                last_error: None,
            }),
        }
    }

    pub(crate) fn id(&self) -> ShardId {
        self.liveness.shard
    }

    pub(crate) fn state(&self) -> ShardState {
        self.health.lock().state
    }

    /// Move to `Restarting` if the current state allows it
    ///
    /// The check and the transition happen under one lock, so concurrent
    /// callers cannot both start a restart.
    pub(crate) fn begin_restart(&self, allowed: impl Fn(ShardState) -> bool) -> bool {
        let mut health = self.health.lock();
        if !allowed(health.state) {
            return false;
        }
        health.state = ShardState::Restarting;
        true
    }

    pub(crate) fn finish_restart(&self, result: &Result<(), super::ShardError>) {
        let mut health = self.health.lock();
        match result {
            Ok(()) => {
                health.state = ShardState::Alive;
                health.restarts += 1;
                health.last_restart_at = Some(Utc::now());
                health.last_error = None;
                // A fresh connection starts with a clean slate
                self.liveness.report_liveness();
            }
            Err(e) => {
                health.state = ShardState::Failed;
                health.last_error = Some(e.to_string());
            }
        }
    }

    pub(crate) fn status(&self) -> ShardStatus {
        let health = self.health.lock();
        ShardStatus {
            shard: self.id(),
            state: health.state,
            silent_ms: self.liveness.silence().as_millis() as u64,
            restarts: health.restarts,
            last_restart_at: health.last_restart_at,
            last_error: health.last_error.clone(),
        }
    }
}

/// Point-in-time status of one shard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardStatus {
    pub shard: ShardId,
    pub state: ShardState,
    /// Milliseconds since the shard last reported liveness
    pub silent_ms: u64,
    pub restarts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_restart_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
