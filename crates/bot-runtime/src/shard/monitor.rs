//! Shard health monitor
//!
//! Two periodic passes drive each shard through
//! `Alive -> Suspect -> Restarting -> Alive | Failed`:
//!
//! - the probe pass (short period) marks silent shards suspect and clears
//!   shards that spoke again;
//! - the check pass (long period) restarts shards that are still silent.
//!
//! A restart is attempted once, bounded by the restart wait. A failed shard
//! stays failed until it reports liveness again or an operator restarts it.

use async_trait::async_trait;
use bot_common::ShardConfig;
use bot_core::ShardId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::liveness::ShardRecord;
use super::{ShardControl, ShardError, ShardLiveness, ShardState, ShardStatus};
use crate::scheduler::{Lifecycle, PeriodicTask, TaskPool, TickFlow};

/// Timing of the health monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Silence after which a shard is suspect
    pub liveness_threshold: Duration,
    pub probe_period: Duration,
    pub check_period: Duration,
    /// Upper bound on one restart attempt
    pub restart_wait: Duration,
}

impl MonitorSettings {
    /// Reject zero durations
    pub fn validate(&self) -> Result<(), ShardError> {
        let settings = [
            ("liveness_threshold", self.liveness_threshold),
            ("probe_period", self.probe_period),
            ("check_period", self.check_period),
            ("restart_wait", self.restart_wait),
        ];

        match settings.into_iter().find(|(_, value)| value.is_zero()) {
            Some((name, _)) => Err(ShardError::InvalidSetting(name)),
            None => Ok(()),
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self::from(&ShardConfig::default())
    }
}

impl From<&ShardConfig> for MonitorSettings {
    fn from(config: &ShardConfig) -> Self {
        Self {
            liveness_threshold: config.liveness_threshold(),
            probe_period: config.probe_period(),
            check_period: config.check_period(),
            restart_wait: config.restart_wait(),
        }
    }
}

struct MonitorInner {
    shards: DashMap<ShardId, Arc<ShardRecord>>,
    settings: MonitorSettings,
    pool: TaskPool,
    loops: Mutex<Vec<PeriodicTask>>,
}

impl MonitorInner {
    fn is_stale(&self, record: &ShardRecord, now: Instant) -> bool {
        now.saturating_duration_since(record.liveness.last_report()) > self.settings.liveness_threshold
    }

    fn records(&self) -> Vec<Arc<ShardRecord>> {
        self.shards.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Returns the number of shards newly marked suspect
    fn probe(&self, now: Instant) -> usize {
        let mut suspected = 0;

        for record in self.records() {
            let stale = self.is_stale(&record, now);
            let mut health = record.health.lock();

            match (health.state, stale) {
                (ShardState::Alive, true) => {
                    health.state = ShardState::Suspect;
                    suspected += 1;
                    tracing::warn!(
                        shard = %record.id(),
                        silent_ms = record.liveness.silence().as_millis(),
                        "Shard stopped reporting liveness"
                    );
                }
                (ShardState::Suspect | ShardState::Failed, false) => {
                    tracing::info!(shard = %record.id(), from = %health.state, "Shard is alive again");
                    health.state = ShardState::Alive;
                }
                _ => {}
            }
        }

        suspected
    }

    /// Start a restart for every suspect shard that is still silent
    fn check(self: &Arc<Self>, now: Instant) -> Vec<JoinHandle<()>> {
        let mut restarts = Vec::new();

        for record in self.records() {
            if !self.is_stale(&record, now) {
                continue;
            }
            if !record.begin_restart(|state| state == ShardState::Suspect) {
                continue;
            }

            tracing::warn!(shard = %record.id(), "Shard confirmed dead, restarting");

            let inner = self.clone();
            restarts.push(self.pool.spawn(async move {
                // Failures are recorded on the shard and logged
                let _ = inner.restart(&record).await;
            }));
        }

        restarts
    }

    /// One bounded restart attempt; the shard must already be `Restarting`
    async fn restart(&self, record: &ShardRecord) -> Result<(), ShardError> {
        let shard = record.id();
        let wait = self.settings.restart_wait;
        let attempt = AssertUnwindSafe(record.control.restart()).catch_unwind();

        let result = match tokio::time::timeout(wait, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ShardError::restart_failed(shard, "restart panicked")),
            Err(_) => Err(ShardError::RestartTimedOut {
                shard,
                waited: wait,
            }),
        };

        record.finish_restart(&result);

        match &result {
            Ok(()) => tracing::info!(shard = %shard, "Shard restarted"),
            Err(e) => tracing::error!(
                shard = %shard,
                error = %e,
                code = e.code(),
                "Shard restart failed, manual intervention required"
            ),
        }

        result
    }
}

/// Watches shard liveness and restarts silent shards
///
/// Cloning is cheap; clones share the same shard table and loops.
#[derive(Clone)]
pub struct ShardMonitor {
    inner: Arc<MonitorInner>,
}

impl ShardMonitor {
    /// Create a monitor; nothing runs until [`start`](Self::start)
    pub fn new(pool: TaskPool, settings: MonitorSettings) -> Result<Self, ShardError> {
        settings.validate()?;

        Ok(Self {
            inner: Arc::new(MonitorInner {
                shards: DashMap::new(),
                settings,
                pool,
                loops: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn settings(&self) -> MonitorSettings {
        self.inner.settings
    }

    /// Start tracking a shard
    ///
    /// The shard starts `Alive` with a fresh liveness timestamp. The returned
    /// handle belongs on the shard's event path.
    pub fn register(&self, control: Arc<dyn ShardControl>) -> Result<ShardLiveness, ShardError> {
        let shard = control.id();

        match self.inner.shards.entry(shard) {
            Entry::Occupied(_) => Err(ShardError::AlreadyRegistered(shard)),
            Entry::Vacant(slot) => {
                let record = Arc::new(ShardRecord::new(control));
                let liveness = record.liveness.clone();
                slot.insert(record);

                tracing::debug!(shard = %shard, "Shard registered with health monitor");
                Ok(liveness)
            }
        }
    }

    /// Stop tracking a shard
    pub fn deregister(&self, shard: ShardId) -> bool {
        self.inner.shards.remove(&shard).is_some()
    }

    /// Liveness handle of a registered shard
    pub fn liveness(&self, shard: ShardId) -> Option<ShardLiveness> {
        self.inner
            .shards
            .get(&shard)
            .map(|record| record.liveness.clone())
    }

    pub fn state(&self, shard: ShardId) -> Option<ShardState> {
        self.inner.shards.get(&shard).map(|record| record.state())
    }

    pub fn len(&self) -> usize {
        self.inner.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.shards.is_empty()
    }

    /// Status of every shard, ordered by shard id
    pub fn status(&self) -> Vec<ShardStatus> {
        let mut status: Vec<ShardStatus> = self
            .inner
            .records()
            .iter()
            .map(|record| record.status())
            .collect();
        status.sort_by_key(|s| s.shard);
        status
    }

    /// Run one probe pass now; returns the number of newly suspect shards
    pub fn probe(&self) -> usize {
        self.inner.probe(Instant::now())
    }

    /// Run one check pass now; returns the number of restarts started
    ///
    /// Restarts run in the background on the task pool.
    pub fn check(&self) -> usize {
        self.inner.check(Instant::now()).len()
    }

    /// Restart a shard now and wait for the outcome
    ///
    /// Allowed from any state except `Restarting`. This is how a failed
    /// shard is brought back by an operator.
    pub async fn restart_now(&self, shard: ShardId) -> Result<(), ShardError> {
        let record = self
            .inner
            .shards
            .get(&shard)
            .map(|record| record.value().clone())
            .ok_or(ShardError::UnknownShard(shard))?;

        if !record.begin_restart(|state| state != ShardState::Restarting) {
            return Err(ShardError::AlreadyRestarting(shard));
        }

        tracing::info!(shard = %shard, "Manual shard restart requested");
        self.inner.restart(&record).await
    }

    /// Start the probe and check loops; a no-op if they are running
    pub fn start(&self) {
        let mut loops = self.inner.loops.lock();
        if loops.iter().any(PeriodicTask::is_running) {
            return;
        }
        loops.clear();

        let settings = self.inner.settings;

        let monitor = Arc::downgrade(&self.inner);
        loops.push(PeriodicTask::start(
            &self.inner.pool,
            "shard-probe",
            settings.probe_period,
            move || {
                let monitor = monitor.upgrade();
                async move {
                    match monitor {
                        Some(monitor) => {
                            monitor.probe(Instant::now());
                            TickFlow::Continue
                        }
                        None => TickFlow::Stop,
                    }
                }
            },
        ));

        let monitor = Arc::downgrade(&self.inner);
        loops.push(PeriodicTask::start(
            &self.inner.pool,
            "shard-check",
            settings.check_period,
            move || {
                let monitor = monitor.upgrade();
                async move {
                    match monitor {
                        Some(monitor) => {
                            monitor.check(Instant::now());
                            TickFlow::Continue
                        }
                        None => TickFlow::Stop,
                    }
                }
            },
        ));

        tracing::info!(
            shards = self.inner.shards.len(),
            threshold_ms = settings.liveness_threshold.as_millis(),
            probe_ms = settings.probe_period.as_millis(),
            check_ms = settings.check_period.as_millis(),
            "Shard health monitor started"
        );
    }

    pub fn is_running(&self) -> bool {
        self.inner.loops.lock().iter().any(PeriodicTask::is_running)
    }

    /// Stop both loops
    ///
    /// Restarts already in flight finish on their own.
    pub async fn shutdown(&self) {
        let loops = std::mem::take(&mut *self.inner.loops.lock());
        for task in &loops {
            task.shutdown().await;
        }

        tracing::info!("Shard health monitor stopped");
    }
}

impl std::fmt::Debug for ShardMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardMonitor")
            .field("shards", &self.inner.shards.len())
            .field("settings", &self.inner.settings)
            .finish()
    }
}

#[async_trait]
impl Lifecycle for ShardMonitor {
    fn name(&self) -> &str {
        "shard-monitor"
    }

    fn start(&self) {
        ShardMonitor::start(self);
    }

    async fn shutdown(&self) {
        ShardMonitor::shutdown(self).await;
    }
}
