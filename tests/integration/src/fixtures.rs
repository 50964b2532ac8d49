//! Test fixtures
//!
//! Recording operation handlers and scripted fake shards.

use async_trait::async_trait;
use bot_core::{InteractionEvent, ShardId, Snowflake};
use bot_runtime::{EventOutcome, OperationHandler, ShardControl, ShardError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Counter for unique operation keys
static COUNTER: AtomicU64 = AtomicU64::new(1_000);

/// Get a key no other test uses
pub fn unique_key() -> Snowflake {
    Snowflake::new(COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Which handler hook ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Event,
    Expire,
    Cancel,
}

/// Shared log of hook invocations
///
/// Hooks may run on the blocking pool, so waiting goes through a watch
/// channel instead of polling.
#[derive(Clone)]
pub struct HookLog {
    entries: Arc<watch::Sender<Vec<(Snowflake, Hook)>>>,
}

impl Default for HookLog {
    fn default() -> Self {
        Self::new()
    }
}

impl HookLog {
    pub fn new() -> Self {
        let (entries, _) = watch::channel(Vec::new());
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn record(&self, key: Snowflake, hook: Hook) {
        self.entries.send_modify(|entries| entries.push((key, hook)));
    }

    /// How many times `hook` ran for any key
    pub fn count(&self, hook: Hook) -> usize {
        self.entries.borrow().iter().filter(|(_, h)| *h == hook).count()
    }

    /// How many times `hook` ran for `key`
    pub fn count_for(&self, key: Snowflake, hook: Hook) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(k, h)| *k == key && *h == hook)
            .count()
    }

    /// Wait until `hook` has run at least `n` times
    pub async fn wait_for(&self, hook: Hook, n: usize) {
        let mut entries = self.entries.subscribe();
        let _ = entries
            .wait_for(|entries| entries.iter().filter(|(_, h)| *h == hook).count() >= n)
            .await;
    }
}

/// Handler that records every hook and completes on a `done` component
pub struct RecordingHandler {
    key: Snowflake,
    log: HookLog,
}

impl RecordingHandler {
    pub fn new(key: Snowflake, log: &HookLog) -> Self {
        Self {
            key,
            log: log.clone(),
        }
    }
}

impl OperationHandler for RecordingHandler {
    type Output = String;

    fn on_event(&self, event: &InteractionEvent) -> EventOutcome<String> {
        self.log.record(self.key, Hook::Event);

        if event.custom_id == "done" {
            EventOutcome::Complete(event.values.join(","))
        } else {
            EventOutcome::Continue
        }
    }

    fn on_expire(&self) {
        self.log.record(self.key, Hook::Expire);
    }

    fn on_cancel(&self) {
        self.log.record(self.key, Hook::Cancel);
    }
}

/// How a fake shard answers a restart
#[derive(Debug, Clone)]
pub enum RestartScript {
    /// Reconnect after the given delay
    Succeed(Duration),
    /// Refuse with the given reason
    Fail(String),
    /// Never come back
    Hang,
}

/// Shard whose restart follows a script
pub struct FakeShard {
    id: ShardId,
    script: RestartScript,
    restarts: AtomicUsize,
}

impl FakeShard {
    pub fn new(id: u32, script: RestartScript) -> Arc<Self> {
        Arc::new(Self {
            id: ShardId::new(id),
            script,
            restarts: AtomicUsize::new(0),
        })
    }

    /// Shard that reconnects after two seconds
    pub fn healthy(id: u32) -> Arc<Self> {
        Self::new(id, RestartScript::Succeed(Duration::from_secs(2)))
    }

    /// Number of restart attempts so far
    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShardControl for FakeShard {
    fn id(&self) -> ShardId {
        self.id
    }

    async fn restart(&self) -> Result<(), ShardError> {
        self.restarts.fetch_add(1, Ordering::SeqCst);

        match &self.script {
            RestartScript::Succeed(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(())
            }
            RestartScript::Fail(reason) => Err(ShardError::restart_failed(self.id, reason.clone())),
            RestartScript::Hang => std::future::pending().await,
        }
    }
}
