//! Timed operation registry and its timeout sweeper
//!
//! Operations live in a `DashMap` keyed by message snowflake. Every teardown
//! path (completion, cancellation, expiry) removes the entry with a
//! compare-and-remove on the operation id, so exactly one of them wins and
//! fires its hook. No map guard is held while handler code runs.

use async_trait::async_trait;
use bot_core::Snowflake;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::handle::ResultSlot;
use super::{OperationHandle, OperationHandler, OperationResult, RegistryError};
use crate::scheduler::{Lifecycle, PeriodicTask, TaskPool, TickFlow};

/// Shortest timeout a registration accepts
pub const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Timeout used by `register_default` unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// One active operation
pub(crate) struct Operation<H: OperationHandler> {
    id: u64,
    key: Snowflake,
    handler: H,
    deadline: Instant,
    expired: AtomicBool,
    result: watch::Sender<ResultSlot<H::Output>>,
}

impl<H: OperationHandler> Operation<H> {
    /// Fill the result slot; only the first call has an effect
    fn resolve(&self, result: OperationResult<H::Output>) -> bool {
        self.result.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(result);
            true
        })
    }
}

/// Read-only view of a registered operation
pub struct OperationRef<H: OperationHandler> {
    operation: Arc<Operation<H>>,
}

impl<H: OperationHandler> OperationRef<H> {
    pub fn key(&self) -> Snowflake {
        self.operation.key
    }

    pub(crate) fn id(&self) -> u64 {
        self.operation.id
    }

    pub fn handler(&self) -> &H {
        &self.operation.handler
    }

    /// Absolute deadline, fixed at registration
    pub fn deadline(&self) -> Instant {
        self.operation.deadline
    }

    /// Time left until the deadline (zero once it has passed)
    pub fn remaining(&self) -> Duration {
        self.operation.deadline.saturating_duration_since(Instant::now())
    }

    /// Whether the sweeper has already evicted this operation
    pub fn is_expired(&self) -> bool {
        self.operation.expired.load(Ordering::Acquire)
    }
}

pub(crate) struct RegistryInner<H: OperationHandler> {
    name: &'static str,
    operations: DashMap<Snowflake, Arc<Operation<H>>>,
    next_id: AtomicU64,
    pool: TaskPool,
    sweep_period: Duration,
    sweeper: Mutex<Option<PeriodicTask>>,
}

impl<H: OperationHandler> RegistryInner<H> {
    /// Remove the entry for `key` only if it is still operation `id`
    fn take(&self, key: Snowflake, id: u64) -> Option<Arc<Operation<H>>> {
        self.operations
            .remove_if(&key, |_, operation| operation.id == id)
            .map(|(_, operation)| operation)
    }

    pub(crate) fn holds(&self, key: Snowflake, id: u64) -> bool {
        self.operations
            .get(&key)
            .is_some_and(|operation| operation.id == id)
    }

    pub(crate) fn complete(&self, key: Snowflake, id: u64, value: H::Output) -> bool {
        let Some(operation) = self.take(key, id) else {
            tracing::debug!(
                registry = self.name,
                message_id = %key,
                "Completion lost, operation already torn down"
            );
            return false;
        };

        operation.resolve(OperationResult::Completed(value));
        tracing::debug!(registry = self.name, message_id = %key, "Operation completed");
        true
    }

    pub(crate) fn cancel_operation(&self, key: Snowflake, id: u64) -> bool {
        let Some(operation) = self.take(key, id) else {
            return false;
        };

        if catch_unwind(AssertUnwindSafe(|| operation.handler.on_cancel())).is_err() {
            tracing::error!(registry = self.name, message_id = %key, "Cancel hook panicked");
        }

        operation.resolve(OperationResult::Cancelled);
        tracing::debug!(registry = self.name, message_id = %key, "Operation cancelled");
        true
    }

    /// Evict every operation whose deadline is strictly before `now`
    ///
    /// Expiry hooks are handed to the blocking pool; the returned handles
    /// finish once each hook has run.
    fn expire_due(&self, now: Instant) -> Vec<JoinHandle<()>> {
        // Collect first so no shard guard is held while removing
        let due: Vec<(Snowflake, u64)> = self
            .operations
            .iter()
            .filter(|entry| entry.deadline < now)
            .map(|entry| (*entry.key(), entry.id))
            .collect();

        let mut hooks = Vec::with_capacity(due.len());
        for (key, id) in due {
            let Some(operation) = self.take(key, id) else {
                // Completed or cancelled since the scan
                continue;
            };

            // take() picked the single winner; the flag is for held OperationRefs
            operation.expired.store(true, Ordering::Release);

            tracing::debug!(registry = self.name, message_id = %key, "Operation expired");
            hooks.push(
                self.pool
                    .run_blocking("operation-expire", move || operation.handler.on_expire()),
            );
        }

        hooks
    }
}

/// Registry of timed operations for one handler type
///
/// Cloning is cheap; clones share the same map and sweeper.
pub struct OperationRegistry<H: OperationHandler> {
    inner: Arc<RegistryInner<H>>,
    default_timeout: Duration,
}

impl<H: OperationHandler> OperationRegistry<H> {
    /// Create a registry; the sweeper is not running until [`start`](Self::start)
    ///
    /// A zero sweep period is rejected.
    pub fn new(name: &'static str, pool: TaskPool, sweep_period: Duration) -> Result<Self, RegistryError> {
        if sweep_period.is_zero() {
            return Err(RegistryError::InvalidPeriod(sweep_period));
        }

        Ok(Self {
            inner: Arc::new(RegistryInner {
                name,
                operations: DashMap::new(),
                next_id: AtomicU64::new(1),
                pool,
                sweep_period,
                sweeper: Mutex::new(None),
            }),
            default_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the timeout used by [`register_default`](Self::register_default)
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Identity shared by every clone of this registry
    pub(crate) fn service_id(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }

    pub fn sweep_period(&self) -> Duration {
        self.inner.sweep_period
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Register an operation under `key`
    ///
    /// Returns `Ok(None)` if an operation is already registered for `key`;
    /// the existing one is left untouched.
    pub fn register(
        &self,
        key: Snowflake,
        handler: H,
        timeout: Duration,
    ) -> Result<Option<OperationHandle<H>>, RegistryError> {
        if timeout < MIN_TIMEOUT {
            return Err(RegistryError::InvalidTimeout(timeout));
        }
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or(RegistryError::InvalidTimeout(timeout))?;

        match self.inner.operations.entry(key) {
            Entry::Occupied(_) => {
                tracing::debug!(
                    registry = self.inner.name,
                    message_id = %key,
                    "Operation already registered"
                );
                Ok(None)
            }
            Entry::Vacant(slot) => {
                let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                let (result, receiver) = watch::channel(None);

                slot.insert(Arc::new(Operation {
                    id,
                    key,
                    handler,
                    deadline,
                    expired: AtomicBool::new(false),
                    result,
                }));

                tracing::debug!(
                    registry = self.inner.name,
                    message_id = %key,
                    timeout_ms = timeout.as_millis(),
                    "Operation registered"
                );

                Ok(Some(OperationHandle::new(
                    key,
                    id,
                    Arc::downgrade(&self.inner),
                    receiver,
                )))
            }
        }
    }

    /// Register with the registry's default timeout
    pub fn register_default(
        &self,
        key: Snowflake,
        handler: H,
    ) -> Result<Option<OperationHandle<H>>, RegistryError> {
        self.register(key, handler, self.default_timeout)
    }

    /// Look up the operation registered under `key`
    pub fn lookup(&self, key: Snowflake) -> Option<OperationRef<H>> {
        self.inner.operations.get(&key).map(|entry| OperationRef {
            operation: entry.value().clone(),
        })
    }

    pub(crate) fn complete(&self, key: Snowflake, id: u64, value: H::Output) -> bool {
        self.inner.complete(key, id, value)
    }

    /// Cancel whatever operation is registered under `key`
    pub fn cancel(&self, key: Snowflake) -> bool {
        let Some(id) = self.inner.operations.get(&key).map(|entry| entry.id) else {
            return false;
        };
        self.inner.cancel_operation(key, id)
    }

    /// Remove the operation under `key` without running any hook
    ///
    /// Only one caller gets the removed operation back, and handler teardown
    /// is up to that caller. Waiting handles resolve with `Cancelled`.
    pub fn remove(&self, key: Snowflake) -> Option<OperationRef<H>> {
        let (_, operation) = self.inner.operations.remove(&key)?;
        operation.resolve(OperationResult::Cancelled);

        tracing::debug!(registry = self.inner.name, message_id = %key, "Operation removed");
        Some(OperationRef { operation })
    }

    /// Run one sweep pass now; returns the number of evicted operations
    pub fn sweep(&self) -> usize {
        self.inner.expire_due(Instant::now()).len()
    }

    pub fn len(&self) -> usize {
        self.inner.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.operations.is_empty()
    }

    pub fn contains(&self, key: Snowflake) -> bool {
        self.inner.operations.contains_key(&key)
    }

    /// Keys of all registered operations
    pub fn keys(&self) -> Vec<Snowflake> {
        self.inner.operations.iter().map(|entry| *entry.key()).collect()
    }

    /// Start the timeout sweeper; a no-op if it is already running
    pub fn start(&self) {
        let mut sweeper = self.inner.sweeper.lock();
        if sweeper.as_ref().is_some_and(PeriodicTask::is_running) {
            return;
        }

        let registry = Arc::downgrade(&self.inner);
        *sweeper = Some(PeriodicTask::start(
            &self.inner.pool,
            "operation-sweeper",
            self.inner.sweep_period,
            move || {
                let registry = registry.upgrade();
                async move {
                    let Some(registry) = registry else {
                        return TickFlow::Stop;
                    };

                    let evicted = registry.expire_due(Instant::now()).len();
                    if evicted > 0 {
                        tracing::trace!(registry = registry.name, evicted, "Sweep pass");
                    }
                    TickFlow::Continue
                }
            },
        ));

        tracing::info!(
            registry = self.inner.name,
            period_ms = self.inner.sweep_period.as_millis(),
            "Operation sweeper started"
        );
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .sweeper
            .lock()
            .as_ref()
            .is_some_and(PeriodicTask::is_running)
    }

    /// Stop the sweeper
    ///
    /// With `cancel_pending`, every remaining operation is cancelled: its
    /// cancel hook runs and its future resolves with `Cancelled`.
    pub async fn shutdown(&self, cancel_pending: bool) {
        let sweeper = self.inner.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            sweeper.shutdown().await;
        }

        let mut cancelled = 0usize;
        if cancel_pending {
            let pending: Vec<(Snowflake, u64)> = self
                .inner
                .operations
                .iter()
                .map(|entry| (*entry.key(), entry.id))
                .collect();

            for (key, id) in pending {
                if self.inner.cancel_operation(key, id) {
                    cancelled += 1;
                }
            }
        }

        tracing::info!(registry = self.inner.name, cancelled, "Operation registry stopped");
    }
}

impl<H: OperationHandler> Clone for OperationRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            default_timeout: self.default_timeout,
        }
    }
}

impl<H: OperationHandler> std::fmt::Debug for OperationRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("name", &self.inner.name)
            .field("operations", &self.inner.operations.len())
            .finish()
    }
}

#[async_trait]
impl<H: OperationHandler> Lifecycle for OperationRegistry<H> {
    fn name(&self) -> &str {
        self.inner.name
    }

    fn start(&self) {
        OperationRegistry::start(self);
    }

    async fn shutdown(&self) {
        OperationRegistry::shutdown(self, true).await;
    }
}
