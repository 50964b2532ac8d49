//! Bot runtime
//!
//! Wires configuration, the task pool, the shard monitor and every operation
//! registry together behind one explicit start/shutdown lifecycle.

use bot_common::{AppConfig, AppResult};
use bot_core::{InteractionAck, ShardId, Snowflake};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::dispatch::{AckSender, Acknowledge, DispatchListener};
use crate::operation::{OperationHandler, OperationRegistry, RegistryError};
use crate::scheduler::{Lifecycle, TaskPool};
use crate::shard::{MonitorSettings, ShardControl, ShardError, ShardLiveness, ShardMonitor};

/// Registry owned by the runtime, keyed by its shared state
struct OwnedRegistry {
    id: usize,
    service: Arc<dyn Lifecycle>,
}

/// Owner of all background services
///
/// Registries created through the runtime are started with it and stopped
/// with it, newest first, before the shard monitor. The runtime keeps each
/// registry alive until it is retired or the runtime is dropped.
pub struct BotRuntime {
    config: Arc<AppConfig>,
    pool: TaskPool,
    monitor: ShardMonitor,
    ack: Arc<dyn Acknowledge>,
    registries: Mutex<Vec<OwnedRegistry>>,
    running: AtomicBool,
}

impl BotRuntime {
    /// Create a runtime on the current Tokio runtime
    ///
    /// The receiver yields the acknowledgements to send to Discord.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    pub fn new(config: AppConfig) -> AppResult<(Self, mpsc::Receiver<InteractionAck>)> {
        Self::with_pool(config, TaskPool::current())
    }

    /// Create a runtime on an explicit task pool
    ///
    /// The configuration is validated first; zero periods or counts fail here.
    pub fn with_pool(config: AppConfig, pool: TaskPool) -> AppResult<(Self, mpsc::Receiver<InteractionAck>)> {
        config.validate()?;

        let (ack, acks) = AckSender::channel(config.operations.ack_buffer);
        let monitor = ShardMonitor::new(pool.clone(), MonitorSettings::from(&config.shards))?;

        let runtime = Self {
            config: Arc::new(config),
            pool,
            monitor,
            ack: Arc::new(ack),
            registries: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        };

        Ok((runtime, acks))
    }

    /// Load configuration from the environment and create a runtime
    pub fn from_env() -> AppResult<(Self, mpsc::Receiver<InteractionAck>)> {
        Self::new(AppConfig::from_env()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    pub fn monitor(&self) -> &ShardMonitor {
        &self.monitor
    }

    /// Create an operation registry owned by this runtime
    ///
    /// The registry uses the configured sweep period and default timeout.
    /// If the runtime is already running, its sweeper starts immediately.
    /// Short-lived registries should be handed back with [`retire`](Self::retire).
    pub fn registry<H: OperationHandler>(&self, name: &'static str) -> Result<OperationRegistry<H>, RegistryError> {
        let operations = &self.config.operations;
        let registry = OperationRegistry::new(name, self.pool.clone(), operations.sweep_period())?
            .with_default_timeout(operations.default_timeout());

        if self.is_running() {
            registry.start();
        }
        self.registries.lock().push(OwnedRegistry {
            id: registry.service_id(),
            service: Arc::new(registry.clone()),
        });

        Ok(registry)
    }

    /// Stop a registry created by this runtime and release it
    ///
    /// Pending operations are cancelled. Returns `false` if the registry is
    /// not owned by this runtime.
    pub async fn retire<H: OperationHandler>(&self, registry: &OperationRegistry<H>) -> bool {
        let id = registry.service_id();
        let owned = {
            let mut registries = self.registries.lock();
            registries
                .iter()
                .position(|owned| owned.id == id)
                .map(|index| registries.remove(index))
        };

        let Some(owned) = owned else {
            return false;
        };

        owned.service.shutdown().await;
        tracing::debug!(registry = owned.service.name(), "Registry retired");
        true
    }

    /// Number of registries the runtime currently owns
    pub fn registry_count(&self) -> usize {
        self.registries.lock().len()
    }

    /// Create a dispatch listener for `registry` that acknowledges through
    /// this runtime's ack queue
    pub fn listener<H: OperationHandler>(&self, registry: &OperationRegistry<H>) -> DispatchListener<H> {
        DispatchListener::new(registry.clone(), self.ack.clone())
    }

    /// Register a gateway shard with the health monitor
    pub fn register_shard(&self, control: Arc<dyn ShardControl>) -> Result<ShardLiveness, ShardError> {
        let shard = control.id();
        let count = self.config.shards.count;
        if shard.get() >= count {
            return Err(ShardError::OutOfRange { shard, count });
        }

        self.monitor.register(control)
    }

    /// Shard that receives events for a guild
    pub fn shard_for(&self, guild_id: Snowflake) -> ShardId {
        guild_id.shard_id(self.config.shards.count)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start every service; a no-op if already running
    pub fn start(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }

        self.monitor.start();
        let registries = self.services();
        for service in &registries {
            service.start();
        }

        tracing::info!(
            app = %self.config.app.name,
            env = ?self.config.app.env,
            registries = registries.len(),
            "Bot runtime started"
        );
    }

    /// Stop every service in reverse order
    ///
    /// Pending operations are cancelled, so their futures resolve.
    pub async fn shutdown(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }

        for service in self.services().iter().rev() {
            tracing::debug!(service = service.name(), "Stopping service");
            service.shutdown().await;
        }
        self.monitor.shutdown().await;

        tracing::info!("Bot runtime stopped");
    }

    fn services(&self) -> Vec<Arc<dyn Lifecycle>> {
        self.registries
            .lock()
            .iter()
            .map(|owned| owned.service.clone())
            .collect()
    }
}

impl std::fmt::Debug for BotRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotRuntime")
            .field("app", &self.config.app.name)
            .field("monitor", &self.monitor)
            .field("registries", &self.registry_count())
            .field("running", &self.is_running())
            .finish()
    }
}
