//! Caller-side handle to a registered operation

use bot_core::Snowflake;
use std::fmt;
use std::sync::Weak;
use tokio::sync::watch;

use super::registry::RegistryInner;
use super::{OperationHandler, OperationResult};

pub(crate) type ResultSlot<T> = Option<OperationResult<T>>;

/// Handle returned by a successful registration
///
/// The handle keeps only a weak reference to its registry: dropping the
/// registry makes [`cancel`](Self::cancel) a no-op, and dropping the handle
/// leaves the operation running.
pub struct OperationHandle<H: OperationHandler> {
    key: Snowflake,
    id: u64,
    registry: Weak<RegistryInner<H>>,
    result: watch::Receiver<ResultSlot<H::Output>>,
}

impl<H: OperationHandler> OperationHandle<H> {
    pub(crate) fn new(
        key: Snowflake,
        id: u64,
        registry: Weak<RegistryInner<H>>,
        result: watch::Receiver<ResultSlot<H::Output>>,
    ) -> Self {
        Self {
            key,
            id,
            registry,
            result,
        }
    }

    /// Key the operation is registered under
    pub fn key(&self) -> Snowflake {
        self.key
    }

    /// Cancel the operation
    ///
    /// Removes it from the registry, runs the cancel hook on the calling task
    /// and resolves the future with [`OperationResult::Cancelled`]. Returns
    /// `false` if the operation was already completed, cancelled or expired.
    pub fn cancel(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.cancel_operation(self.key, self.id),
            None => false,
        }
    }

    /// Check if the operation is still registered
    pub fn is_live(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.holds(self.key, self.id))
    }

    /// Current result without waiting
    pub fn try_result(&self) -> Option<OperationResult<H::Output>> {
        self.result.borrow().clone()
    }

    /// Wait for the operation to complete or be cancelled
    ///
    /// An operation that expires never resolves: this future then stays
    /// pending forever. Wrap it in a timeout, or watch `is_live`, when expiry
    /// must be observed.
    pub async fn wait(&self) -> OperationResult<H::Output> {
        let mut result = self.result.clone();

        let resolved = match result.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            // Operation dropped without a result: it expired
            Err(_) => None,
        };

        match resolved {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }
}

impl<H: OperationHandler> Clone for OperationHandle<H> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            id: self.id,
            registry: self.registry.clone(),
            result: self.result.clone(),
        }
    }
}

impl<H: OperationHandler> fmt::Debug for OperationHandle<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}
