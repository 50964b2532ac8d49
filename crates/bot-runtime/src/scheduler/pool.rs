//! Task pool for off-thread work

use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Handle to the pool that runs expiry hooks, restarts and periodic loops
///
/// Cloning is cheap; all clones spawn onto the same runtime.
#[derive(Clone, Debug)]
pub struct TaskPool {
    handle: Handle,
}

impl TaskPool {
    /// Pool backed by the runtime the caller is running on
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Pool backed by an explicit runtime handle
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawn an async task
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Run a blocking hook on the blocking pool
    ///
    /// A panic inside `hook` is caught by the runtime and logged here; it
    /// never reaches the caller. The returned handle completes once the hook
    /// has finished (or panicked).
    pub fn run_blocking<F>(&self, task: &'static str, hook: F) -> JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let blocking = self.handle.spawn_blocking(hook);

        self.handle.spawn(async move {
            if let Err(e) = blocking.await {
                if e.is_panic() {
                    tracing::error!(task = task, "Blocking hook panicked");
                } else {
                    tracing::warn!(task = task, error = %e, "Blocking hook was cancelled");
                }
            }
        })
    }
}
