//! Operation handler capability set

use bot_core::InteractionEvent;

/// Result of feeding one event to an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome<T> {
    /// The operation keeps running
    Continue,
    /// The operation is finished with this value
    Complete(T),
}

impl<T> EventOutcome<T> {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// How an operation's future resolved
///
/// Expiry is not a variant: an expired operation never resolves its future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult<T> {
    Completed(T),
    Cancelled,
}

impl<T> OperationResult<T> {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The completion value, if any
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Behaviour attached to a timed operation
///
/// `on_event` runs on the task that delivered the event and must not block
/// for long. `on_expire` runs on the blocking pool and may perform slow
/// calls. `on_cancel` runs on the task that called cancel. Hooks may call
/// back into the registry.
pub trait OperationHandler: Send + Sync + 'static {
    /// Value the operation completes with
    type Output: Clone + Send + Sync + 'static;

    /// Handle an event routed to this operation
    fn on_event(&self, event: &InteractionEvent) -> EventOutcome<Self::Output>;

    /// Called once when the operation times out
    fn on_expire(&self) {}

    /// Called once when the operation is cancelled
    fn on_cancel(&self) {}
}
