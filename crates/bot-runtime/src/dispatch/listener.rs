//! Event dispatch to registered operations
//!
//! The listener adds no threading of its own: handlers run on whatever task
//! delivered the event.

use bot_core::{CoreError, InteractionEvent};
use serde_json::Value;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::Acknowledge;
use crate::operation::{EventOutcome, OperationHandler, OperationRegistry};

/// What happened to a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No operation is registered for the event's message
    Ignored,
    /// The handler consumed the event and the operation keeps running
    Running,
    /// The handler completed the operation
    Completed,
    /// The handler completed, but a cancel or sweep removed the operation first
    Lost,
    /// The handler panicked; the operation is left to expire
    Failed,
}

impl DispatchOutcome {
    /// Whether the event reached an operation
    #[must_use]
    pub fn is_handled(self) -> bool {
        !matches!(self, Self::Ignored)
    }
}

/// Something that can take a classified event
pub trait EventRoute: Send + Sync {
    fn route(&self, event: &InteractionEvent) -> DispatchOutcome;
}

/// Routes events to the operations of one registry
pub struct DispatchListener<H: OperationHandler> {
    registry: OperationRegistry<H>,
    ack: Arc<dyn Acknowledge>,
}

impl<H: OperationHandler> DispatchListener<H> {
    pub fn new(registry: OperationRegistry<H>, ack: Arc<dyn Acknowledge>) -> Self {
        Self { registry, ack }
    }

    pub fn registry(&self) -> &OperationRegistry<H> {
        &self.registry
    }

    /// Dispatch one classified event
    ///
    /// The event is acknowledged before the handler runs. On completion the
    /// operation is removed and its future resolved.
    pub fn dispatch(&self, event: &InteractionEvent) -> DispatchOutcome {
        let key = event.key();

        let Some(operation) = self.registry.lookup(key) else {
            tracing::debug!(
                registry = self.registry.name(),
                message_id = %key,
                "No operation for interaction"
            );
            return DispatchOutcome::Ignored;
        };

        self.ack.acknowledge(event);

        let outcome = match catch_unwind(AssertUnwindSafe(|| operation.handler().on_event(event))) {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(
                    registry = self.registry.name(),
                    message_id = %key,
                    custom_id = %event.custom_id,
                    "Event handler panicked"
                );
                return DispatchOutcome::Failed;
            }
        };

        match outcome {
            EventOutcome::Continue => {
                tracing::trace!(message_id = %key, kind = ?event.kind, "Operation still running");
                DispatchOutcome::Running
            }
            EventOutcome::Complete(value) => {
                if self.registry.complete(key, operation.id(), value) {
                    DispatchOutcome::Completed
                } else {
                    DispatchOutcome::Lost
                }
            }
        }
    }

    /// Classify a raw interaction payload and dispatch it
    pub fn dispatch_raw(&self, payload: Value) -> Result<DispatchOutcome, CoreError> {
        let event = InteractionEvent::classify(payload)?;
        Ok(self.dispatch(&event))
    }
}

impl<H: OperationHandler> EventRoute for DispatchListener<H> {
    fn route(&self, event: &InteractionEvent) -> DispatchOutcome {
        self.dispatch(event)
    }
}

/// Fans events out over listeners of different handler types
///
/// Listeners are tried in insertion order; the first one that has an
/// operation for the event's message handles it.
#[derive(Default)]
pub struct DispatchRouter {
    routes: Vec<Arc<dyn EventRoute>>,
}

impl DispatchRouter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    #[must_use]
    pub fn with_route(mut self, route: Arc<dyn EventRoute>) -> Self {
        self.routes.push(route);
        self
    }

    pub fn dispatch(&self, event: &InteractionEvent) -> DispatchOutcome {
        self.routes
            .iter()
            .map(|route| route.route(event))
            .find(|outcome| outcome.is_handled())
            .unwrap_or(DispatchOutcome::Ignored)
    }

    /// Classify a raw interaction payload and dispatch it
    pub fn dispatch_raw(&self, payload: Value) -> Result<DispatchOutcome, CoreError> {
        let event = InteractionEvent::classify(payload).map_err(|e| {
            tracing::debug!(error = %e, code = e.code(), "Rejected interaction payload");
            e
        })?;
        Ok(self.dispatch(&event))
    }
}
