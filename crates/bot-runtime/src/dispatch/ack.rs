//! Interaction acknowledgement

use bot_core::{InteractionAck, InteractionEvent};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Acknowledges receipt of an interaction
///
/// Called on the event's own task before the handler runs. Implementations
/// must return promptly and never fail the caller.
pub trait Acknowledge: Send + Sync {
    fn acknowledge(&self, event: &InteractionEvent);
}

/// Sends deferred-update acknowledgements over a bounded channel
///
/// The receiving end belongs to whatever talks to the Discord HTTP API.
#[derive(Debug, Clone)]
pub struct AckSender {
    sender: mpsc::Sender<InteractionAck>,
}

impl AckSender {
    #[must_use]
    pub fn new(sender: mpsc::Sender<InteractionAck>) -> Self {
        Self { sender }
    }

    /// Create a sender together with the receiving end of its channel
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<InteractionAck>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self { sender }, receiver)
    }
}

impl Acknowledge for AckSender {
    fn acknowledge(&self, event: &InteractionEvent) {
        match self.sender.try_send(InteractionAck::deferred_update(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    interaction_id = %event.id,
                    message_id = %event.message_id,
                    "Ack queue full, dropping acknowledgement"
                );
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(
                    interaction_id = %event.id,
                    "Ack receiver closed, dropping acknowledgement"
                );
            }
        }
    }
}

/// Drops every acknowledgement
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAck;

impl Acknowledge for NoAck {
    fn acknowledge(&self, _event: &InteractionEvent) {}
}
