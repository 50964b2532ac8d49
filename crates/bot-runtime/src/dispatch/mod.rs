//! Inbound interaction dispatch
//!
//! Classified events are looked up by message id, acknowledged, and handed
//! to the owning operation's handler.

mod ack;
mod listener;

pub use ack::{AckSender, Acknowledge, NoAck};
pub use listener::{DispatchListener, DispatchOutcome, DispatchRouter, EventRoute};
