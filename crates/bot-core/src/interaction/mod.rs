//! Interaction events and acknowledgements

mod event;
mod kinds;
mod response;

pub use event::InteractionEvent;
pub use kinds::{ComponentType, InteractionKind, InteractionType};
pub use response::{InteractionAck, ResponseType};
