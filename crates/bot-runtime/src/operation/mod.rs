//! Timed interactive operations
//!
//! Menus, lobbies and other interactive sessions register here under the
//! id of the message they live on, with a deadline. They end in exactly
//! one of three ways: completion by an event, explicit cancellation, or
//! eviction by the timeout sweeper.

mod error;
mod handle;
mod handler;
mod registry;

pub use error::RegistryError;
pub use handle::OperationHandle;
pub use handler::{EventOutcome, OperationHandler, OperationResult};
pub use registry::{OperationRef, OperationRegistry, DEFAULT_TIMEOUT, MIN_TIMEOUT};
