//! Integration test utilities for the bot runtime
//!
//! This crate provides recording handlers, fake shards and payload builders
//! for end-to-end tests of the operation registry, dispatch and shard
//! monitor.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
