//! Test helpers for integration tests
//!
//! Provides configuration presets, runtime setup and interaction builders.

use anyhow::{Context, Result};
use bot_common::AppConfig;
use bot_core::{InteractionAck, InteractionEvent, InteractionKind, Snowflake};
use bot_runtime::{BotRuntime, DispatchOutcome, DispatchRouter};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// Number of shards in the test configuration
pub const TEST_SHARDS: u32 = 4;

/// Default configuration with four shards
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.shards.count = TEST_SHARDS;
    config
}

/// Runtime on the current Tokio runtime with the test configuration
pub fn test_runtime() -> (BotRuntime, mpsc::Receiver<InteractionAck>) {
    BotRuntime::new(test_config()).expect("test configuration is valid")
}

/// Button click on `message`
pub fn button(message: Snowflake, custom_id: &str) -> InteractionEvent {
    InteractionEvent::new(InteractionKind::Button, message, custom_id)
        .with_token(Snowflake::new(1), format!("token-{message}"))
}

/// Select menu choice on `message`
pub fn select(message: Snowflake, custom_id: &str, values: &[&str]) -> InteractionEvent {
    InteractionEvent::new(InteractionKind::SelectMenu, message, custom_id)
        .with_values(values.iter().map(ToString::to_string).collect())
}

/// Raw guild component interaction as Discord sends it
pub fn component_payload(message: Snowflake, custom_id: &str, component_type: u8) -> Value {
    json!({
        "id": "900",
        "application_id": "901",
        "type": 3,
        "token": "raw-token",
        "version": 1,
        "guild_id": "902",
        "channel_id": "903",
        "member": { "user": { "id": "904", "username": "tester" } },
        "message": { "id": message.to_string() },
        "data": {
            "custom_id": custom_id,
            "component_type": component_type,
            "values": ["first", "second"]
        }
    })
}

/// Classify and dispatch a raw interaction given as JSON text
pub fn dispatch_json(router: &DispatchRouter, json: &str) -> Result<DispatchOutcome> {
    let payload: Value = serde_json::from_str(json).context("interaction is not JSON")?;
    let outcome = router
        .dispatch_raw(payload)
        .context("interaction was rejected")?;
    Ok(outcome)
}
