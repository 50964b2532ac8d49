//! Runtime Integration Tests
//!
//! End-to-end scenarios for timed operations, dispatch and shard health.
//! Everything runs in-process; no Discord connection is needed.
//!
//! Run with: cargo test -p integration-tests --test runtime_tests

use bot_core::{CoreError, ShardId};
use bot_common::AppConfig;
use bot_runtime::{
    BotRuntime, DispatchOutcome, DispatchRouter, OperationRegistry, OperationResult, RegistryError,
    ShardState, TaskPool,
};
use integration_tests::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Operation Lifecycle Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_operation_expires_once_after_one_tick() {
    let (runtime, _acks) = test_runtime();
    let registry = runtime.registry::<RecordingHandler>("menus").unwrap();
    let log = HookLog::new();
    let key = unique_key();

    let tick = registry.sweep_period();
    let handle = registry
        .register(key, RecordingHandler::new(key, &log), tick)
        .unwrap()
        .expect("first registration returns a handle");

    runtime.start();

    // The pass at one tick sees the deadline exactly, the next one evicts
    tokio::time::sleep(tick * 2 + tick / 2).await;
    log.wait_for(Hook::Expire, 1).await;

    assert!(!registry.contains(key));
    assert!(!handle.is_live());

    tokio::time::sleep(tick * 5).await;
    assert_eq!(log.count_for(key, Hook::Expire), 1);
    assert_eq!(log.count(Hook::Cancel), 0);

    // Expiry never resolves the future
    assert!(tokio::time::timeout(Duration::from_secs(30), handle.wait())
        .await
        .is_err());

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_completes_before_sweep() {
    let (runtime, mut acks) = test_runtime();
    let registry = runtime.registry::<RecordingHandler>("lobbies").unwrap();
    let listener = runtime.listener(&registry);
    let log = HookLog::new();
    let key = unique_key();

    let handle = registry
        .register(key, RecordingHandler::new(key, &log), registry.sweep_period() * 60)
        .unwrap()
        .unwrap();

    assert_eq!(listener.dispatch(&button(key, "join")), DispatchOutcome::Running);
    assert_eq!(
        listener.dispatch(&select(key, "done", &["red", "blue"])),
        DispatchOutcome::Completed
    );

    assert!(!registry.contains(key));
    assert_eq!(
        handle.wait().await,
        OperationResult::Completed("red,blue".to_string())
    );

    // Both events were acknowledged before their handler ran
    assert_eq!(acks.recv().await.unwrap().token, format!("token-{key}"));
    assert!(acks.recv().await.is_some());

    tokio::time::advance(registry.sweep_period() * 61).await;
    assert_eq!(registry.sweep(), 0);
    assert_eq!(log.count(Hook::Expire), 0);
    assert_eq!(log.count_for(key, Hook::Event), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_registration_is_rejected() {
    let (runtime, _acks) = test_runtime();
    let registry = runtime.registry::<RecordingHandler>("menus").unwrap();
    let log = HookLog::new();
    let key = unique_key();

    let first = registry
        .register_default(key, RecordingHandler::new(key, &log))
        .unwrap();
    let second = registry
        .register_default(key, RecordingHandler::new(key, &log))
        .unwrap();

    assert!(first.is_some());
    assert!(second.is_none());
    assert_eq!(registry.len(), 1);

    // After teardown the key is free again
    assert!(first.unwrap().cancel());
    assert!(registry
        .register_default(key, RecordingHandler::new(key, &log))
        .unwrap()
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_timeout_is_rejected() {
    let (runtime, _acks) = test_runtime();
    let registry = runtime.registry::<RecordingHandler>("menus").unwrap();
    let log = HookLog::new();
    let key = unique_key();

    let err = registry
        .register(key, RecordingHandler::new(key, &log), Duration::ZERO)
        .unwrap_err();

    assert_eq!(err, RegistryError::InvalidTimeout(Duration::ZERO));
    assert_eq!(err.code(), "INVALID_TIMEOUT");
    assert!(registry.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_is_idempotent() {
    let (runtime, _acks) = test_runtime();
    let registry = runtime.registry::<RecordingHandler>("menus").unwrap();
    let listener = runtime.listener(&registry);
    let log = HookLog::new();
    let key = unique_key();

    let handle = registry
        .register_default(key, RecordingHandler::new(key, &log))
        .unwrap()
        .unwrap();
    let copy = handle.clone();

    assert!(handle.cancel());
    assert!(!handle.cancel());
    assert!(!copy.cancel());

    assert_eq!(log.count_for(key, Hook::Cancel), 1);
    assert_eq!(copy.wait().await, OperationResult::Cancelled);
    assert_eq!(listener.dispatch(&button(key, "done")), DispatchOutcome::Ignored);
    assert_eq!(log.count(Hook::Event), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_operations() {
    let (runtime, _acks) = test_runtime();
    let registry = runtime.registry::<RecordingHandler>("menus").unwrap();
    let log = HookLog::new();

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let key = unique_key();
            registry
                .register_default(key, RecordingHandler::new(key, &log))
                .unwrap()
                .unwrap()
        })
        .collect();

    runtime.start();
    runtime.shutdown().await;

    assert!(registry.is_empty());
    assert_eq!(log.count(Hook::Cancel), 3);
    for handle in handles {
        assert_eq!(handle.wait().await, OperationResult::Cancelled);
    }
}

// ============================================================================
// Race Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_completion_and_expiry_have_one_winner() {
    const OPERATIONS: usize = 64;

    let (runtime, _acks) = test_runtime();
    let registry = runtime.registry::<RecordingHandler>("race").unwrap();
    let listener = Arc::new(runtime.listener(&registry));
    let log = HookLog::new();

    let keys: Vec<_> = (0..OPERATIONS).map(|_| unique_key()).collect();
    for key in &keys {
        registry
            .register(*key, RecordingHandler::new(*key, &log), Duration::from_millis(1))
            .unwrap()
            .unwrap();
    }

    // Every deadline has passed; completion and sweep now race
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut dispatches = Vec::new();
    for key in keys.clone() {
        let listener = listener.clone();
        dispatches.push(tokio::spawn(async move {
            (key, listener.dispatch(&button(key, "done")))
        }));
    }
    let sweeper = registry.clone();
    let sweep = tokio::spawn(async move { sweeper.sweep() });

    let mut completed = HashSet::new();
    for dispatch in dispatches {
        let (key, outcome) = dispatch.await.unwrap();
        if outcome == DispatchOutcome::Completed {
            completed.insert(key);
        }
    }
    let evicted = sweep.await.unwrap();

    assert_eq!(completed.len() + evicted, OPERATIONS);
    assert!(registry.is_empty());

    log.wait_for(Hook::Expire, evicted).await;
    for key in &keys {
        let expired = log.count_for(*key, Hook::Expire);
        let won = usize::from(completed.contains(key));
        assert_eq!(expired + won, 1, "operation {key} torn down {} times", expired + won);
    }
}

// ============================================================================
// Dispatch Routing Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_router_classifies_raw_payloads() {
    let (runtime, mut acks) = test_runtime();
    let menus = runtime.registry::<RecordingHandler>("menus").unwrap();
    let lobbies = runtime.registry::<RecordingHandler>("lobbies").unwrap();
    let router = DispatchRouter::new()
        .with_route(Arc::new(runtime.listener(&menus)))
        .with_route(Arc::new(runtime.listener(&lobbies)));
    let log = HookLog::new();
    let key = unique_key();

    let handle = lobbies
        .register_default(key, RecordingHandler::new(key, &log))
        .unwrap()
        .unwrap();

    let outcome = router.dispatch_raw(component_payload(key, "done", 3)).unwrap();
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(
        handle.wait().await,
        OperationResult::Completed("first,second".to_string())
    );
    assert_eq!(acks.recv().await.unwrap().token, "raw-token");

    // Text inputs are not message components
    let err = router.dispatch_raw(component_payload(key, "done", 4)).unwrap_err();
    assert!(matches!(err, CoreError::UnsupportedComponent(4)));

    let ping = r#"{ "id": "1", "type": 1, "token": "t" }"#;
    assert!(dispatch_json(&router, ping).is_err());
    assert!(dispatch_json(&router, "not json").is_err());

    // Nothing registered any more
    let payload = component_payload(key, "done", 2).to_string();
    assert_eq!(dispatch_json(&router, &payload).unwrap(), DispatchOutcome::Ignored);
}

// ============================================================================
// Shard Health Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_silent_shard_is_restarted() {
    let (runtime, _acks) = test_runtime();
    let quiet = FakeShard::healthy(3);
    let chatty = FakeShard::healthy(0);

    runtime.register_shard(quiet.clone()).unwrap();
    let liveness = runtime.register_shard(chatty.clone()).unwrap();

    // Shard 0 keeps processing events, shard 3 goes silent
    let reporter = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            liveness.report_liveness();
        }
    });

    runtime.start();
    let monitor = runtime.monitor();

    tokio::time::sleep(Duration::from_secs(41)).await;
    assert_eq!(monitor.state(ShardId::new(3)), Some(ShardState::Suspect));
    assert_eq!(monitor.state(ShardId::new(0)), Some(ShardState::Alive));

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(monitor.state(ShardId::new(3)), Some(ShardState::Restarting));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(monitor.state(ShardId::new(3)), Some(ShardState::Alive));
    assert_eq!(quiet.restarts(), 1);
    assert_eq!(chatty.restarts(), 0);

    let status = serde_json::to_value(monitor.status()).unwrap();
    assert_eq!(status[0]["shard"], 0);
    assert_eq!(status[1]["shard"], 3);
    assert_eq!(status[1]["state"], "alive");
    assert_eq!(status[1]["restarts"], 1);

    reporter.abort();
    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_restart_waits_for_operator() {
    let (runtime, _acks) = test_runtime();
    let shard = FakeShard::new(2, RestartScript::Fail("identify rejected".to_string()));
    runtime.register_shard(shard.clone()).unwrap();
    let monitor = runtime.monitor();

    runtime.start();
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(monitor.state(ShardId::new(2)), Some(ShardState::Failed));

    // No automatic retry on later passes
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(shard.restarts(), 1);
    assert_eq!(monitor.state(ShardId::new(2)), Some(ShardState::Failed));

    let err = monitor.restart_now(ShardId::new(2)).await.unwrap_err();
    assert!(err.is_restart_failure());
    assert_eq!(shard.restarts(), 2);

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_hung_restart_is_bounded() {
    let (runtime, _acks) = test_runtime();
    let shard = FakeShard::new(1, RestartScript::Hang);
    let liveness = runtime.register_shard(shard.clone()).unwrap();
    let monitor = runtime.monitor();

    runtime.start();
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(monitor.state(ShardId::new(1)), Some(ShardState::Restarting));

    tokio::time::sleep(runtime.config().shards.restart_wait()).await;
    assert_eq!(monitor.state(ShardId::new(1)), Some(ShardState::Failed));
    let status = &monitor.status()[0];
    assert!(status.last_error.as_deref().unwrap().contains("did not come back"));

    // A shard that speaks again recovers on the next probe
    liveness.report_liveness();
    tokio::time::sleep(runtime.config().shards.probe_period()).await;
    assert_eq!(monitor.state(ShardId::new(1)), Some(ShardState::Alive));

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_shard_outside_count_is_rejected() {
    let (runtime, _acks) = test_runtime();

    let err = runtime.register_shard(FakeShard::healthy(TEST_SHARDS)).unwrap_err();
    assert_eq!(err.code(), "SHARD_OUT_OF_RANGE");
    assert!(runtime.monitor().is_empty());
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_zero_settings_are_rejected_when_parsed() {
    let json = r#"{
        "app": { "name": "bot" },
        "operations": { "sweep_period_ms": 0 },
        "shards": { "count": 0 }
    }"#;

    let err = serde_json::from_str::<AppConfig>(json).unwrap_err();
    assert!(err.to_string().contains("OPERATION_SWEEP_PERIOD_MS"));
}

#[tokio::test(start_paused = true)]
async fn test_zero_sweep_period_never_reaches_the_sweeper() {
    let mut config = test_config();
    config.operations.sweep_period_ms = 0;
    let err = BotRuntime::new(config).unwrap_err();
    assert_eq!(err.error_code(), "CONFIG_ERROR");

    let err = OperationRegistry::<RecordingHandler>::new("menus", TaskPool::current(), Duration::ZERO)
        .unwrap_err();
    assert_eq!(err, RegistryError::InvalidPeriod(Duration::ZERO));
}
