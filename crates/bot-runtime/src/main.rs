//! Bot runtime host entry point
//!
//! Run with:
//! ```bash
//! cargo run -p bot-runtime
//! ```
//!
//! Configuration is loaded from environment variables. The host starts the
//! shard monitor and drains the acknowledgement queue until Ctrl-C.

use bot_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use bot_runtime::BotRuntime;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration first so logging can follow the environment
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, code = e.error_code(), "Bot runtime failed");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> bot_common::AppResult<()> {
    info!(
        env = ?config.app.env,
        shards = config.shards.count,
        sweep_ms = config.operations.sweep_period_ms,
        "Configuration loaded"
    );

    let (runtime, mut acks) = BotRuntime::new(config)?;
    runtime.start();

    // Without a gateway client attached, acknowledgements are only logged
    let drain = tokio::spawn(async move {
        while let Some(ack) = acks.recv().await {
            tracing::debug!(
                interaction_id = %ack.interaction_id,
                response_type = ack.response_type.as_u8(),
                "Acknowledgement ready"
            );
        }
    });

    tokio::signal::ctrl_c()
        .await
        .map_err(bot_common::AppError::internal)?;

    info!("Shutdown signal received");
    runtime.shutdown().await;
    drop(runtime);

    if let Err(e) = drain.await {
        error!(error = %e, "Acknowledgement drain ended abnormally");
    }

    Ok(())
}
