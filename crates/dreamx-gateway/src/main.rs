//! Dream X gateway entry point
//!
//! Run with:
//! ```bash
//! cargo run -p dreamx-gateway
//! ```
//!
//! Configuration is loaded from environment variables. Pair it with
//! `REALTIME_BACKEND=redis` so events published by the API reach it.

use dreamx_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Gateway failed to start");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Dream X Gateway...");

    info!(
        env = ?config.app.env,
        port = config.gateway.port,
        backend = ?config.realtime.backend,
        "Configuration loaded"
    );

    dreamx_gateway::run(config).await?;
    Ok(())
}
