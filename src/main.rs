//! LanShare Server
//!
//! Shares one machine's files with the rest of the local network.

use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lanshare_server::config::Config;
use lanshare_server::paths::PathRegistry;
use lanshare_server::server::Server;
use lanshare_server::signal::FailureSignal;
use lanshare_server::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "lanshare_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let failure = FailureSignal::new();

    let Some(config) = Config::load_or_signal(|key| std::env::var(key).ok(), &failure) else {
        if let Some(reason) = failure.reason() {
            eprintln!("LanShare failed to start: {}", reason);
        }
        return ExitCode::FAILURE;
    };

    tracing::info!("Starting LanShare Server v{}", env!("CARGO_PKG_VERSION"));

    let paths = PathRegistry::new();
    if let Err(e) = paths.apply(&config.paths) {
        tracing::error!("Failed to register configured paths: {}", e);
        failure.signal(format!("path registration failed: {}", e));
    }

    let state = AppState::new(config, paths, failure.clone());

    let server = match Server::bind(state).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };

    server.welcome();

    match server.wait().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(reason) => {
            eprintln!("LanShare stopped: {}", reason);
            ExitCode::FAILURE
        }
    }
}
