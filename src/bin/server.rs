//! campus-agents HTTP server binary.
//!
//! Builds the platform from the environment (see [`campus_agents::config`])
//! and serves the HTTP API until Ctrl-C or SIGTERM.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `RUST_LOG` — Tracing filter (default: "info,campus_agents=debug")
//!
//! # Usage
//!
//! ```bash
//! GOOGLE_API_KEY=... cargo run --bin server
//! ```

use campus_agents::config::Settings;
use campus_agents::platform::Platform;
use campus_agents::server::{app_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,campus_agents=debug".into()),
        )
        .init();

    let settings = Settings::from_env();
    let bind_addr = format!("0.0.0.0:{}", settings.port);

    let platform = Platform::build(settings)?;
    platform.announce_startup().await;
    tracing::info!(
        candidates = platform.cascade.attempts().len(),
        agents = platform.directory.online_agents().len(),
        "campus-agents {} starting on {}",
        campus_agents::VERSION,
        bind_addr
    );

    let app = app_router(AppState::new(platform));
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("campus-agents stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!("failed to listen for SIGTERM: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
