mod bootstrap;
mod health;
mod sync;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use quotebridge_core::config::{AppConfig, LoadOptions};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use quotebridge_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Config first so logging honours its level and format
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "quotebridge-server listening"
    );

    let router = app_router(app.sync_state, app.health_state);
    let server = axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown());

    tokio::select! {
        result = server.into_future() => result?,
        _ = drain_deadline(grace) => {
            warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish within the shutdown window"
            );
        }
    }

    info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "quotebridge-server stopping"
    );

    Ok(())
}

fn app_router(sync_state: sync::SyncState, health_state: health::HealthState) -> Router {
    sync::router(sync_state).merge(health::router(health_state)).layer(TraceLayer::new_for_http())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(
            event_name = "system.server.signal_error",
            correlation_id = "shutdown",
            error = %error,
            "could not listen for shutdown signal"
        );
        std::future::pending::<()>().await;
    }
}

async fn drain_deadline(grace: Duration) {
    wait_for_shutdown().await;
    tokio::time::sleep(grace).await;
}
