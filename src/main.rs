// =============================================================================
// Pulse Dashboard — Main Entry Point
// =============================================================================
//
// Polls one market-data endpoint on a fixed interval, keeps the most recent
// observations in a bounded series buffer and serves the rendered dashboard
// over REST and WebSocket. Ctrl+C stops the scheduler and saves the controls.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod alert;
mod api;
mod app_state;
mod binance;
mod dashboard;
mod indicators;
mod market_data;
mod runtime_config;
mod scheduler;
mod types;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::DashboardSession;
use crate::binance::BinanceClient;
use crate::market_data::{build_source, Fetcher};
use crate::runtime_config::DashboardConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Pulse Dashboard — starting up");

    let config_path = PathBuf::from(
        std::env::var("PULSE_CONFIG").unwrap_or_else(|_| "dashboard_config.json".into()),
    );

    let mut config = DashboardConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        DashboardConfig::default()
    });
    config.apply_env_overrides();

    info!(
        symbol = %config.symbol,
        data_source = %config.data_source,
        base_url = %config.base_url,
        refresh_interval_secs = config.refresh_interval_secs,
        alert_threshold = config.alert_threshold,
        "Dashboard configured"
    );

    // ── 2. Build the fetcher ─────────────────────────────────────────────
    let client = BinanceClient::new(
        config.base_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
        config.user_agent.as_deref(),
    )?;
    let fetcher = Fetcher::new(build_source(config.data_source, client, config.trade_limit));

    // ── 3. Session ───────────────────────────────────────────────────────
    let session = Arc::new(DashboardSession::new(config, Some(config_path)));

    // ── 4. API server ────────────────────────────────────────────────────
    let bind_addr = std::env::var("PULSE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3001".into());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    let app = api::rest::router(session.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server failed");
        }
    });

    // ── 5. Tick scheduler ────────────────────────────────────────────────
    let (stop_tx, stop_rx) = watch::channel(false);
    let scheduler = tokio::spawn(scheduler::run_scheduler(session.clone(), fetcher, stop_rx));

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 6. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    let _ = stop_tx.send(true);
    if let Err(e) = scheduler.await {
        error!(error = %e, "Tick scheduler task failed");
    }

    if let Err(e) = session.save_controls() {
        error!(error = %e, "Failed to save dashboard controls on shutdown");
    }

    info!("Pulse Dashboard shut down complete.");
    Ok(())
}
