// =============================================================================
// Tick Scheduler — fetch → append → render → sleep, until stopped
// =============================================================================
//
// One task drives every tick, so ticks never overlap: the sleep only starts
// after the previous render finished. The refresh interval and symbol are
// re-read from the session each tick so control changes apply on the next
// cycle. A failed fetch is not retried; the tick renders the error and the
// loop carries on.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::app_state::DashboardSession;
use crate::dashboard::{fetch_error_message, KPI_LAST_PRICE, KPI_PCT_CHANGE, KPI_VOLUME};
use crate::market_data::Fetcher;

/// Run one tick. Returns `true` when an observation was appended.
pub async fn run_tick(session: &DashboardSession, fetcher: &Fetcher) -> bool {
    let symbol = session.config.read().symbol.clone();

    match fetcher.fetch(&symbol).await {
        Some(obs) => {
            session.buffer.append(obs);
            let view = session.publish_tick(None);

            info!(
                symbol = %symbol,
                last_price = %view.kpi(KPI_LAST_PRICE).map(|k| k.value.as_str()).unwrap_or("-"),
                pct_change_1m = %view.kpi(KPI_PCT_CHANGE).map(|k| k.value.as_str()).unwrap_or("-"),
                volume_1m = %view.kpi(KPI_VOLUME).map(|k| k.value.as_str()).unwrap_or("-"),
                alert = view.alert.is_some(),
                buffered = session.buffer.len(),
                "tick rendered"
            );
            if let Some(alert) = &view.alert {
                info!(symbol = %symbol, price = alert.price, threshold = alert.threshold, "{}", alert.message);
            }
            true
        }
        None => {
            session.publish_tick(Some(fetch_error_message(&symbol)));
            false
        }
    }
}

/// Drive ticks until `stop` flips to `true` (or its sender is dropped).
pub async fn run_scheduler(
    session: Arc<DashboardSession>,
    fetcher: Fetcher,
    mut stop: watch::Receiver<bool>,
) {
    info!(source = fetcher.source_name(), "Tick scheduler starting");

    loop {
        if *stop.borrow() {
            break;
        }

        tokio::select! {
            _ = run_tick(&session, &fetcher) => {}
            _ = stop.changed() => {
                debug!("stop signal received mid-tick");
                break;
            }
        }

        let interval = Duration::from_secs(session.config.read().refresh_interval_secs);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            res = stop.changed() => {
                if res.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }

    info!("Tick scheduler stopped");
}

// =============================================================================
// Tests
// =============================================================================
