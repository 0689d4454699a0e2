// =============================================================================
// Dashboard Session — explicit state carried across ticks
// =============================================================================
//
// Replaces process-wide UI state: the controls, the series buffer and the last
// rendered view live here and the session is handed to every tick and every
// API handler through `Arc<DashboardSession>`.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock for the controls, the view and the error log.
//   - The series buffer manages its own lock.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::dashboard::{self, DashboardView};
use crate::market_data::SeriesBuffer;
use crate::runtime_config::{ControlsUpdate, DashboardConfig};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded fetch failure for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    pub symbol: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// DashboardSession
// =============================================================================

pub struct DashboardSession {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented whenever the rendered view changes. The WebSocket feed
    /// pushes a new view when it sees a different value.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub config: Arc<RwLock<DashboardConfig>>,
    /// Where accepted control changes are persisted. `None` disables saving.
    config_path: Option<PathBuf>,

    // ── Market Data ─────────────────────────────────────────────────────
    pub buffer: Arc<SeriesBuffer>,

    // ── Presentation ────────────────────────────────────────────────────
    view: RwLock<DashboardView>,
    /// Error message of the most recent tick, cleared by the next success.
    tick_error: RwLock<Option<String>>,
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Tick statistics ─────────────────────────────────────────────────
    pub ticks_total: AtomicU64,
    pub ticks_failed: AtomicU64,

    pub start_time: std::time::Instant,
}

impl DashboardSession {
    pub fn new(config: DashboardConfig, config_path: Option<PathBuf>) -> Self {
        Self::with_buffer(config, config_path, SeriesBuffer::default())
    }

    pub fn with_buffer(
        config: DashboardConfig,
        config_path: Option<PathBuf>,
        buffer: SeriesBuffer,
    ) -> Self {
        let view = dashboard::render(&config, &[], None);
        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            config: Arc::new(RwLock::new(config)),
            config_path,
            buffer: Arc::new(buffer),
            view: RwLock::new(view),
            tick_error: RwLock::new(None),
            recent_errors: RwLock::new(Vec::new()),
            ticks_total: AtomicU64::new(0),
            ticks_failed: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Controls ────────────────────────────────────────────────────────

    /// Copy of the current controls.
    pub fn controls(&self) -> DashboardConfig {
        self.config.read().clone()
    }

    /// Validate and apply a controls update, persist it (best-effort) and
    /// re-render so the change shows up without waiting for the next tick.
    pub fn update_controls(&self, update: &ControlsUpdate) -> Result<Vec<String>> {
        let (changes, snapshot) = {
            let mut config = self.config.write();
            let changes = config.apply_update(update)?;
            (changes, config.clone())
        };

        if changes.is_empty() {
            return Ok(changes);
        }

        info!(changes = ?changes, "Dashboard controls updated");

        if let Some(path) = &self.config_path {
            if let Err(e) = snapshot.save(path) {
                warn!(error = %e, "Failed to save dashboard controls to disk");
            }
        }

        self.rerender();
        Ok(changes)
    }

    /// Save the controls to the configured path, if any.
    pub fn save_controls(&self) -> Result<()> {
        match &self.config_path {
            Some(path) => self.config.read().save(path),
            None => Ok(()),
        }
    }

    // ── Tick outcome ────────────────────────────────────────────────────

    /// Record the outcome of one tick and render the resulting view.
    pub fn publish_tick(&self, error: Option<String>) -> DashboardView {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = &error {
            self.ticks_failed.fetch_add(1, Ordering::Relaxed);
            let symbol = self.config.read().symbol.clone();
            self.push_error(message.clone(), symbol);
        }
        *self.tick_error.write() = error;
        self.rerender()
    }

    /// Re-render from the current buffer, controls and tick error.
    ///
    /// The view lock is held from snapshot to store so concurrent renders
    /// are serialised and the stored view is never older than its inputs.
    pub fn rerender(&self) -> DashboardView {
        let mut current = self.view.write();

        let series = self.buffer.snapshot();
        let config = self.config.read().clone();
        let error = self.tick_error.read().clone();

        let view = dashboard::render(&config, &series, error);
        *current = view.clone();
        self.increment_version();
        view
    }

    /// The most recently rendered view.
    pub fn view(&self) -> DashboardView {
        self.view.read().clone()
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Append to the error log, evicting the oldest entries past
    /// [`MAX_RECENT_ERRORS`].
    pub fn push_error(&self, message: String, symbol: String) {
        let record = ErrorRecord {
            message,
            symbol,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    // ── Status ──────────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        let config = self.config.read();
        SessionStatus {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            symbol: config.symbol.clone(),
            data_source: config.data_source.to_string(),
            buffered: self.buffer.len(),
            capacity: self.buffer.capacity(),
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            ticks_failed: self.ticks_failed.load(Ordering::Relaxed),
            ws_sequence_number: self.ws_sequence_number.load(Ordering::Relaxed),
            recent_errors: self.recent_errors.read().clone(),
        }
    }
}

/// Operational summary for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_secs: u64,
    pub symbol: String,
    pub data_source: String,
    pub buffered: usize,
    pub capacity: usize,
    pub ticks_total: u64,
    pub ticks_failed: u64,
    pub ws_sequence_number: u64,
    pub recent_errors: Vec<ErrorRecord>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{fetch_error_message, KPI_LAST_PRICE};
    use crate::types::Observation;

    #[test]
    fn fresh_session_renders_empty_view() {
        let session = DashboardSession::new(DashboardConfig::default(), None);
        let view = session.view();
        assert!(view.kpis.is_empty());
        assert!(view.error.is_none());
        assert_eq!(view.symbol, "BTCUSDT");
    }

    #[test]
    fn tick_error_shows_for_one_tick_only() {
        let session = DashboardSession::new(DashboardConfig::default(), None);

        let view = session.publish_tick(Some(fetch_error_message("BTCUSDT")));
        assert!(view.error.is_some());
        assert_eq!(session.recent_errors.read().len(), 1);

        session.buffer.append(Observation::now(100.0, 1.0));
        let view = session.publish_tick(None);
        assert!(view.error.is_none());
        assert_eq!(view.kpi(KPI_LAST_PRICE).unwrap().value, "$100.00");

        let status = session.status();
        assert_eq!(status.ticks_total, 2);
        assert_eq!(status.ticks_failed, 1);
        assert_eq!(status.buffered, 1);
    }

    #[test]
    fn publish_bumps_version() {
        let session = DashboardSession::new(DashboardConfig::default(), None);
        let before = session.current_state_version();
        session.publish_tick(None);
        assert!(session.current_state_version() > before);
    }

    #[test]
    fn controls_update_rerenders_theme() {
        let session = DashboardSession::new(DashboardConfig::default(), None);
        let update = ControlsUpdate {
            dark_mode: Some(true),
            ..Default::default()
        };
        let changes = session.update_controls(&update).unwrap();
        assert_eq!(changes.len(), 1);
        assert!(session.view().theme.dark_mode);
    }

    #[test]
    fn invalid_controls_update_changes_nothing() {
        let session = DashboardSession::new(DashboardConfig::default(), None);
        let version = session.current_state_version();
        let update = ControlsUpdate {
            refresh_interval_secs: Some(0),
            ..Default::default()
        };
        assert!(session.update_controls(&update).is_err());
        assert_eq!(session.controls(), DashboardConfig::default());
        assert_eq!(session.current_state_version(), version);
    }

    #[test]
    fn concurrent_ticks_never_revert_a_controls_change() {
        let session = Arc::new(DashboardSession::new(DashboardConfig::default(), None));
        session.buffer.append(Observation::now(100.0, 1.0));

        let tickers: Vec<_> = (0..4)
            .map(|_| {
                let session = session.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        session.publish_tick(None);
                    }
                })
            })
            .collect();

        let update = ControlsUpdate {
            dark_mode: Some(true),
            alert_threshold: Some(10.0),
            ..Default::default()
        };
        session.update_controls(&update).unwrap();

        for t in tickers {
            t.join().unwrap();
        }

        let view = session.view();
        assert!(view.theme.dark_mode);
        assert!(view.alert.is_some());
    }

    #[test]
    fn error_log_is_capped() {
        let session = DashboardSession::new(DashboardConfig::default(), None);
        for i in 0..(MAX_RECENT_ERRORS + 5) {
            session.push_error(format!("error {i}"), "BTCUSDT".into());
        }
        let errors = session.recent_errors.read();
        assert_eq!(errors.len(), MAX_RECENT_ERRORS);
        assert_eq!(errors[0].message, "error 5");
    }
}
