// =============================================================================
// Runtime Configuration — dashboard controls with atomic save
// =============================================================================
//
// Holds the interactive controls (symbol, refresh interval, alert threshold,
// theme) and the upstream settings. The controls can be changed while the
// dashboard runs; the file is rewritten after every accepted change and on
// shutdown.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::binance::client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::market_data::source::DEFAULT_TRADE_LIMIT;
use crate::types::DataSourceKind;

/// Bounds of the refresh-interval control, in seconds.
pub const MIN_REFRESH_SECS: u64 = 1;
pub const MAX_REFRESH_SECS: u64 = 30;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "BTCUSDT".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    5
}

fn default_alert_threshold() -> f64 {
    50_000.0
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_trade_limit() -> u32 {
    DEFAULT_TRADE_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

// =============================================================================
// Validation helpers
// =============================================================================

/// Trim and uppercase a ticker symbol; rejects empty input.
pub fn normalize_symbol(raw: &str) -> Result<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        anyhow::bail!("symbol must not be empty");
    }
    Ok(symbol)
}

pub fn validate_refresh_interval(secs: u64) -> Result<u64> {
    if !(MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&secs) {
        anyhow::bail!(
            "refresh interval must be between {MIN_REFRESH_SECS} and {MAX_REFRESH_SECS} seconds, got {secs}"
        );
    }
    Ok(secs)
}

pub fn validate_alert_threshold(threshold: f64) -> Result<f64> {
    if !threshold.is_finite() || threshold < 0.0 {
        anyhow::bail!("alert threshold must be a non-negative number, got {threshold}");
    }
    Ok(threshold)
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    // --- Interactive controls -----------------------------------------------

    /// Ticker symbol being watched (uppercase).
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Seconds to sleep between ticks (1–30).
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Alert fires while the last price is strictly above this value.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,

    /// Dark theme palette when `true`.
    #[serde(default)]
    pub dark_mode: bool,

    // --- Upstream -----------------------------------------------------------

    /// Which endpoint shape to poll.
    #[serde(default)]
    pub data_source: DataSourceKind,

    /// Scheme + host of the market-data REST API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional `User-Agent` header override.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Trades aggregated per tick by the trade-list source.
    #[serde(default = "default_trade_limit")]
    pub trade_limit: u32,

    /// Per-request timeout, at most 5 s.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            refresh_interval_secs: default_refresh_interval_secs(),
            alert_threshold: default_alert_threshold(),
            dark_mode: false,
            data_source: DataSourceKind::default(),
            base_url: default_base_url(),
            user_agent: None,
            trade_limit: default_trade_limit(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;
        config.sanitize();

        info!(
            path = %path.display(),
            symbol = %config.symbol,
            data_source = %config.data_source,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise dashboard config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "dashboard config saved (atomic)");
        Ok(())
    }

    /// Apply `PULSE_*` environment overrides. Invalid values are logged and
    /// skipped.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("PULSE_SYMBOL") {
            match normalize_symbol(&raw) {
                Ok(symbol) => self.symbol = symbol,
                Err(e) => warn!(error = %e, "ignoring PULSE_SYMBOL"),
            }
        }
        if let Some(raw) = lookup("PULSE_DATA_SOURCE") {
            match raw.parse::<DataSourceKind>() {
                Ok(kind) => self.data_source = kind,
                Err(e) => warn!(error = %e, "ignoring PULSE_DATA_SOURCE"),
            }
        }
        if let Some(url) = lookup("PULSE_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(ua) = lookup("PULSE_USER_AGENT").filter(|u| !u.trim().is_empty()) {
            self.user_agent = Some(ua);
        }
    }

    /// Clamp out-of-range values loaded from disk instead of refusing to
    /// start.
    fn sanitize(&mut self) {
        match normalize_symbol(&self.symbol) {
            Ok(symbol) => self.symbol = symbol,
            Err(_) => {
                warn!("empty symbol in config, using default");
                self.symbol = default_symbol();
            }
        }

        let clamped = self
            .refresh_interval_secs
            .clamp(MIN_REFRESH_SECS, MAX_REFRESH_SECS);
        if clamped != self.refresh_interval_secs {
            warn!(
                configured = self.refresh_interval_secs,
                clamped, "refresh interval out of range"
            );
            self.refresh_interval_secs = clamped;
        }

        if validate_alert_threshold(self.alert_threshold).is_err() {
            warn!(configured = self.alert_threshold, "invalid alert threshold, using 0");
            self.alert_threshold = 0.0;
        }

        let max_timeout = DEFAULT_TIMEOUT.as_secs();
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = max_timeout;
        } else if self.request_timeout_secs > max_timeout {
            warn!(
                configured = self.request_timeout_secs,
                clamped = max_timeout,
                "request timeout above upper bound"
            );
            self.request_timeout_secs = max_timeout;
        }
        if self.trade_limit == 0 {
            self.trade_limit = default_trade_limit();
        }
    }

    /// Apply a partial controls update. Either every field is valid and the
    /// whole update is applied, or nothing changes.
    ///
    /// Returns a human-readable list of the fields that changed.
    pub fn apply_update(&mut self, update: &ControlsUpdate) -> Result<Vec<String>> {
        let symbol = update.symbol.as_deref().map(normalize_symbol).transpose()?;
        let interval = update
            .refresh_interval_secs
            .map(validate_refresh_interval)
            .transpose()?;
        let threshold = update
            .alert_threshold
            .map(validate_alert_threshold)
            .transpose()?;

        let mut changes = Vec::new();

        if let Some(symbol) = symbol {
            if self.symbol != symbol {
                changes.push(format!("symbol: {} -> {}", self.symbol, symbol));
                self.symbol = symbol;
            }
        }
        if let Some(secs) = interval {
            if self.refresh_interval_secs != secs {
                changes.push(format!(
                    "refresh_interval_secs: {} -> {}",
                    self.refresh_interval_secs, secs
                ));
                self.refresh_interval_secs = secs;
            }
        }
        if let Some(threshold) = threshold {
            if self.alert_threshold != threshold {
                changes.push(format!(
                    "alert_threshold: {} -> {}",
                    self.alert_threshold, threshold
                ));
                self.alert_threshold = threshold;
            }
        }
        if let Some(dark) = update.dark_mode {
            if self.dark_mode != dark {
                changes.push(format!("dark_mode: {} -> {}", self.dark_mode, dark));
                self.dark_mode = dark;
            }
        }

        Ok(changes)
    }
}

/// Partial update of the interactive controls (`POST /api/v1/controls`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ControlsUpdate {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub refresh_interval_secs: Option<u64>,
    #[serde(default)]
    pub alert_threshold: Option<f64>,
    #[serde(default)]
    pub dark_mode: Option<bool>,
}
