// =============================================================================
// Dashboard View — what the presentation layer draws for one tick
// =============================================================================
//
// `render` is a pure function of the controls, the enriched series and the
// tick's fetch outcome. The result is serialised as-is to REST and WebSocket
// clients, which only have to lay it out.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::AlertBanner;
use crate::market_data::series_buffer::{mean_pct_change, volume_sum};
use crate::runtime_config::DashboardConfig;
use crate::types::EnrichedObservation;

pub const TITLE: &str = "Crypto Real-Time Dashboard";

// =============================================================================
// View types
// =============================================================================

/// Colours for the current theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemePalette {
    pub dark_mode: bool,
    pub background: &'static str,
    pub text: &'static str,
    pub logo: &'static str,
    pub chart_line: &'static str,
}

impl ThemePalette {
    pub fn for_mode(dark_mode: bool) -> Self {
        if dark_mode {
            Self {
                dark_mode,
                background: "#0e1117",
                text: "white",
                logo: "white",
                chart_line: "lightblue",
            }
        } else {
            Self {
                dark_mode,
                background: "white",
                text: "black",
                logo: "black",
                chart_line: "blue",
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTile {
    pub label: &'static str,
    pub value: String,
    pub raw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub rolling_mean: f64,
}

/// Everything the dashboard shows after one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: &'static str,
    pub symbol: String,
    pub refresh_interval_secs: u64,
    pub theme: ThemePalette,
    /// Last price, 1-min mean % change, 1-min volume sum. Empty until the
    /// first observation arrives.
    pub kpis: Vec<KpiTile>,
    pub chart: Vec<ChartPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<AlertBanner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub rendered_at: DateTime<Utc>,
}

impl DashboardView {
    pub fn kpi(&self, label: &str) -> Option<&KpiTile> {
        self.kpis.iter().find(|k| k.label == label)
    }
}

pub const KPI_LAST_PRICE: &str = "Last Price";
pub const KPI_PCT_CHANGE: &str = "1-min % Change";
pub const KPI_VOLUME: &str = "Volume (1-min)";

// =============================================================================
// Rendering
// =============================================================================

/// Message shown for a tick whose fetch produced no data.
pub fn fetch_error_message(symbol: &str) -> String {
    format!(
        "Failed to fetch data for symbol '{symbol}'. Please check the symbol and API availability."
    )
}

/// Build the view for `config` and `series`; `error` is set when this
/// tick's fetch failed.
///
/// A failed tick shows only the error: KPIs, chart and alert are drawn from
/// fresh data or not at all, so a stale price never re-fires the alert.
pub fn render(
    config: &DashboardConfig,
    series: &[EnrichedObservation],
    error: Option<String>,
) -> DashboardView {
    let series = if error.is_some() { &[][..] } else { series };

    let (kpis, alert) = match series.last() {
        Some(last) => {
            let pct = mean_pct_change(series);
            let vol = volume_sum(series);
            let kpis = vec![
                KpiTile {
                    label: KPI_LAST_PRICE,
                    value: format!("${}", format_thousands(last.price, 2)),
                    raw: last.price,
                },
                KpiTile {
                    label: KPI_PCT_CHANGE,
                    value: format_percent(pct),
                    raw: pct,
                },
                KpiTile {
                    label: KPI_VOLUME,
                    value: format_thousands(vol, 2),
                    raw: vol,
                },
            ];
            (kpis, AlertBanner::check(last.price, config.alert_threshold))
        }
        None => (Vec::new(), None),
    };

    let chart = series
        .iter()
        .map(|row| ChartPoint {
            timestamp: row.timestamp,
            price: row.price,
            rolling_mean: row.rolling_mean,
        })
        .collect();

    DashboardView {
        title: TITLE,
        symbol: config.symbol.clone(),
        refresh_interval_secs: config.refresh_interval_secs,
        theme: ThemePalette::for_mode(config.dark_mode),
        kpis,
        chart,
        alert,
        error,
        rendered_at: Utc::now(),
    }
}

/// Two-decimal percentage; values that round to zero print as `0.00%`
/// rather than `-0.00%`.
pub fn format_percent(pct: f64) -> String {
    let pct = if pct.abs() < 0.005 { 0.0 } else { pct };
    format!("{pct:.2}%")
}

/// Format `value` with `decimals` fraction digits and comma thousands
/// separators (`65000.5` -> `65,000.50`).
pub fn format_thousands(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================
