// =============================================================================
// Binance REST API Client — public market-data endpoints
// =============================================================================
//
// Only unsigned endpoints are used, so no API key is configured. Every request
// carries a hard timeout (5 s by default); a request that exceeds it surfaces
// as `FetchError::Transport` and is never retried.
// =============================================================================

use std::time::Duration;

use anyhow::Context;
use reqwest::header::{HeaderValue, USER_AGENT};
use tracing::{debug, instrument, warn};

use crate::binance::response::{TickerSummary, TradeRecord};
use crate::market_data::FetchError;

/// Public Binance REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
/// Upper bound on a single market-data request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Binance REST client for unsigned market-data requests.
#[derive(Clone)]
pub struct BinanceClient {
    base_url: String,
    client: reqwest::Client,
}

impl BinanceClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new `BinanceClient`.
    ///
    /// # Arguments
    /// * `base_url`   — scheme + host, e.g. "https://api.binance.com".
    /// * `timeout`    — per-request timeout.
    /// * `user_agent` — optional `User-Agent` override.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> anyhow::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(ua) = user_agent {
            match HeaderValue::from_str(ua) {
                Ok(val) => {
                    let mut headers = reqwest::header::HeaderMap::new();
                    headers.insert(USER_AGENT, val);
                    builder = builder.default_headers(headers);
                }
                Err(_) => warn!(user_agent = %ua, "ignoring invalid User-Agent override"),
            }
        }

        let client = builder.build().context("failed to build reqwest client")?;

        debug!(base_url = %base_url, timeout_ms = timeout.as_millis() as u64, "BinanceClient initialised");

        Ok(Self { base_url, client })
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /api/v3/ticker/24hr (public — no signature required).
    #[instrument(skip(self), name = "binance::get_ticker_24hr")]
    pub async fn get_ticker_24hr(&self, symbol: &str) -> Result<TickerSummary, FetchError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let body = self.get_body(&url, &[("symbol", symbol.to_string())]).await?;

        let ticker: TickerSummary = serde_json::from_str(&body)?;
        debug!(symbol, reported = ?ticker.symbol, "ticker fetched");
        Ok(ticker)
    }

    /// GET /api/v3/trades (public) — most recent `limit` trades, oldest first.
    #[instrument(skip(self), name = "binance::get_recent_trades")]
    pub async fn get_recent_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<TradeRecord>, FetchError> {
        let url = format!("{}/api/v3/trades", self.base_url);
        let body = self
            .get_body(
                &url,
                &[("symbol", symbol.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        let trades: Vec<TradeRecord> = serde_json::from_str(&body)?;
        debug!(symbol, count = trades.len(), "recent trades fetched");
        Ok(trades)
    }

    // -------------------------------------------------------------------------
    // Internal helpers
    // -------------------------------------------------------------------------

    /// Issue a GET and return the raw body of a 2xx response.
    async fn get_body(&self, url: &str, query: &[(&str, String)]) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("GET {url} request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("failed to read body of {url}: {e}")))?;

        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "Binance GET {url} returned {status}: {body}"
            )));
        }

        if body.trim().is_empty() {
            return Err(FetchError::Data(format!("empty body from {url}")));
        }

        Ok(body)
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
