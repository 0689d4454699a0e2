// =============================================================================
// Market-data sources — explicit strategies behind one fetch contract
// =============================================================================
//
// Two upstream shapes are supported and the operator picks one in the config:
//   - `TickerSource`  — 24h ticker summary (`lastPrice` + `volume`).
//   - `TradesSource`  — recent trade list, price of the last trade and the
//                       summed quantity of the whole list.
//
// `Fetcher` wraps whichever source is configured and collapses every
// `FetchError` into `None` ("not available"). Nothing escapes it.
// =============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::binance::response::aggregate_trades;
use crate::binance::BinanceClient;
use crate::market_data::FetchError;
use crate::types::{DataSourceKind, Observation};

/// Default number of trades aggregated by [`TradesSource`].
pub const DEFAULT_TRADE_LIMIT: u32 = 50;

/// A strategy that turns one upstream request into one observation.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_observation(&self, symbol: &str) -> Result<Observation, FetchError>;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

// -----------------------------------------------------------------------------
// Ticker summary
// -----------------------------------------------------------------------------

pub struct TickerSource {
    client: BinanceClient,
}

impl TickerSource {
    pub fn new(client: BinanceClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MarketDataSource for TickerSource {
    async fn fetch_observation(&self, symbol: &str) -> Result<Observation, FetchError> {
        let ticker = self.client.get_ticker_24hr(symbol).await?;
        ticker.validate()
    }

    fn name(&self) -> &'static str {
        "ticker"
    }
}

// -----------------------------------------------------------------------------
// Recent trades
// -----------------------------------------------------------------------------

pub struct TradesSource {
    client: BinanceClient,
    limit: u32,
}

impl TradesSource {
    pub fn new(client: BinanceClient, limit: u32) -> Self {
        Self {
            client,
            limit: limit.max(1),
        }
    }
}

#[async_trait]
impl MarketDataSource for TradesSource {
    async fn fetch_observation(&self, symbol: &str) -> Result<Observation, FetchError> {
        let trades = self.client.get_recent_trades(symbol, self.limit).await?;
        aggregate_trades(&trades)
    }

    fn name(&self) -> &'static str {
        "trades"
    }
}

/// Build the strategy selected by `kind`.
pub fn build_source(
    kind: DataSourceKind,
    client: BinanceClient,
    trade_limit: u32,
) -> Arc<dyn MarketDataSource> {
    match kind {
        DataSourceKind::Ticker => Arc::new(TickerSource::new(client)),
        DataSourceKind::Trades => Arc::new(TradesSource::new(client, trade_limit)),
    }
}

// -----------------------------------------------------------------------------
// Fetcher — the fail-closed boundary
// -----------------------------------------------------------------------------

/// Fail-closed wrapper around a [`MarketDataSource`].
#[derive(Clone)]
pub struct Fetcher {
    source: Arc<dyn MarketDataSource>,
}

impl Fetcher {
    pub fn new(source: Arc<dyn MarketDataSource>) -> Self {
        Self { source }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Fetch one observation for `symbol`; `None` means no usable data this
    /// tick. Errors are logged here and go no further.
    pub async fn fetch(&self, symbol: &str) -> Option<Observation> {
        match self.source.fetch_observation(symbol).await {
            Ok(obs) => {
                debug!(
                    symbol,
                    source = self.source.name(),
                    price = obs.price(),
                    volume = obs.volume(),
                    "observation fetched"
                );
                Some(obs)
            }
            Err(e) => {
                warn!(symbol, source = self.source.name(), error = %e, "market data not available");
                None
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{http::StatusCode, routing::get, Json, Router};

    use super::*;
    use crate::market_data::mock_upstream;

    fn client_for(base_url: &str, timeout: Duration) -> BinanceClient {
        BinanceClient::new(base_url, timeout, Some("pulse-test/1.0")).unwrap()
    }

    #[tokio::test]
    async fn ticker_source_returns_observation() {
        let app = Router::new().route(
            "/api/v3/ticker/24hr",
            get(|| async {
                Json(serde_json::json!({ "symbol": "BTCUSDT", "lastPrice": "65000.5", "volume": "12.34" }))
            }),
        );
        let base = mock_upstream::spawn(app).await;

        let fetcher = Fetcher::new(Arc::new(TickerSource::new(client_for(&base, Duration::from_secs(5)))));
        let obs = fetcher.fetch("BTCUSDT").await.expect("observation");
        assert!(obs.price() > 0.0);
        assert!((obs.price() - 65000.5).abs() < 1e-9);
        assert!((obs.volume() - 12.34).abs() < 1e-9);
    }

    #[tokio::test]
    async fn trades_source_aggregates_list() {
        let app = Router::new().route(
            "/api/v3/trades",
            get(|| async {
                Json(serde_json::json!([
                    { "id": 1, "price": "10.0", "qty": "1.25" },
                    { "id": 2, "price": "11.0", "qty": "0.75" }
                ]))
            }),
        );
        let base = mock_upstream::spawn(app).await;

        let source = build_source(
            DataSourceKind::Trades,
            client_for(&base, Duration::from_secs(5)),
            DEFAULT_TRADE_LIMIT,
        );
        assert_eq!(source.name(), "trades");
        let obs = Fetcher::new(source).fetch("ETHUSDT").await.expect("observation");
        assert!((obs.price() - 11.0).abs() < 1e-9);
        assert!((obs.volume() - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_trade_list_is_not_available() {
        let app = Router::new().route("/api/v3/trades", get(|| async { Json(serde_json::json!([])) }));
        let base = mock_upstream::spawn(app).await;

        let fetcher = Fetcher::new(Arc::new(TradesSource::new(client_for(&base, Duration::from_secs(5)), 50)));
        assert!(fetcher.fetch("ETHUSDT").await.is_none());
    }

    #[tokio::test]
    async fn non_success_status_is_not_available() {
        let app = Router::new().route(
            "/api/v3/ticker/24hr",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "code": -1121, "msg": "Invalid symbol." })),
                )
            }),
        );
        let base = mock_upstream::spawn(app).await;

        let fetcher = Fetcher::new(Arc::new(TickerSource::new(client_for(&base, Duration::from_secs(5)))));
        assert!(fetcher.fetch("NOPE").await.is_none());
    }

    #[tokio::test]
    async fn malformed_body_is_not_available() {
        let app = Router::new().route("/api/v3/ticker/24hr", get(|| async { "not json" }));
        let base = mock_upstream::spawn(app).await;

        let fetcher = Fetcher::new(Arc::new(TickerSource::new(client_for(&base, Duration::from_secs(5)))));
        assert!(fetcher.fetch("BTCUSDT").await.is_none());
    }

    #[tokio::test]
    async fn timeout_is_not_available() {
        let app = Router::new().route(
            "/api/v3/ticker/24hr",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(serde_json::json!({ "lastPrice": "1.0" }))
            }),
        );
        let base = mock_upstream::spawn(app).await;

        let fetcher = Fetcher::new(Arc::new(TickerSource::new(client_for(&base, Duration::from_millis(100)))));
        assert!(fetcher.fetch("BTCUSDT").await.is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_not_available() {
        let base = mock_upstream::closed_port_url().await;
        let fetcher = Fetcher::new(Arc::new(TickerSource::new(client_for(
            &base,
            Duration::from_millis(500),
        ))));
        assert!(fetcher.fetch("BTCUSDT").await.is_none());
    }
}
