// =============================================================================
// Upstream response schemas — typed payloads plus validation
// =============================================================================
//
// Binance sends most numeric fields as JSON strings ("65000.50"); some mirrors
// send plain numbers. Both are accepted. Anything else, and any price that is
// not a finite positive number, becomes `FetchError::Data` in `validate()`
// rather than failing somewhere deep in parsing.
// =============================================================================

use serde::Deserialize;

use crate::market_data::FetchError;
use crate::types::Observation;

/// A numeric field that may arrive as a string or a number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LenientNumber {
    Number(f64),
    Text(String),
}

impl LenientNumber {
    fn parse(&self, name: &str) -> Result<f64, FetchError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| FetchError::Data(format!("failed to parse {name} as f64: '{s}'"))),
        }
    }
}

fn require_price(value: f64) -> Result<f64, FetchError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(FetchError::Data(format!("price must be positive, got {value}")))
    }
}

fn require_volume(value: f64) -> Result<f64, FetchError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(FetchError::Data(format!("volume must be non-negative, got {value}")))
    }
}

// -----------------------------------------------------------------------------
// GET /api/v3/ticker/24hr
// -----------------------------------------------------------------------------

/// Ticker summary payload.
///
/// `lastPrice` is required (`price` is accepted for the lighter ticker
/// endpoints); `volume` is optional and counts as zero when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerSummary {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, alias = "price")]
    pub last_price: Option<LenientNumber>,
    #[serde(default)]
    pub volume: Option<LenientNumber>,
}

impl TickerSummary {
    /// Check required fields and convert into a timestamped observation.
    pub fn validate(&self) -> Result<Observation, FetchError> {
        let price = self
            .last_price
            .as_ref()
            .ok_or_else(|| FetchError::Data("missing field lastPrice".into()))?
            .parse("lastPrice")
            .and_then(require_price)?;

        let volume = match &self.volume {
            Some(v) => require_volume(v.parse("volume")?)?,
            None => 0.0,
        };

        Ok(Observation::now(price, volume))
    }
}

// -----------------------------------------------------------------------------
// GET /api/v3/trades
// -----------------------------------------------------------------------------

/// A single entry of the recent-trades list.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeRecord {
    pub price: LenientNumber,
    pub qty: LenientNumber,
}

/// Fold a trade list (oldest first) into one observation: the last trade's
/// price and the summed quantity of every trade in the list.
pub fn aggregate_trades(trades: &[TradeRecord]) -> Result<Observation, FetchError> {
    let last = trades
        .last()
        .ok_or_else(|| FetchError::Data("empty trade list".into()))?;

    let price = require_price(last.price.parse("price")?)?;

    let mut volume = 0.0;
    for trade in trades {
        volume += require_volume(trade.qty.parse("qty")?)?;
    }

    Ok(Observation::now(price, volume))
}

// =============================================================================
// Tests
// =============================================================================
