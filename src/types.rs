// =============================================================================
// Shared types used across the Pulse dashboard
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped (price, volume) sample obtained from the market-data feed.
///
/// Fields are private so an observation cannot be mutated after creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    timestamp: DateTime<Utc>,
    price: f64,
    volume: f64,
}

impl Observation {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    /// Stamp a freshly fetched sample with the current UTC instant.
    pub fn now(price: f64, volume: f64) -> Self {
        Self::new(Utc::now(), price, volume)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }
}

/// A buffered observation together with the metrics derived at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnrichedObservation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    /// Trailing mean of price over at most the last 10 rows.
    pub rolling_mean: f64,
    /// Percent change versus the previous row (0 for the first row).
    pub pct_change: f64,
}

/// Which upstream strategy produces observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// 24h ticker summary: `lastPrice` + `volume` in one object.
    #[default]
    Ticker,
    /// Recent trade list: last trade price, summed quantities.
    Trades,
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ticker => write!(f, "ticker"),
            Self::Trades => write!(f, "trades"),
        }
    }
}

impl std::str::FromStr for DataSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ticker" => Ok(Self::Ticker),
            "trades" => Ok(Self::Trades),
            other => anyhow::bail!("unknown data source '{other}', use 'ticker' or 'trades'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_source_parses_case_insensitively() {
        assert_eq!("Ticker".parse::<DataSourceKind>().unwrap(), DataSourceKind::Ticker);
        assert_eq!(" trades ".parse::<DataSourceKind>().unwrap(), DataSourceKind::Trades);
        assert!("klines".parse::<DataSourceKind>().is_err());
    }

    #[test]
    fn data_source_serialises_lowercase() {
        let json = serde_json::to_string(&DataSourceKind::Trades).unwrap();
        assert_eq!(json, "\"trades\"");
    }
}
