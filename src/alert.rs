// =============================================================================
// Price Alert — threshold comparison, re-evaluated every tick
// =============================================================================

use serde::Serialize;

/// `true` iff `latest_price` is strictly above `threshold`.
pub fn evaluate(latest_price: f64, threshold: f64) -> bool {
    latest_price > threshold
}

/// Banner shown on the dashboard while the alert condition holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertBanner {
    pub threshold: f64,
    pub price: f64,
    pub message: String,
}

impl AlertBanner {
    /// Banner for this tick, if the alert fires.
    pub fn check(latest_price: f64, threshold: f64) -> Option<Self> {
        evaluate(latest_price, threshold).then(|| Self {
            threshold,
            price: latest_price,
            message: format!("Alert! Price exceeded {threshold:?}"),
        })
    }
}
