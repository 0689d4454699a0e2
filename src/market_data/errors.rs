use thiserror::Error;

/// Why a fetch produced no observation.
///
/// Never leaves the fetcher: [`crate::market_data::Fetcher::fetch`] logs it
/// and returns `None` instead.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, connection failure or a non-2xx status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The body was empty, malformed, or carried no usable price.
    #[error("data error: {0}")]
    Data(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        Self::Data(e.to_string())
    }
}
