pub mod errors;
#[cfg(test)]
pub mod mock_upstream;
pub mod series_buffer;
pub mod source;

pub use errors::FetchError;
pub use series_buffer::SeriesBuffer;
pub use source::{build_source, Fetcher};
