// =============================================================================
// Indicators Module
// =============================================================================
//
// Pure, side-effect-free series computations used by the series buffer and
// the dashboard renderer.

pub mod rolling;

pub use rolling::{pct_change, rolling_mean, tail_mean, tail_sum};
