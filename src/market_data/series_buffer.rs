use std::collections::VecDeque;

use parking_lot::RwLock;
use tracing::debug;

use crate::indicators::{pct_change, rolling_mean, tail_mean, tail_sum};
use crate::types::{EnrichedObservation, Observation};

/// Number of observations retained before FIFO eviction kicks in.
pub const DEFAULT_CAPACITY: usize = 300;
/// Trailing window of the rolling price mean.
pub const ROLLING_WINDOW: usize = 10;
/// Rows covered by the "1-minute" KPI aggregates.
pub const KPI_WINDOW: usize = 60;

// ---------------------------------------------------------------------------
// SeriesBuffer -- bounded, chronologically ordered observation ring
// ---------------------------------------------------------------------------

/// Thread-safe ring buffer of the most recent observations.
///
/// The scheduler appends while API handlers take snapshots, so both go
/// through the same lock: a reader never sees a half-applied append.
pub struct SeriesBuffer {
    ring: RwLock<VecDeque<Observation>>,
    capacity: usize,
}

impl SeriesBuffer {
    /// Create an empty buffer holding at most `capacity` observations.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RwLock::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    /// Append `obs` at the back, evicting from the front while over capacity.
    pub fn append(&self, obs: Observation) {
        let mut ring = self.ring.write();
        ring.push_back(obs);
        while ring.len() > self.capacity {
            if let Some(evicted) = ring.pop_front() {
                debug!(timestamp = %evicted.timestamp(), "evicted oldest observation");
            }
        }
    }

    /// Buffer contents in arrival order with derived columns filled in.
    pub fn snapshot(&self) -> Vec<EnrichedObservation> {
        enrich(&self.observations())
    }

    /// Raw observations in arrival order.
    pub fn observations(&self) -> Vec<Observation> {
        self.ring.read().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ring.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for SeriesBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Compute rolling mean and percent change for each row.
pub fn enrich(rows: &[Observation]) -> Vec<EnrichedObservation> {
    let prices: Vec<f64> = rows.iter().map(Observation::price).collect();
    let means = rolling_mean(&prices, ROLLING_WINDOW);
    let changes = pct_change(&prices);

    rows.iter()
        .zip(means)
        .zip(changes)
        .map(|((obs, rolling_mean), pct_change)| EnrichedObservation {
            timestamp: obs.timestamp(),
            price: obs.price(),
            volume: obs.volume(),
            rolling_mean,
            pct_change,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Windowed aggregates consumed by the dashboard
// ---------------------------------------------------------------------------

/// Mean `pct_change` over the last [`KPI_WINDOW`] rows (or fewer).
pub fn mean_pct_change(rows: &[EnrichedObservation]) -> f64 {
    let values: Vec<f64> = rows.iter().map(|r| r.pct_change).collect();
    tail_mean(&values, KPI_WINDOW)
}

/// Summed `volume` over the last [`KPI_WINDOW`] rows (or fewer).
pub fn volume_sum(rows: &[EnrichedObservation]) -> f64 {
    let values: Vec<f64> = rows.iter().map(|r| r.volume).collect();
    tail_sum(&values, KPI_WINDOW)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
