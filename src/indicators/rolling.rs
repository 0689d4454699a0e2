// =============================================================================
// Rolling statistics — trailing mean, percent change, tail aggregates
// =============================================================================
//
// The rolling mean uses a growing window at the start of the series (pandas
// `min_periods=1` semantics): row i averages prices[max(0, i-window+1)..=i].
//
// Percent change compares each row with the one immediately before it:
//   pct = ((price_i - price_{i-1}) / price_{i-1}) * 100
// The first row, and any row whose predecessor is zero or not finite, is 0.

/// Trailing mean of `values` over at most `window` samples ending at each row.
///
/// Returns one value per input; empty when `window == 0`.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= window {
            sum -= values[i - window];
        }
        let n = (i + 1).min(window);
        result.push(sum / n as f64);
    }
    result
}

/// Period-over-period percent change, one value per input row.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i == 0 {
            result.push(0.0);
            continue;
        }
        let prev = values[i - 1];
        if prev == 0.0 || !prev.is_finite() {
            result.push(0.0);
        } else {
            result.push(((values[i] - prev) / prev) * 100.0);
        }
    }
    result
}

/// Mean of the last `n` values (or fewer). `0.0` for an empty tail.
pub fn tail_mean(values: &[f64], n: usize) -> f64 {
    let start = values.len().saturating_sub(n);
    let tail = &values[start..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Sum of the last `n` values (or fewer).
pub fn tail_sum(values: &[f64], n: usize) -> f64 {
    let start = values.len().saturating_sub(n);
    values[start..].iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_grows_then_slides() {
        let prices: Vec<f64> = (1..=12).map(|x| x as f64).collect();
        let rm = rolling_mean(&prices, 10);
        assert_eq!(rm.len(), 12);
        assert!((rm[0] - 1.0).abs() < 1e-12);
        assert!((rm[1] - 1.5).abs() < 1e-12);
        // Rows 0..=9 average 1..=10 = 5.5
        assert!((rm[9] - 5.5).abs() < 1e-12);
        // Row 11 averages 3..=12 = 7.5
        assert!((rm[11] - 7.5).abs() < 1e-12);
    }

    #[test]
    fn rolling_mean_of_constant_series_is_constant() {
        let prices = vec![42_000.25; 25];
        for v in rolling_mean(&prices, 10) {
            assert!((v - 42_000.25).abs() < 1e-9);
        }
    }

    #[test]
    fn rolling_mean_zero_window_is_empty() {
        assert!(rolling_mean(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn pct_change_up_then_down() {
        let pct = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(pct.len(), 3);
        assert_eq!(pct[0], 0.0);
        assert!((pct[1] - 10.0).abs() < 1e-9);
        assert!((pct[2] + 10.0).abs() < 1e-9);
    }

    #[test]
    fn pct_change_after_zero_price_is_zero() {
        let pct = pct_change(&[0.0, 5.0, 10.0]);
        assert_eq!(pct[1], 0.0);
        assert!((pct[2] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn pct_change_after_nan_price_is_zero() {
        let pct = pct_change(&[f64::NAN, 5.0]);
        assert_eq!(pct[1], 0.0);
    }

    #[test]
    fn tail_aggregates_use_at_most_n_rows() {
        let values: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        // Last 60 = 41..=100
        assert!((tail_sum(&values, 60) - 4230.0).abs() < 1e-9);
        assert!((tail_mean(&values, 60) - 70.5).abs() < 1e-9);

        let short = [2.0, 4.0];
        assert!((tail_sum(&short, 60) - 6.0).abs() < 1e-12);
        assert!((tail_mean(&short, 60) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn tail_mean_of_empty_is_zero() {
        assert_eq!(tail_mean(&[], 60), 0.0);
        assert_eq!(tail_sum(&[], 60), 0.0);
    }
}
