//! Statistical utility functions.

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Calculate the variance of a slice (sample variance with n-1 denominator).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Calculate the median of a slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let sorted = sorted_copy(values);
    median_of_sorted(&sorted)
}

/// Quantile of a slice using linear interpolation between order statistics.
///
/// Matches the default (type 7) definition used by R and NumPy:
/// the `p`-quantile sits at position `(n - 1) * p` of the sorted data.
///
/// # Example
/// ```
/// use anofox_anomaly::utils::quantile;
///
/// let q = quantile(&[1.0, 2.0, 3.0, 4.0], 0.25);
/// assert!((q - 1.75).abs() < 1e-12);
/// ```
pub fn quantile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    quantile_of_sorted(&sorted_copy(values), p)
}

/// Quantile of already sorted data. See [`quantile`].
pub fn quantile_of_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let p = p.clamp(0.0, 1.0);
    let pos = (n - 1) as f64 * p;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = pos - lo as f64;
    sorted[lo] + frac * (sorted[hi] - sorted[lo])
}

/// Centered running median with the window shifted inward at the edges.
///
/// Every output is the median of exactly `window` points when the series is at
/// least that long.
pub fn running_median(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let window = window.clamp(1, n);
    let half = window / 2;

    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half).min(n - window);
            median(&values[start..start + window])
        })
        .collect()
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n.is_multiple_of(2) {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_calculates_correctly() {
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        assert_relative_eq!(mean(&[10.0]), 10.0, epsilon = 1e-10);
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn variance_calculates_correctly() {
        // Sample variance of [1, 2, 3, 4, 5] = 2.5
        assert_relative_eq!(variance(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2.5, epsilon = 1e-10);
        assert!(variance(&[1.0]).is_nan());
        assert!(variance(&[]).is_nan());
    }

    #[test]
    fn median_calculates_correctly() {
        // Odd number of elements
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3.0, epsilon = 1e-10);
        // Even number of elements
        assert_relative_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5, epsilon = 1e-10);
        // Unsorted input
        assert_relative_eq!(median(&[5.0, 1.0, 3.0, 2.0, 4.0]), 3.0, epsilon = 1e-10);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn quantile_interpolates_between_order_statistics() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&values, 0.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(quantile(&values, 0.25), 1.75, epsilon = 1e-12);
        assert_relative_eq!(quantile(&values, 0.5), 2.5, epsilon = 1e-12);
        assert_relative_eq!(quantile(&values, 0.75), 3.25, epsilon = 1e-12);
        assert_relative_eq!(quantile(&values, 1.0), 4.0, epsilon = 1e-12);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn quantile_of_single_value() {
        assert_relative_eq!(quantile(&[7.0], 0.25), 7.0, epsilon = 1e-12);
        assert_relative_eq!(quantile(&[7.0], 0.75), 7.0, epsilon = 1e-12);
    }

    #[test]
    fn running_median_ignores_isolated_spike() {
        let values = [1.0, 1.0, 1.0, 50.0, 1.0, 1.0, 1.0];
        let smoothed = running_median(&values, 3);
        assert_eq!(smoothed.len(), values.len());
        assert!(smoothed.iter().all(|&v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn running_median_shifts_window_at_edges() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let smoothed = running_median(&values, 3);
        // Edge windows are [1, 2, 3] and [3, 4, 5]
        assert_relative_eq!(smoothed[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(smoothed[4], 4.0, epsilon = 1e-12);
        assert_relative_eq!(smoothed[2], 3.0, epsilon = 1e-12);
    }
}
