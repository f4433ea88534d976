//! STL (Seasonal-Trend decomposition using LOESS) implementation.
//!
//! STL decomposes a time series into three components:
//! - Trend: The underlying long-term pattern
//! - Seasonal: The repeating seasonal pattern
//! - Remainder: The residual after removing trend and seasonal
//!
//! A seasonal period of 1 selects trend-only mode: the seasonal component is
//! identically zero and the trend is a single (optionally robust) loess smooth.

use crate::error::{AnomalyError, Result};
use crate::utils::{mean, median, running_median, variance};

/// Window of the running median that seeds robustness weights.
const SEED_WINDOW: usize = 5;

/// Result of STL decomposition.
#[derive(Debug, Clone)]
pub struct STLResult {
    /// Trend component.
    pub trend: Vec<f64>,
    /// Seasonal component.
    pub seasonal: Vec<f64>,
    /// Remainder component.
    pub remainder: Vec<f64>,
}

impl STLResult {
    /// Get the seasonal strength (0 to 1).
    /// Values close to 1 indicate strong seasonality.
    pub fn seasonal_strength(&self) -> f64 {
        strength(&self.seasonal, &self.remainder)
    }

    /// Get the trend strength (0 to 1).
    /// Values close to 1 indicate strong trend.
    pub fn trend_strength(&self) -> f64 {
        strength(&self.trend, &self.remainder)
    }

    pub fn len(&self) -> usize {
        self.trend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trend.is_empty()
    }
}

/// `1 - Var(remainder) / Var(component + remainder)`, clamped to `[0, 1]`.
fn strength(component: &[f64], remainder: &[f64]) -> f64 {
    let var_remainder = variance(remainder);
    let combined: Vec<f64> = component
        .iter()
        .zip(remainder.iter())
        .map(|(c, r)| c + r)
        .collect();
    let var_combined = variance(&combined);

    if var_combined.is_nan() || var_combined < 1e-10 || var_remainder.is_nan() {
        return 0.0;
    }

    (1.0 - var_remainder / var_combined).clamp(0.0, 1.0)
}

/// STL decomposition configuration and algorithm.
#[derive(Debug, Clone)]
pub struct STL {
    /// Seasonal period.
    seasonal_period: usize,
    /// Seasonal LOESS smoothing parameter (ns).
    seasonal_smoothness: usize,
    /// Seasonal subseries are averaged over the whole series.
    periodic: bool,
    /// Trend LOESS smoothing parameter (nt).
    trend_smoothness: usize,
    /// Low-pass filter parameter (nl).
    low_pass_smoothness: usize,
    /// Number of inner iterations.
    inner_iterations: usize,
    /// Number of outer (robustness) iterations.
    outer_iterations: usize,
    /// Use robust fitting.
    robust: bool,
}

impl STL {
    /// Create a new STL decomposer with the given seasonal period.
    ///
    /// A period of 1 decomposes into trend and remainder only.
    pub fn new(seasonal_period: usize) -> Self {
        let seasonal_period = seasonal_period.max(1);

        // Default parameters following Cleveland et al. (1990)
        let ns = (seasonal_period | 1).max(7);
        let nt = if seasonal_period < 2 {
            3
        } else {
            (1.5 * seasonal_period as f64 / (1.0 - 1.5 / ns as f64)).ceil() as usize
        };

        Self {
            seasonal_period,
            seasonal_smoothness: ns,
            periodic: false,
            trend_smoothness: nt | 1,
            low_pass_smoothness: seasonal_period | 1,
            inner_iterations: 2,
            outer_iterations: 0,
            robust: false,
        }
    }

    pub fn seasonal_period(&self) -> usize {
        self.seasonal_period
    }

    pub fn trend_smoothness(&self) -> usize {
        self.trend_smoothness
    }

    /// Set custom seasonal smoothness (ns parameter).
    pub fn with_seasonal_smoothness(mut self, ns: usize) -> Self {
        self.seasonal_smoothness = ns.max(1) | 1;
        self.periodic = false;
        self
    }

    /// Treat the seasonal pattern as fixed: each cycle position is the
    /// (robustly weighted) mean of all same-phase observations.
    pub fn periodic(mut self) -> Self {
        self.periodic = true;
        self
    }

    /// Set custom trend smoothness (nt parameter).
    pub fn with_trend_smoothness(mut self, nt: usize) -> Self {
        self.trend_smoothness = if nt % 2 == 0 { nt + 1 } else { nt };
        self
    }

    /// Enable robust fitting with default iterations.
    pub fn robust(mut self) -> Self {
        self.robust = true;
        self.outer_iterations = 6;
        self
    }

    /// Set number of outer (robustness) iterations.
    pub fn with_outer_iterations(mut self, n: usize) -> Self {
        self.outer_iterations = n;
        if n > 0 {
            self.robust = true;
        }
        self
    }

    /// Set number of inner iterations.
    pub fn with_inner_iterations(mut self, n: usize) -> Self {
        self.inner_iterations = n.max(1);
        self
    }

    /// Decompose the time series.
    ///
    /// Requires at least two full seasonal cycles. The remainder is the exact
    /// difference `series - seasonal - trend`.
    pub fn decompose(&self, series: &[f64]) -> Result<STLResult> {
        let n = series.len();
        let needed = 2 * self.seasonal_period;
        if n < needed {
            return Err(AnomalyError::InsufficientData { needed, got: n });
        }

        // Flat series decompose exactly into trend
        if series.iter().all(|&v| v == series[0]) {
            return Ok(STLResult {
                trend: series.to_vec(),
                seasonal: vec![0.0; n],
                remainder: vec![0.0; n],
            });
        }

        let mut weights = if self.robust {
            seed_weights(series)
        } else {
            vec![1.0; n]
        };

        let outer_iters = if self.robust {
            self.outer_iterations.max(1)
        } else {
            1
        };

        let mut seasonal = vec![0.0; n];
        let mut trend = vec![0.0; n];

        for outer in 0..outer_iters {
            if self.seasonal_period == 1 {
                trend = loess(series, self.trend_smoothness, 1, &weights);
            } else {
                self.inner_loop(series, &weights, &mut seasonal, &mut trend);
            }

            if self.robust && outer + 1 < outer_iters {
                let remainder = remainder_of(series, &seasonal, &trend);
                weights = bisquare_weights(&remainder);
            }
        }

        let remainder = remainder_of(series, &seasonal, &trend);

        Ok(STLResult {
            trend,
            seasonal,
            remainder,
        })
    }

    fn inner_loop(
        &self,
        series: &[f64],
        weights: &[f64],
        seasonal: &mut [f64],
        trend: &mut Vec<f64>,
    ) {
        let n = series.len();
        let period = self.seasonal_period;

        for _ in 0..self.inner_iterations {
            // Step 1: Detrending
            let detrended: Vec<f64> = series.iter().zip(trend.iter()).map(|(y, t)| y - t).collect();

            // Step 2: Cycle-subseries smoothing, extended by one cycle on each side
            let cycle_subseries = self.smooth_cycle_subseries(&detrended, weights);

            // Step 3: Low-pass filter of smoothed cycle-subseries
            let low_pass = self.low_pass_filter(&cycle_subseries);

            // Step 4: Detrending of smoothed cycle-subseries
            for i in 0..n {
                seasonal[i] = cycle_subseries[period + i] - low_pass[i];
            }

            // Step 5: Deseasonalizing
            let deseasonalized: Vec<f64> = series
                .iter()
                .zip(seasonal.iter())
                .map(|(y, s)| y - s)
                .collect();

            // Step 6: Trend smoothing
            *trend = loess(&deseasonalized, self.trend_smoothness, 1, weights);
        }
    }

    /// Smooth cycle-subseries (seasonal component estimation).
    ///
    /// Returns `n + 2 * period` values: each subseries is also evaluated one
    /// step before its first and after its last observation, so the low-pass
    /// moving averages have full windows at the series edges.
    fn smooth_cycle_subseries(&self, detrended: &[f64], weights: &[f64]) -> Vec<f64> {
        let n = detrended.len();
        let period = self.seasonal_period;
        let span = if self.periodic {
            10 * n + 1
        } else {
            self.seasonal_smoothness
        };
        let mut extended = vec![0.0; n + 2 * period];

        // Process each cycle-subseries (one for each position in the seasonal cycle)
        for cycle_pos in 0..period {
            let indices: Vec<usize> = (cycle_pos..n).step_by(period).collect();
            let values: Vec<f64> = indices.iter().map(|&i| detrended[i]).collect();
            // Periodic means drop hard outliers and weigh everything else equally
            let sub_weights: Vec<f64> = indices
                .iter()
                .map(|&i| match (self.periodic, weights[i]) {
                    (true, w) if w > 0.0 => 1.0,
                    (_, w) => w,
                })
                .collect();
            let k = values.len();

            let smoothed = loess(&values, span, 0, &sub_weights);
            let before = loess_at(&values, &sub_weights, span, 0, -1.0).unwrap_or(smoothed[0]);
            let after =
                loess_at(&values, &sub_weights, span, 0, k as f64).unwrap_or(smoothed[k - 1]);

            extended[cycle_pos] = before;
            for (m, &smooth_val) in smoothed.iter().enumerate() {
                extended[period + cycle_pos + m * period] = smooth_val;
            }
            extended[period + cycle_pos + k * period] = after;
        }

        extended
    }

    /// Low-pass filter: MA(period), MA(period), MA(3), then loess.
    ///
    /// Takes the `n + 2 * period` extended subseries and returns `n` values.
    fn low_pass_filter(&self, extended: &[f64]) -> Vec<f64> {
        let period = self.seasonal_period;

        let ma1 = moving_average(extended, period);
        let ma2 = moving_average(&ma1, period);
        let ma3 = moving_average(&ma2, 3);

        let weights = vec![1.0; ma3.len()];
        loess(&ma3, self.low_pass_smoothness, 1, &weights)
    }
}

impl Default for STL {
    fn default() -> Self {
        Self::new(12) // Monthly seasonality default
    }
}

fn remainder_of(series: &[f64], seasonal: &[f64], trend: &[f64]) -> Vec<f64> {
    series
        .iter()
        .zip(seasonal.iter())
        .zip(trend.iter())
        .map(|((y, s), t)| y - s - t)
        .collect()
}

/// Moving average over full windows only; the output is `window - 1` shorter.
fn moving_average(series: &[f64], window: usize) -> Vec<f64> {
    series
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Loess fit at every index of `values`.
///
/// Points whose neighbourhood carries no weight keep their own value.
fn loess(values: &[f64], span: usize, degree: usize, weights: &[f64]) -> Vec<f64> {
    (0..values.len())
        .map(|i| loess_at(values, weights, span, degree, i as f64).unwrap_or(values[i]))
        .collect()
}

/// Locally weighted regression of `values` against their index, evaluated at
/// position `x` (which may lie outside the data).
///
/// The fit uses the `span` nearest points: a centered window, shifted inward
/// at the series edges. `degree` 0 fits a weighted mean, 1 a weighted line.
/// Returns `None` when every point in the window has zero weight.
fn loess_at(values: &[f64], weights: &[f64], span: usize, degree: usize, x: f64) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }

    let q = span.clamp(1, n);
    // Spans wider than the series widen the kernel instead of the window
    let extension = span.saturating_sub(n) as f64 / 2.0;

    let center = x.round().clamp(0.0, (n - 1) as f64) as usize;
    let start = center.saturating_sub(q / 2).min(n - q);
    let end = start + q;
    let max_dist = (x - start as f64).abs().max((end - 1) as f64 - x);
    let bandwidth = max_dist + 1.0 + extension;

    let mut sum_w = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for j in start..end {
        let u = (x - j as f64).abs() / bandwidth;
        let w = (1.0 - u.powi(3)).powi(3) * weights[j];
        sum_w += w;
        sum_x += w * j as f64;
        sum_y += w * values[j];
    }

    if sum_w <= 0.0 {
        return None;
    }

    let mean_x = sum_x / sum_w;
    let mean_y = sum_y / sum_w;
    if degree == 0 {
        return Some(mean_y);
    }

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for j in start..end {
        let u = (x - j as f64).abs() / bandwidth;
        let w = (1.0 - u.powi(3)).powi(3) * weights[j];
        let dx = j as f64 - mean_x;
        sxx += w * dx * dx;
        sxy += w * dx * (values[j] - mean_y);
    }

    // Degenerate spread (e.g. a single weighted point) falls back to the mean
    if sxx <= 1e-10 * sum_w {
        Some(mean_y)
    } else {
        Some(mean_y + sxy / sxx * (x - mean_x))
    }
}

/// Bisquare weights of `residuals` against the scale `h`.
fn bisquare(residuals: &[f64], h: f64) -> Vec<f64> {
    residuals
        .iter()
        .map(|r| {
            if h.is_nan() || h < 1e-10 {
                return 1.0;
            }
            let u = r.abs() / h;
            if u < 1.0 {
                (1.0 - u * u).powi(2)
            } else {
                0.0
            }
        })
        .collect()
}

/// Robustness weights from the remainder, with `h = 6 * median(|remainder|)`.
fn bisquare_weights(residuals: &[f64]) -> Vec<f64> {
    let abs_residuals: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    bisquare(residuals, 6.0 * median(&abs_residuals))
}

/// Robustness weights for the first pass, from each point's deviation from
/// its running median, so isolated spikes start out excluded.
///
/// The mean keeps the scale positive when most points sit exactly on their
/// running median.
fn seed_weights(series: &[f64]) -> Vec<f64> {
    let level = running_median(series, SEED_WINDOW);
    let deviations: Vec<f64> = series.iter().zip(level.iter()).map(|(y, m)| y - m).collect();
    let abs_dev: Vec<f64> = deviations.iter().map(|d| d.abs()).collect();
    let scale = median(&abs_dev).max(mean(&abs_dev));
    bisquare(&deviations, 6.0 * scale)
}
