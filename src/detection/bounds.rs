//! IQR-based bounds on the remainder component.
//!
//! Tukey-style fences with a tunable multiplier: `factor = 0.15 / alpha`.
//! Smaller `alpha` widens the band and makes anomalies rarer.

use crate::error::{AnomalyError, Result};
use crate::utils::{median, quantile_of_sorted};

/// Numerator of the IQR factor.
const IQR_FACTOR_SCALE: f64 = 0.15;

/// IQR multiplier for a significance level.
pub fn iqr_factor(alpha: f64) -> f64 {
    IQR_FACTOR_SCALE / alpha
}

/// Acceptable range for the remainder of one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemainderBounds {
    /// Median of the remainder.
    pub center: f64,
    /// First quartile.
    pub q1: f64,
    /// Third quartile.
    pub q3: f64,
    /// Interquartile range `q3 - q1`.
    pub iqr: f64,
    /// IQR multiplier derived from `alpha`.
    pub factor: f64,
    /// `q1 - factor * iqr`.
    pub lower: f64,
    /// `q3 + factor * iqr`.
    pub upper: f64,
}

impl RemainderBounds {
    /// Compute bounds from a remainder series.
    ///
    /// With a zero IQR both bounds collapse onto the center, so any remainder
    /// that differs from it is outside.
    pub fn from_remainder(remainder: &[f64], alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(AnomalyError::InvalidParameter(format!(
                "alpha must be in (0, 1), got {}",
                alpha
            )));
        }
        if remainder.is_empty() {
            return Err(AnomalyError::EmptyData);
        }

        let mut sorted = remainder.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let center = median(&sorted);
        let q1 = quantile_of_sorted(&sorted, 0.25);
        let q3 = quantile_of_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        let factor = iqr_factor(alpha);

        let (lower, upper) = if iqr > 0.0 {
            (q1 - factor * iqr, q3 + factor * iqr)
        } else {
            (center, center)
        };

        Ok(Self {
            center,
            q1,
            q3,
            iqr,
            factor,
            lower,
            upper,
        })
    }

    /// Whether `value` lies strictly outside `[lower, upper]`.
    pub fn is_outside(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }

    /// Distance from the nearest bound for values outside the band, 0 inside.
    pub fn distance_outside(&self, value: f64) -> f64 {
        if value < self.lower {
            self.lower - value
        } else if value > self.upper {
            value - self.upper
        } else {
            0.0
        }
    }

    /// Width of the acceptable band.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Translate the bounds back to observed scale by adding trend and
    /// seasonal at every timestamp. Returns `(lower, upper)`.
    pub fn recompose(&self, trend: &[f64], seasonal: &[f64]) -> (Vec<f64>, Vec<f64>) {
        trend
            .iter()
            .zip(seasonal.iter())
            .map(|(t, s)| {
                let base = t + s;
                (base + self.lower, base + self.upper)
            })
            .unzip()
    }
}
