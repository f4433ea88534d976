//! Resolution of period specifications into observation counts.

use super::spec::{PeriodSpec, TimeUnit};
use crate::error::{AnomalyError, Result};
use chrono::Duration;
use std::fmt;

/// Time-scale classification of a series' sampling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeScale {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeScale {
    /// Classify a sampling interval.
    pub fn from_interval(interval: Duration) -> Self {
        let secs = interval.num_milliseconds() as f64 / 1000.0;
        if secs < TimeUnit::Minute.seconds() {
            TimeScale::Second
        } else if secs < TimeUnit::Hour.seconds() {
            TimeScale::Minute
        } else if secs < TimeUnit::Day.seconds() {
            TimeScale::Hour
        } else if secs < TimeUnit::Week.seconds() {
            TimeScale::Day
        } else if secs < 28.0 * TimeUnit::Day.seconds() {
            TimeScale::Week
        } else if secs < 89.0 * TimeUnit::Day.seconds() {
            TimeScale::Month
        } else if secs < 365.0 * TimeUnit::Day.seconds() {
            TimeScale::Quarter
        } else {
            TimeScale::Year
        }
    }

    /// Default `(frequency, trend)` spans for this time scale.
    pub fn template(&self) -> (PeriodSpec, PeriodSpec) {
        use TimeUnit::*;
        let (freq, trend) = match self {
            TimeScale::Second => ((1.0, Hour), (12.0, Hour)),
            TimeScale::Minute => ((1.0, Day), (14.0, Day)),
            TimeScale::Hour => ((1.0, Day), (1.0, Month)),
            TimeScale::Day => ((1.0, Week), (3.0, Month)),
            TimeScale::Week => ((1.0, Quarter), (1.0, Year)),
            TimeScale::Month => ((1.0, Year), (5.0, Year)),
            TimeScale::Quarter => ((1.0, Year), (10.0, Year)),
            TimeScale::Year => ((5.0, Year), (30.0, Year)),
        };
        (
            PeriodSpec::duration(freq.0, freq.1),
            PeriodSpec::duration(trend.0, trend.1),
        )
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeScale::Second => "second",
            TimeScale::Minute => "minute",
            TimeScale::Hour => "hour",
            TimeScale::Day => "day",
            TimeScale::Week => "week",
            TimeScale::Month => "month",
            TimeScale::Quarter => "quarter",
            TimeScale::Year => "year",
        };
        write!(f, "{}", name)
    }
}

/// Resolve a frequency request to observations per seasonal cycle.
///
/// Fails with `InvalidPeriodSpec` when the cycle does not fit at least twice
/// into `len` observations.
pub fn resolve_frequency(spec: &PeriodSpec, interval: Duration, len: usize) -> Result<usize> {
    let scale = TimeScale::from_interval(interval);
    let count = match spec.to_count(interval) {
        Some(count) => count,
        None => scale.template().0.to_count(interval).unwrap_or(1),
    };

    if count == 0 {
        return Err(AnomalyError::InvalidPeriodSpec(
            "frequency must be at least 1".to_string(),
        ));
    }
    if count > len / 2 {
        return Err(AnomalyError::InvalidPeriodSpec(format!(
            "frequency {} ({}) exceeds half the series length {}",
            count, spec, len
        )));
    }
    Ok(count)
}

/// Resolve a trend request to a loess window length.
///
/// The window is clamped to the series length and made odd so it can be
/// centered.
pub fn resolve_trend(spec: &PeriodSpec, interval: Duration, len: usize) -> Result<usize> {
    let scale = TimeScale::from_interval(interval);
    let count = match spec.to_count(interval) {
        Some(count) => count,
        None => scale.template().1.to_count(interval).unwrap_or(len),
    };
    if count == 0 {
        return Err(AnomalyError::InvalidPeriodSpec(
            "trend window must be at least 1".to_string(),
        ));
    }

    let mut window = count.min(len).max(3.min(len));
    if window.is_multiple_of(2) {
        window = if window < len { window + 1 } else { window - 1 };
    }
    Ok(window.max(1))
}
