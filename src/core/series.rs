//! Series data structure for one group's observations.

use crate::error::{AnomalyError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

/// A univariate time series with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl Series {
    /// Create a new series, validating the input contract.
    ///
    /// Timestamps must be strictly increasing (which also rules out
    /// duplicates), both columns must have the same length, and every value
    /// must be finite.
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        if timestamps.len() != values.len() {
            return Err(AnomalyError::MalformedInput(format!(
                "timestamp column has {} rows but value column has {}",
                timestamps.len(),
                values.len()
            )));
        }

        for i in 1..timestamps.len() {
            if timestamps[i] <= timestamps[i - 1] {
                let reason = if timestamps[i] == timestamps[i - 1] {
                    "duplicate timestamp"
                } else {
                    "timestamps must be strictly increasing"
                };
                return Err(AnomalyError::MalformedInput(format!(
                    "{} at row {} ({})",
                    reason, i, timestamps[i]
                )));
            }
        }

        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(AnomalyError::MalformedInput(format!(
                "non-numeric value at row {}",
                idx
            )));
        }

        Ok(Self { timestamps, values })
    }

    /// Create a series from calendar dates, placed at midnight UTC.
    pub fn from_dates(dates: &[NaiveDate], values: Vec<f64>) -> Result<Self> {
        Self::new(dates.iter().map(|d| date_to_timestamp(*d)).collect(), values)
    }

    /// Get the number of observations.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Check if the series is empty.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Infer the sampling interval as the modal spacing between timestamps.
    ///
    /// `tolerance` is the minimum share of spacings that must agree with the
    /// mode. Ties between equally common spacings resolve to the shorter one.
    pub fn infer_interval(&self, tolerance: f64) -> Result<Duration> {
        if self.len() < 2 {
            return Err(AnomalyError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }

        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for w in self.timestamps.windows(2) {
            *counts.entry((w[1] - w[0]).num_milliseconds()).or_insert(0) += 1;
        }

        // First maximum in ascending spacing order
        let (modal_diff, modal_count) = counts
            .iter()
            .fold(None, |best: Option<(i64, usize)>, (&diff, &count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((diff, count)),
            })
            .ok_or(AnomalyError::FrequencyInference(
                "empty spacing data".to_string(),
            ))?;

        if modal_diff <= 0 {
            return Err(AnomalyError::FrequencyInference(
                "timestamps are closer than one millisecond apart".to_string(),
            ));
        }

        let total_count: usize = counts.values().sum();
        let modal_ratio = modal_count as f64 / total_count as f64;
        if modal_ratio < tolerance {
            return Err(AnomalyError::FrequencyInference(
                "no unique modal spacing found".to_string(),
            ));
        }

        Ok(Duration::milliseconds(modal_diff))
    }
}

/// Convert a calendar date to a timestamp at midnight UTC.
pub fn date_to_timestamp(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
