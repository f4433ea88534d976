//! Anomaly classification with a cap on the flagged fraction.

use super::bounds::RemainderBounds;
use crate::error::{AnomalyError, Result};
use std::fmt;

/// Categorical anomaly flag, rendered as `"Yes"` / `"No"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnomalyFlag {
    Yes,
    #[default]
    No,
}

impl AnomalyFlag {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, AnomalyFlag::Yes)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyFlag::Yes => "Yes",
            AnomalyFlag::No => "No",
        }
    }
}

impl From<bool> for AnomalyFlag {
    fn from(flag: bool) -> Self {
        if flag {
            AnomalyFlag::Yes
        } else {
            AnomalyFlag::No
        }
    }
}

impl fmt::Display for AnomalyFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the band an anomaly falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnomalyDirection {
    /// Remainder above the upper bound.
    Above,
    /// Remainder below the lower bound.
    Below,
    /// Not an anomaly.
    #[default]
    Within,
}

/// Outcome of classifying one group's remainder.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Final flag per observation, after capping.
    pub flags: Vec<AnomalyFlag>,
    /// Direction per observation, `Within` for non-anomalies.
    pub directions: Vec<AnomalyDirection>,
    /// Points outside the bounds before capping.
    pub raw_count: usize,
    /// Maximum number of anomalies allowed.
    pub limit: usize,
}

impl Classification {
    /// Number of anomalies after capping.
    pub fn anomaly_count(&self) -> usize {
        self.flags.iter().filter(|f| f.is_anomaly()).count()
    }

    /// Number of flagged points demoted by the cap.
    pub fn demoted(&self) -> usize {
        self.raw_count - self.anomaly_count()
    }
}

/// Maximum number of anomalies for `n` observations: `ceil(max_anomalies * n)`.
pub fn anomaly_limit(max_anomalies: f64, n: usize) -> usize {
    // Products such as 0.1 * 30 land a hair above the integer
    let raw = max_anomalies * n as f64;
    let rounded = raw.round();
    let limit = if (raw - rounded).abs() < 1e-9 {
        rounded
    } else {
        raw.ceil()
    };
    (limit.max(0.0) as usize).min(n)
}

/// Flag every remainder strictly outside `bounds`, then keep at most
/// `ceil(max_anomalies * n)` of them.
///
/// When the cap applies, flagged points are ranked by distance from the
/// nearest bound; equally distant points keep the earlier position.
pub fn classify(
    remainder: &[f64],
    bounds: &RemainderBounds,
    max_anomalies: f64,
) -> Result<Classification> {
    if !(max_anomalies > 0.0 && max_anomalies <= 1.0) {
        return Err(AnomalyError::InvalidParameter(format!(
            "max_anomalies must be in (0, 1], got {}",
            max_anomalies
        )));
    }

    let n = remainder.len();
    let limit = anomaly_limit(max_anomalies, n);

    let mut flagged: Vec<(usize, f64)> = remainder
        .iter()
        .enumerate()
        .filter(|(_, &r)| bounds.is_outside(r))
        .map(|(i, &r)| (i, bounds.distance_outside(r)))
        .collect();
    let raw_count = flagged.len();

    if raw_count > limit {
        // Stable sort keeps chronological order among ties
        flagged.sort_by(|a, b| b.1.total_cmp(&a.1));
        flagged.truncate(limit);
    }

    let mut flags = vec![AnomalyFlag::No; n];
    let mut directions = vec![AnomalyDirection::Within; n];
    for &(i, _) in &flagged {
        flags[i] = AnomalyFlag::Yes;
        directions[i] = if remainder[i] > bounds.upper {
            AnomalyDirection::Above
        } else {
            AnomalyDirection::Below
        };
    }

    Ok(Classification {
        flags,
        directions,
        raw_count,
        limit,
    })
}
