//! Period specifications: `auto`, a duration such as `"6 weeks"`, or a count.

use crate::error::{AnomalyError, Result};
use chrono::Duration;
use std::fmt;
use std::str::FromStr;

const SECONDS_PER_DAY: f64 = 86_400.0;
const DAYS_PER_YEAR: f64 = 365.25;

/// Calendar unit of a duration specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    /// Length of one unit in seconds. Months, quarters and years use the
    /// average Gregorian year.
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Second => 1.0,
            TimeUnit::Minute => 60.0,
            TimeUnit::Hour => 3_600.0,
            TimeUnit::Day => SECONDS_PER_DAY,
            TimeUnit::Week => 7.0 * SECONDS_PER_DAY,
            TimeUnit::Month => DAYS_PER_YEAR / 12.0 * SECONDS_PER_DAY,
            TimeUnit::Quarter => DAYS_PER_YEAR / 4.0 * SECONDS_PER_DAY,
            TimeUnit::Year => DAYS_PER_YEAR * SECONDS_PER_DAY,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Quarter => "quarter",
            TimeUnit::Year => "year",
        }
    }
}

impl FromStr for TimeUnit {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => TimeUnit::Second,
            "min" | "mins" | "minute" | "minutes" => TimeUnit::Minute,
            "h" | "hr" | "hrs" | "hour" | "hours" => TimeUnit::Hour,
            "d" | "day" | "days" => TimeUnit::Day,
            "w" | "wk" | "wks" | "week" | "weeks" => TimeUnit::Week,
            "mo" | "mon" | "month" | "months" => TimeUnit::Month,
            "q" | "qtr" | "quarter" | "quarters" => TimeUnit::Quarter,
            "y" | "yr" | "yrs" | "year" | "years" => TimeUnit::Year,
            other => {
                return Err(AnomalyError::InvalidPeriodSpec(format!(
                    "unknown time unit '{}'",
                    other
                )))
            }
        };
        Ok(unit)
    }
}

/// A frequency or trend request, parsed once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PeriodSpec {
    /// Pick a default from the series' time scale.
    #[default]
    Auto,
    /// A calendar span converted to observations via the sampling interval.
    Duration { magnitude: f64, unit: TimeUnit },
    /// An explicit number of observations.
    Count(usize),
}

/// Upper bound for resolved counts; far beyond any series length.
const MAX_COUNT: f64 = u32::MAX as f64;

impl PeriodSpec {
    pub fn duration(magnitude: f64, unit: TimeUnit) -> Self {
        PeriodSpec::Duration { magnitude, unit }
    }

    /// Convert to a number of observations given the sampling interval.
    ///
    /// Durations round to the nearest integer and never resolve below 2.
    /// Returns `None` for [`PeriodSpec::Auto`], which needs the time-scale
    /// template.
    pub fn to_count(&self, interval: Duration) -> Option<usize> {
        match *self {
            PeriodSpec::Auto => None,
            PeriodSpec::Count(n) => Some(n),
            PeriodSpec::Duration { magnitude, unit } => {
                let interval_secs = interval.num_milliseconds().max(1) as f64 / 1000.0;
                let count = (magnitude * unit.seconds() / interval_secs)
                    .round()
                    .min(MAX_COUNT);
                Some((count as usize).max(2))
            }
        }
    }

    pub fn is_explicit_count(&self) -> bool {
        matches!(self, PeriodSpec::Count(_))
    }
}

impl From<usize> for PeriodSpec {
    fn from(n: usize) -> Self {
        PeriodSpec::Count(n)
    }
}

impl FromStr for PeriodSpec {
    type Err = AnomalyError;

    /// Parse `"auto"`, an integer count (`"52"`), or a duration
    /// (`"6 weeks"`, `"1 year"`, `"week"`, `"12h"`).
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if text.is_empty() {
            return Err(AnomalyError::InvalidPeriodSpec(
                "empty period specification".to_string(),
            ));
        }
        if text.eq_ignore_ascii_case("auto") {
            return Ok(PeriodSpec::Auto);
        }
        if let Ok(n) = text.parse::<i64>() {
            if n < 1 {
                return Err(AnomalyError::InvalidPeriodSpec(format!(
                    "count must be positive, got {}",
                    n
                )));
            }
            return Ok(PeriodSpec::Count(n as usize));
        }

        // Split leading number from the unit, with or without whitespace
        let split = text
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);
        let magnitude = if number.is_empty() {
            1.0
        } else {
            number.parse::<f64>().map_err(|_| {
                AnomalyError::InvalidPeriodSpec(format!("invalid magnitude in '{}'", text))
            })?
        };
        if !(magnitude.is_finite() && magnitude > 0.0) {
            return Err(AnomalyError::InvalidPeriodSpec(format!(
                "duration must be positive in '{}'",
                text
            )));
        }

        Ok(PeriodSpec::Duration {
            magnitude,
            unit: unit.parse()?,
        })
    }
}

impl fmt::Display for PeriodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodSpec::Auto => write!(f, "auto"),
            PeriodSpec::Count(n) => write!(f, "{} observations", n),
            PeriodSpec::Duration { magnitude, unit } => {
                let plural = if (*magnitude - 1.0).abs() < f64::EPSILON { "" } else { "s" };
                write!(f, "{} {}{}", magnitude, unit.name(), plural)
            }
        }
    }
}
