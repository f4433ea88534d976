//! Per-group detection: resolve parameters, decompose, bound, classify.

use super::config::AnomalyConfig;
use super::output::AnomalyRow;
use crate::core::{GroupKey, Series};
use crate::detection::{classify, AnomalyFlag, RemainderBounds};
use crate::error::{AnomalyError, Result};
use crate::frequency::{resolve_frequency, resolve_trend, PeriodSpec, TimeScale};
use crate::seasonality::{STLResult, STL};
use chrono::Duration;
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Minimum share of spacings that must agree on the sampling interval.
const INTERVAL_TOLERANCE: f64 = 0.3;

/// Progress of one group through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupStage {
    Pending,
    ResolvingParameters,
    Decomposing,
    Bounding,
    Classifying,
    Done,
    Failed,
}

impl fmt::Display for GroupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GroupStage::Pending => "pending",
            GroupStage::ResolvingParameters => "resolving parameters",
            GroupStage::Decomposing => "decomposing",
            GroupStage::Bounding => "bounding",
            GroupStage::Classifying => "classifying",
            GroupStage::Done => "done",
            GroupStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a group was excluded from the output.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDiagnostic {
    pub group_key: GroupKey,
    /// Stage that was running when the group failed.
    pub stage: GroupStage,
    pub error: AnomalyError,
}

impl fmt::Display for GroupDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group {} failed while {}: {}",
            self.group_key, self.stage, self.error
        )
    }
}

/// Parameters and statistics of one processed group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub group_key: GroupKey,
    pub observations: usize,
    /// Inferred sampling interval; `None` when only explicit counts were used
    /// and the timestamps were irregular.
    pub interval: Option<Duration>,
    pub time_scale: Option<TimeScale>,
    /// Observations per seasonal cycle; 1 means trend-only.
    pub frequency: usize,
    /// Trend loess window in observations.
    pub trend: usize,
    /// The requested frequency did not fit and the group was decomposed
    /// without a seasonal component.
    pub trend_only_fallback: bool,
    pub bounds: RemainderBounds,
    /// Points outside the bounds before the cap.
    pub raw_anomalies: usize,
    /// Points flagged after the cap.
    pub anomalies: usize,
    pub seasonal_strength: f64,
    pub trend_strength: f64,
}

/// Rows and summary of a successfully processed group.
#[derive(Debug, Clone)]
pub struct GroupResult {
    pub summary: GroupSummary,
    pub rows: Vec<AnomalyRow>,
}

#[derive(Debug, Clone, Copy)]
struct ResolvedPeriods {
    interval: Option<Duration>,
    frequency: usize,
    trend: usize,
    fallback: bool,
}

/// Stage tracker for one group.
struct GroupRun<'a> {
    key: &'a GroupKey,
    stage: GroupStage,
}

impl<'a> GroupRun<'a> {
    fn new(key: &'a GroupKey) -> Self {
        Self {
            key,
            stage: GroupStage::Pending,
        }
    }

    fn advance(&mut self, stage: GroupStage) {
        trace!(from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
    }

    /// Move to `Failed`, reporting the stage that raised `error`.
    fn fail(&mut self, error: AnomalyError) -> GroupDiagnostic {
        let stage = self.stage;
        self.advance(GroupStage::Failed);
        GroupDiagnostic {
            group_key: self.key.clone(),
            stage,
            error,
        }
    }
}

/// Diagnostic for a group that was never started.
pub(crate) fn cancelled(key: &GroupKey) -> GroupDiagnostic {
    GroupDiagnostic {
        group_key: key.clone(),
        stage: GroupStage::Pending,
        error: AnomalyError::Cancelled,
    }
}

/// Run the full detection pipeline on one group.
pub fn process_group(
    key: &GroupKey,
    series: &Series,
    config: &AnomalyConfig,
) -> std::result::Result<GroupResult, GroupDiagnostic> {
    let span = tracing::debug_span!("group", key = %key, rows = series.len());
    let _enter = span.enter();

    let mut run = GroupRun::new(key);

    run.advance(GroupStage::ResolvingParameters);
    let periods = resolve_periods(series, config).map_err(|e| run.fail(e))?;
    report(
        config.verbose,
        format_args!("frequency = {}", describe(periods.frequency, &config.frequency)),
    );
    report(
        config.verbose,
        format_args!("trend = {}", describe(periods.trend, &config.trend)),
    );

    run.advance(GroupStage::Decomposing);
    let decomposition = decompose(series.values(), &periods, config).map_err(|e| run.fail(e))?;

    run.advance(GroupStage::Bounding);
    let bounds = RemainderBounds::from_remainder(&decomposition.remainder, config.alpha)
        .map_err(|e| run.fail(e))?;
    let (lower, upper) = bounds.recompose(&decomposition.trend, &decomposition.seasonal);

    run.advance(GroupStage::Classifying);
    let classification = classify(&decomposition.remainder, &bounds, config.max_anomalies)
        .map_err(|e| run.fail(e))?;
    if classification.demoted() > 0 {
        debug!(
            flagged = classification.raw_count,
            limit = classification.limit,
            "anomaly cap demoted {} points",
            classification.demoted()
        );
    }

    let rows: Vec<AnomalyRow> = (0..series.len())
        .map(|i| {
            let observed = series.values()[i];
            let flag = classification.flags[i];
            let observed_cleaned = if flag == AnomalyFlag::Yes {
                observed.clamp(lower[i], upper[i])
            } else {
                observed
            };
            AnomalyRow {
                group_key: key.clone(),
                timestamp: series.timestamps()[i],
                observed,
                seasonal: decomposition.seasonal[i],
                trend: decomposition.trend[i],
                remainder: decomposition.remainder[i],
                remainder_lower_bound: bounds.lower,
                remainder_upper_bound: bounds.upper,
                recomposed_lower_bound: lower[i],
                recomposed_upper_bound: upper[i],
                is_anomaly: flag,
                anomaly_direction: classification.directions[i],
                anomaly_score: (decomposition.remainder[i] - bounds.center).abs(),
                observed_cleaned,
            }
        })
        .collect();

    let summary = GroupSummary {
        group_key: key.clone(),
        observations: series.len(),
        interval: periods.interval,
        time_scale: periods.interval.map(TimeScale::from_interval),
        frequency: periods.frequency,
        trend: periods.trend,
        trend_only_fallback: periods.fallback,
        bounds,
        raw_anomalies: classification.raw_count,
        anomalies: classification.anomaly_count(),
        seasonal_strength: decomposition.seasonal_strength(),
        trend_strength: decomposition.trend_strength(),
    };

    run.advance(GroupStage::Done);
    debug!(anomalies = summary.anomalies, "group complete");

    Ok(GroupResult { summary, rows })
}

fn resolve_periods(series: &Series, config: &AnomalyConfig) -> Result<ResolvedPeriods> {
    let n = series.len();
    let counts_only = config.frequency.is_explicit_count() && config.trend.is_explicit_count();

    let interval = match series.infer_interval(INTERVAL_TOLERANCE) {
        Ok(interval) => Some(interval),
        Err(err) if counts_only => {
            debug!(error = %err, "no regular interval, using explicit counts");
            None
        }
        Err(err) => return Err(err),
    };
    // Counts resolve without looking at the interval
    let basis = interval.unwrap_or_else(|| Duration::seconds(1));

    let (frequency, fallback) = match resolve_frequency(&config.frequency, basis, n) {
        Ok(frequency) => (frequency, false),
        Err(AnomalyError::InvalidPeriodSpec(_)) if config.frequency.is_explicit_count() => {
            let count = config.frequency.to_count(basis).unwrap_or(0);
            return Err(AnomalyError::InsufficientData {
                needed: count.saturating_mul(2),
                got: n,
            });
        }
        Err(AnomalyError::InvalidPeriodSpec(reason)) => {
            warn!(%reason, "seasonal cycle does not fit, decomposing trend only");
            (1, true)
        }
        Err(err) => return Err(err),
    };
    let trend = resolve_trend(&config.trend, basis, n)?;

    Ok(ResolvedPeriods {
        interval,
        frequency,
        trend,
        fallback,
    })
}

fn decompose(
    values: &[f64],
    periods: &ResolvedPeriods,
    config: &AnomalyConfig,
) -> Result<STLResult> {
    let mut stl = STL::new(periods.frequency)
        .periodic()
        .with_trend_smoothness(periods.trend);
    if config.robust {
        stl = stl.robust();
    }
    stl.decompose(values)
}

fn describe(count: usize, spec: &PeriodSpec) -> String {
    match spec {
        PeriodSpec::Duration { .. } => format!("{} observations per {}", count, spec),
        _ => format!("{} observations", count),
    }
}

fn report(verbose: bool, message: fmt::Arguments<'_>) {
    if verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }
}
