//! Group orchestration: partition the input, run every group through
//! decomposition and detection, and assemble the augmented table.
//!
//! Groups are independent. A group that cannot be processed is excluded from
//! the table and reported as a [`GroupDiagnostic`]; the call only fails as a
//! whole when the configuration or input is invalid, or when no group
//! succeeds.
//!
//! # Example
//!
//! ```
//! use anofox_anomaly::prelude::*;
//! use chrono::NaiveDate;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let dates: Vec<NaiveDate> = (0..56).map(|i| start + chrono::Days::new(i)).collect();
//! let mut values: Vec<f64> = (0..56)
//!     .map(|i| 10.0 + [0.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0][i % 7] + 0.1 * ((i * 7) % 5) as f64)
//!     .collect();
//! values[30] = 40.0;
//!
//! let table = InputTable::from_dates(&dates, values);
//! let report = anomalize_table(table, &AnomalyConfig::default()).unwrap();
//!
//! assert_eq!(report.table.len(), 56);
//! assert!(report.table.rows()[30].is_anomaly.is_anomaly());
//! ```

mod config;
mod group;
mod output;

pub use config::AnomalyConfig;
pub use group::{process_group, GroupDiagnostic, GroupResult, GroupStage, GroupSummary};
pub use output::{AnomalyRow, AnomalyTable, OUTPUT_COLUMNS};

use crate::core::{DetectionInput, GroupedSeries, InputTable};
use crate::error::{AnomalyError, Result};
use rayon::prelude::*;
use tracing::{debug, error, info, warn};

/// Output of one detection call.
#[derive(Debug, Clone)]
pub struct AnomalyReport {
    /// Augmented rows of every successful group.
    pub table: AnomalyTable,
    /// One summary per successful group, in table order.
    pub summaries: Vec<GroupSummary>,
    /// Groups that were excluded, in input order.
    pub diagnostics: Vec<GroupDiagnostic>,
}

impl AnomalyReport {
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Total number of anomalies across all groups.
    pub fn anomaly_count(&self) -> usize {
        self.summaries.iter().map(|s| s.anomalies).sum()
    }
}

/// Decompose every group and flag anomalies in its remainder.
///
/// The configuration is validated before any group runs. Output rows keep
/// the input's group order and each group's chronological order, whether or
/// not groups run in parallel.
pub fn anomalize(
    input: impl Into<DetectionInput>,
    config: &AnomalyConfig,
) -> Result<AnomalyReport> {
    config.validate()?;

    let input = input.into();
    let total_rows = input.row_count();
    let (group_columns, groups) = input.into_groups();
    if groups.is_empty() {
        return Err(AnomalyError::EmptyData);
    }
    debug!(rows = total_rows, groups = groups.len(), "input partitioned");

    let run = |group: &GroupedSeries| {
        if config.is_cancelled() {
            return Err(group::cancelled(&group.key));
        }
        process_group(&group.key, &group.series, config)
    };

    let outcomes: Vec<_> = if config.parallel && groups.len() > 1 {
        groups.par_iter().map(run).collect()
    } else {
        groups.iter().map(run).collect()
    };

    let mut rows = Vec::new();
    let mut summaries = Vec::new();
    let mut diagnostics = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(result) => {
                rows.extend(result.rows);
                summaries.push(result.summary);
            }
            Err(diagnostic) if diagnostic.error.is_group_local() => {
                warn!(
                    group = %diagnostic.group_key,
                    stage = %diagnostic.stage,
                    error = %diagnostic.error,
                    "group excluded"
                );
                diagnostics.push(diagnostic);
            }
            Err(diagnostic) => {
                error!(
                    group = %diagnostic.group_key,
                    stage = %diagnostic.stage,
                    error = %diagnostic.error,
                    "group excluded by an unexpected error"
                );
                diagnostics.push(diagnostic);
            }
        }
    }

    if summaries.is_empty() {
        return Err(AnomalyError::AllGroupsFailed(diagnostics));
    }

    let report = AnomalyReport {
        table: AnomalyTable::new(group_columns, rows),
        summaries,
        diagnostics,
    };
    let message = format!(
        "{} anomalies in {} rows across {} groups ({} excluded)",
        report.anomaly_count(),
        report.table.len(),
        report.summaries.len(),
        report.diagnostics.len()
    );
    if config.verbose {
        info!("{}", message);
    } else {
        debug!("{}", message);
    }

    Ok(report)
}

/// Resolve a column-oriented table into groups, then [`anomalize`] it.
pub fn anomalize_table(table: InputTable, config: &AnomalyConfig) -> Result<AnomalyReport> {
    config.validate()?;
    anomalize(table.into_input()?, config)
}
