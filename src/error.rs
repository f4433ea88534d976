//! Error types for the anofox-anomaly library.

use crate::pipeline::GroupDiagnostic;
use thiserror::Error;

/// Result type alias for anomaly detection operations.
pub type Result<T> = std::result::Result<T, AnomalyError>;

/// Errors that can occur during anomaly detection.
///
/// `MalformedInput` and `InvalidParameter` abort a call before any group is
/// processed. The remaining variants are raised per group and surface as
/// [`GroupDiagnostic`]s next to the partial result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnomalyError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the requested decomposition.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Frequency or trend specification could not be resolved.
    #[error("invalid period specification: {0}")]
    InvalidPeriodSpec(String),

    /// Input table violates the input contract.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Sampling interval inference failed.
    #[error("could not infer sampling interval: {0}")]
    FrequencyInference(String),

    /// Group was skipped because the call was cancelled or ran past its deadline.
    #[error("cancelled before processing started")]
    Cancelled,

    /// No group produced a result.
    #[error("all {} groups failed", .0.len())]
    AllGroupsFailed(Vec<GroupDiagnostic>),
}

impl AnomalyError {
    /// Whether this error only affects the group that raised it.
    pub fn is_group_local(&self) -> bool {
        matches!(
            self,
            AnomalyError::InsufficientData { .. }
                | AnomalyError::InvalidPeriodSpec(_)
                | AnomalyError::FrequencyInference(_)
                | AnomalyError::Cancelled
        )
    }
}
