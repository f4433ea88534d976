//! Configuration for anomaly detection runs.

use crate::error::{AnomalyError, Result};
use crate::frequency::PeriodSpec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Options recognized by [`anomalize`](super::anomalize).
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    /// Seasonal cycle length.
    pub frequency: PeriodSpec,
    /// Trend smoothing window.
    pub trend: PeriodSpec,
    /// Significance level in (0, 1); the IQR factor is `0.15 / alpha`.
    pub alpha: f64,
    /// Maximum fraction of a group's points that may be flagged, in (0, 1].
    pub max_anomalies: f64,
    /// Emit resolved-parameter diagnostics at `info` instead of `debug`.
    pub verbose: bool,
    /// Use robustness iterations in the decomposition.
    pub robust: bool,
    /// Process groups on the rayon thread pool.
    pub parallel: bool,
    cancel: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            frequency: PeriodSpec::Auto,
            trend: PeriodSpec::Auto,
            alpha: 0.05,
            max_anomalies: 0.2,
            verbose: false,
            robust: true,
            parallel: true,
            cancel: None,
            deadline: None,
        }
    }
}

impl AnomalyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frequency(mut self, frequency: impl Into<PeriodSpec>) -> Self {
        self.frequency = frequency.into();
        self
    }

    pub fn with_trend(mut self, trend: impl Into<PeriodSpec>) -> Self {
        self.trend = trend.into();
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_anomalies(mut self, max_anomalies: f64) -> Self {
        self.max_anomalies = max_anomalies;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn robust(mut self, robust: bool) -> Self {
        self.robust = robust;
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Stop starting new groups once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Stop starting new groups after `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Check parameter ranges. Called once before any group is processed.
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(AnomalyError::InvalidParameter(format!(
                "alpha must be in (0, 1), got {}",
                self.alpha
            )));
        }
        if !(self.max_anomalies > 0.0 && self.max_anomalies <= 1.0) {
            return Err(AnomalyError::InvalidParameter(format!(
                "max_anomalies must be in (0, 1], got {}",
                self.max_anomalies
            )));
        }
        for (name, spec) in [("frequency", &self.frequency), ("trend", &self.trend)] {
            if matches!(spec, PeriodSpec::Count(0)) {
                return Err(AnomalyError::InvalidPeriodSpec(format!(
                    "{} count must be positive",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Whether the caller cancelled the run or its deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::TimeUnit;

    #[test]
    fn default_config() {
        let config = AnomalyConfig::default();
        assert_eq!(config.frequency, PeriodSpec::Auto);
        assert_eq!(config.trend, PeriodSpec::Auto);
        assert!((config.alpha - 0.05).abs() < 1e-12);
        assert!((config.max_anomalies - 0.2).abs() < 1e-12);
        assert!(!config.verbose);
        assert!(config.robust);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let config = AnomalyConfig::new()
            .with_frequency(52)
            .with_trend(PeriodSpec::duration(1.0, TimeUnit::Year))
            .with_alpha(0.1)
            .with_max_anomalies(0.5)
            .verbose(true)
            .parallel(false);

        assert_eq!(config.frequency, PeriodSpec::Count(52));
        assert_eq!(config.trend, PeriodSpec::duration(1.0, TimeUnit::Year));
        assert!((config.alpha - 0.1).abs() < 1e-12);
        assert!(config.verbose);
        assert!(!config.parallel);
    }

    #[test]
    fn validate_rejects_out_of_range_parameters() {
        assert!(AnomalyConfig::new().with_alpha(0.0).validate().is_err());
        assert!(AnomalyConfig::new().with_alpha(1.0).validate().is_err());
        assert!(AnomalyConfig::new().with_max_anomalies(0.0).validate().is_err());
        assert!(AnomalyConfig::new().with_max_anomalies(1.01).validate().is_err());
        assert!(AnomalyConfig::new().with_max_anomalies(1.0).validate().is_ok());
        assert!(matches!(
            AnomalyConfig::new().with_frequency(0).validate(),
            Err(AnomalyError::InvalidPeriodSpec(_))
        ));
    }

    #[test]
    fn cancellation_flag_and_deadline() {
        let flag = Arc::new(AtomicBool::new(false));
        let config = AnomalyConfig::new().with_cancellation(Arc::clone(&flag));
        assert!(!config.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(config.is_cancelled());

        let expired = AnomalyConfig::new().with_deadline(Instant::now());
        assert!(expired.is_cancelled());
    }
}
