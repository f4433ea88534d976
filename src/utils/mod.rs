//! Utility functions shared by the decomposition and detection stages.

pub mod stats;

pub use stats::{mean, median, quantile, quantile_of_sorted, running_median, variance};
