//! Anomaly detection on the remainder component.
//!
//! This module provides:
//! - IQR bounds with an `alpha`-controlled multiplier
//! - Classification of remainders against those bounds, capped at a maximum
//!   anomaly fraction

mod bounds;
mod classify;

pub use bounds::{iqr_factor, RemainderBounds};
pub use classify::{anomaly_limit, classify, AnomalyDirection, AnomalyFlag, Classification};
