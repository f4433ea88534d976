//! Seasonal-trend decomposition.
//!
//! This module provides STL (Seasonal-Trend decomposition using LOESS), the
//! decomposer that separates each series into seasonal, trend and remainder
//! before anomaly bounds are computed on the remainder.

mod stl;

pub use stl::{STLResult, STL};
