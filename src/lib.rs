//! # anofox-anomaly
//!
//! Group-wise time series anomaly detection.
//!
//! Each series is decomposed with robust STL into seasonal, trend and
//! remainder components. Remainders outside IQR fences are flagged as
//! anomalies, the flagged share is capped per group, and the bounds are
//! projected back onto the observed scale.

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod detection;
pub mod error;
pub mod frequency;
pub mod pipeline;
pub mod seasonality;
pub mod utils;

pub use error::{AnomalyError, Result};
pub use pipeline::{anomalize, anomalize_table};

pub mod prelude {
    pub use crate::core::{GroupKey, InputTable, Series};
    pub use crate::detection::{AnomalyDirection, AnomalyFlag};
    pub use crate::error::{AnomalyError, Result};
    pub use crate::frequency::{PeriodSpec, TimeUnit};
    pub use crate::pipeline::{
        anomalize, anomalize_table, AnomalyConfig, AnomalyReport, AnomalyRow, AnomalyTable,
        GroupDiagnostic, GroupSummary,
    };
}
