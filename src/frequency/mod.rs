//! Frequency and trend window resolution.
//!
//! Turns user-facing period requests (`auto`, `"6 weeks"`, `52`) into integer
//! window lengths based on the sampling interval of each series:
//! - [`PeriodSpec`]: the parsed request
//! - [`TimeScale`]: interval classification and its default template
//! - [`resolve_frequency`] / [`resolve_trend`]: conversion to observation counts

mod resolver;
mod spec;

pub use resolver::{resolve_frequency, resolve_trend, TimeScale};
pub use spec::{PeriodSpec, TimeUnit};
