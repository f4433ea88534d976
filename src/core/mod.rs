//! Core data structures for grouped time series input.

mod series;
mod table;

pub use series::{date_to_timestamp, Series};
pub use table::{DetectionInput, GroupKey, GroupedSeries, InputTable};
