//! Input table and its resolution into per-group series.

use super::series::{date_to_timestamp, Series};
use crate::error::{AnomalyError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::fmt;

/// Identifier of one independent series within an input table.
///
/// Holds one value per grouping column, e.g. `["US", "Widget"]` for
/// `group_by = ["region", "product"]`. The empty key is the implicit group of
/// an ungrouped input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// The key of an ungrouped input.
    pub fn implicit() -> Self {
        Self(Vec::new())
    }

    pub fn is_implicit(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "<all>")
        } else {
            write!(f, "{}", self.0.join(" / "))
        }
    }
}

impl From<&str> for GroupKey {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

/// A series associated with its group key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSeries {
    pub key: GroupKey,
    pub series: Series,
}

/// Detection input, resolved once from the caller's table.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionInput {
    /// A single series without grouping columns.
    Ungrouped(Series),
    /// Independent series keyed by the values of the grouping columns.
    Grouped {
        columns: Vec<String>,
        groups: Vec<GroupedSeries>,
    },
}

impl DetectionInput {
    /// View the input in grouped form; an ungrouped series becomes one
    /// implicit group.
    pub fn into_groups(self) -> (Vec<String>, Vec<GroupedSeries>) {
        match self {
            DetectionInput::Ungrouped(series) => (
                Vec::new(),
                vec![GroupedSeries {
                    key: GroupKey::implicit(),
                    series,
                }],
            ),
            DetectionInput::Grouped { columns, groups } => (columns, groups),
        }
    }

    /// Total number of observations across all groups.
    pub fn row_count(&self) -> usize {
        match self {
            DetectionInput::Ungrouped(series) => series.len(),
            DetectionInput::Grouped { groups, .. } => groups.iter().map(|g| g.series.len()).sum(),
        }
    }
}

impl From<Series> for DetectionInput {
    fn from(series: Series) -> Self {
        DetectionInput::Ungrouped(series)
    }
}

/// Column-oriented input table: timestamps, values and optional grouping
/// columns.
#[derive(Debug, Clone, Default)]
pub struct InputTable {
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
    group_columns: Vec<(String, Vec<String>)>,
}

impl InputTable {
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Self {
        Self {
            timestamps,
            values,
            group_columns: Vec::new(),
        }
    }

    /// Build a table from calendar dates, placed at midnight UTC.
    pub fn from_dates(dates: &[NaiveDate], values: Vec<f64>) -> Self {
        Self::new(dates.iter().map(|d| date_to_timestamp(*d)).collect(), values)
    }

    /// Add a categorical grouping column. Composite keys are formed from all
    /// grouping columns in the order they were added.
    pub fn with_group_column(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.group_columns.push((name.into(), values));
        self
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn group_column_names(&self) -> Vec<String> {
        self.group_columns.iter().map(|(name, _)| name.clone()).collect()
    }

    /// Validate the table and split it into per-group series.
    ///
    /// Groups are ordered by first appearance and keep their input row order.
    /// Any contract violation is fatal for the whole table.
    pub fn into_input(self) -> Result<DetectionInput> {
        let n = self.timestamps.len();
        if n == 0 {
            return Err(AnomalyError::EmptyData);
        }
        if self.values.len() != n {
            return Err(AnomalyError::MalformedInput(format!(
                "timestamp column has {} rows but value column has {}",
                n,
                self.values.len()
            )));
        }
        for (name, column) in &self.group_columns {
            if column.len() != n {
                return Err(AnomalyError::MalformedInput(format!(
                    "group column '{}' has {} rows, expected {}",
                    name,
                    column.len(),
                    n
                )));
            }
        }

        if self.group_columns.is_empty() {
            return Ok(DetectionInput::Ungrouped(Series::new(
                self.timestamps,
                self.values,
            )?));
        }

        let mut order: Vec<GroupKey> = Vec::new();
        let mut rows: HashMap<GroupKey, (Vec<DateTime<Utc>>, Vec<f64>)> = HashMap::new();
        for i in 0..n {
            let key = GroupKey::new(
                self.group_columns
                    .iter()
                    .map(|(_, column)| column[i].clone())
                    .collect(),
            );
            let entry = rows.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                (Vec::new(), Vec::new())
            });
            entry.0.push(self.timestamps[i]);
            entry.1.push(self.values[i]);
        }

        let mut groups = Vec::with_capacity(order.len());
        for key in order {
            let (timestamps, values) = rows.remove(&key).unwrap_or_default();
            let series = Series::new(timestamps, values).map_err(|err| match err {
                AnomalyError::MalformedInput(msg) => {
                    AnomalyError::MalformedInput(format!("group {}: {}", key, msg))
                }
                other => other,
            })?;
            groups.push(GroupedSeries { key, series });
        }

        Ok(DetectionInput::Grouped {
            columns: self.group_column_names(),
            groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::days(i as i64)).collect()
    }

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ungrouped_table_resolves_to_single_series() {
        let table = InputTable::new(make_timestamps(4), vec![1.0, 2.0, 3.0, 4.0]);
        let input = table.into_input().unwrap();
        assert!(matches!(input, DetectionInput::Ungrouped(_)));

        let (columns, groups) = input.into_groups();
        assert!(columns.is_empty());
        assert_eq!(groups.len(), 1);
        assert!(groups[0].key.is_implicit());
        assert_eq!(groups[0].series.len(), 4);
    }

    #[test]
    fn grouped_table_preserves_first_appearance_order() {
        // Interleaved rows: b, a, b, a
        let ts = make_timestamps(2);
        let timestamps = vec![ts[0], ts[0], ts[1], ts[1]];
        let table = InputTable::new(timestamps, vec![1.0, 10.0, 2.0, 20.0])
            .with_group_column("id", labels(&["b", "a", "b", "a"]));

        let input = table.into_input().unwrap();
        assert_eq!(input.row_count(), 4);
        let (columns, groups) = input.into_groups();
        assert_eq!(columns, vec!["id".to_string()]);
        assert_eq!(groups[0].key, GroupKey::from("b"));
        assert_eq!(groups[0].series.values(), &[1.0, 2.0]);
        assert_eq!(groups[1].key, GroupKey::from("a"));
        assert_eq!(groups[1].series.values(), &[10.0, 20.0]);
    }

    #[test]
    fn composite_keys_combine_all_group_columns() {
        let ts = make_timestamps(1);
        let table = InputTable::new(vec![ts[0], ts[0]], vec![1.0, 2.0])
            .with_group_column("region", labels(&["US", "US"]))
            .with_group_column("product", labels(&["Widget", "Gadget"]));

        let (_, groups) = table.into_input().unwrap().into_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.values(), &["US".to_string(), "Widget".to_string()]);
        assert_eq!(groups[0].key.to_string(), "US / Widget");
    }

    #[test]
    fn duplicate_timestamp_within_group_is_malformed() {
        let ts = make_timestamps(1);
        let table = InputTable::new(vec![ts[0], ts[0]], vec![1.0, 2.0])
            .with_group_column("id", labels(&["a", "a"]));
        match table.into_input() {
            Err(AnomalyError::MalformedInput(msg)) => assert!(msg.contains("group a")),
            other => panic!("expected malformed input, got {:?}", other),
        }
    }

    #[test]
    fn group_column_length_mismatch_is_malformed() {
        let table = InputTable::new(make_timestamps(3), vec![1.0, 2.0, 3.0])
            .with_group_column("id", labels(&["a", "a"]));
        assert!(matches!(
            table.into_input(),
            Err(AnomalyError::MalformedInput(_))
        ));
    }

    #[test]
    fn empty_table_is_rejected() {
        let table = InputTable::new(vec![], vec![]);
        assert_eq!(table.into_input(), Err(AnomalyError::EmptyData));
    }

    #[test]
    fn implicit_key_display() {
        assert_eq!(GroupKey::implicit().to_string(), "<all>");
    }
}
