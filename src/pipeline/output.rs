//! Augmented output table and its CSV rendering.

use crate::core::GroupKey;
use crate::detection::{AnomalyDirection, AnomalyFlag};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::{self, Write};

/// Columns appended after the group columns, in output order.
pub const OUTPUT_COLUMNS: [&str; 13] = [
    "timestamp",
    "observed",
    "seasonal",
    "trend",
    "remainder",
    "remainder_lower_bound",
    "remainder_upper_bound",
    "recomposed_lower_bound",
    "recomposed_upper_bound",
    "is_anomaly",
    "anomaly_direction",
    "anomaly_score",
    "observed_cleaned",
];

/// One input row augmented with decomposition and detection columns.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyRow {
    pub group_key: GroupKey,
    pub timestamp: DateTime<Utc>,
    pub observed: f64,
    pub seasonal: f64,
    pub trend: f64,
    pub remainder: f64,
    pub remainder_lower_bound: f64,
    pub remainder_upper_bound: f64,
    pub recomposed_lower_bound: f64,
    pub recomposed_upper_bound: f64,
    pub is_anomaly: AnomalyFlag,
    pub anomaly_direction: AnomalyDirection,
    /// Absolute deviation of the remainder from its group median.
    pub anomaly_score: f64,
    /// `observed` with anomalies clamped to the nearest recomposed bound.
    pub observed_cleaned: f64,
}

impl AnomalyRow {
    pub fn recomposed_l1(&self) -> f64 {
        self.recomposed_lower_bound
    }

    pub fn recomposed_l2(&self) -> f64 {
        self.recomposed_upper_bound
    }

    /// `seasonal + trend + remainder`, equal to `observed` up to rounding.
    pub fn reconstructed(&self) -> f64 {
        self.seasonal + self.trend + self.remainder
    }
}

/// Rows of every successfully processed group, grouped contiguously in
/// first-appearance order and chronological within each group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnomalyTable {
    group_columns: Vec<String>,
    rows: Vec<AnomalyRow>,
}

impl AnomalyTable {
    pub fn new(group_columns: Vec<String>, rows: Vec<AnomalyRow>) -> Self {
        Self {
            group_columns,
            rows,
        }
    }

    pub fn group_columns(&self) -> &[String] {
        &self.group_columns
    }

    pub fn rows(&self) -> &[AnomalyRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<AnomalyRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows flagged as anomalies.
    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyRow> {
        self.rows.iter().filter(|row| row.is_anomaly.is_anomaly())
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies().count()
    }

    /// Rows belonging to one group.
    pub fn rows_for<'a>(&'a self, key: &'a GroupKey) -> impl Iterator<Item = &'a AnomalyRow> {
        self.rows.iter().filter(move |row| &row.group_key == key)
    }

    /// Column header: group columns followed by [`OUTPUT_COLUMNS`].
    pub fn header(&self) -> Vec<String> {
        self.group_columns
            .iter()
            .cloned()
            .chain(OUTPUT_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// Write the table as CSV.
    ///
    /// Timestamps are RFC 3339 in UTC and floats use the shortest
    /// representation that round-trips, so identical tables produce
    /// identical bytes.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write_record(&mut writer, self.header().iter().map(String::as_str))?;

        for row in &self.rows {
            let mut fields: Vec<String> = row.group_key.values().to_vec();
            fields.push(row.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true));
            fields.extend(
                [
                    row.observed,
                    row.seasonal,
                    row.trend,
                    row.remainder,
                    row.remainder_lower_bound,
                    row.remainder_upper_bound,
                    row.recomposed_lower_bound,
                    row.recomposed_upper_bound,
                ]
                .iter()
                .map(|v| v.to_string()),
            );
            fields.push(row.is_anomaly.to_string());
            fields.push(direction_label(row.anomaly_direction).to_string());
            fields.push(row.anomaly_score.to_string());
            fields.push(row.observed_cleaned.to_string());

            write_record(&mut writer, fields.iter().map(String::as_str))?;
        }
        writer.flush()
    }

    /// CSV rendering as a string.
    pub fn to_csv_string(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_csv(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn direction_label(direction: AnomalyDirection) -> &'static str {
    match direction {
        AnomalyDirection::Above => "above",
        AnomalyDirection::Below => "below",
        AnomalyDirection::Within => "",
    }
}

fn write_record<'a, W: Write>(
    writer: &mut W,
    fields: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        if field.contains([',', '"', '\n', '\r']) {
            write!(writer, "\"{}\"", field.replace('"', "\"\""))?;
        } else {
            writer.write_all(field.as_bytes())?;
        }
    }
    writer.write_all(b"\n")
}
