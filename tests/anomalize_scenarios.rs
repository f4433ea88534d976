//! End-to-end detection scenarios.
//!
//! These tests run whole tables through `anomalize` and check the augmented
//! output: flagged rows, excluded groups, bound geometry and reproducibility.

use anofox_anomaly::core::{GroupKey, InputTable, Series};
use anofox_anomaly::detection::{AnomalyDirection, AnomalyFlag};
use anofox_anomaly::frequency::{PeriodSpec, TimeUnit};
use anofox_anomaly::pipeline::{
    anomalize, anomalize_table, AnomalyConfig, AnomalyReport, OUTPUT_COLUMNS,
};
use anofox_anomaly::utils::{median, quantile};
use anofox_anomaly::AnomalyError;
use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn weekly_timestamps(n: usize) -> Vec<DateTime<Utc>> {
    let base = Utc.with_ymd_and_hms(2020, 1, 6, 0, 0, 0).unwrap();
    (0..n).map(|i| base + Duration::weeks(i as i64)).collect()
}

fn daily_timestamps(n: usize) -> Vec<DateTime<Utc>> {
    let base = Utc.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap();
    (0..n).map(|i| base + Duration::days(i as i64)).collect()
}

/// 100 + 10*sin(2*pi*i/52) + uniform(-1, 1) noise.
fn yearly_cycle(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            100.0
                + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 52.0).sin()
                + rng.gen_range(-1.0..1.0)
        })
        .collect()
}

/// Weekly series with a single spike at week 60.
fn weekly_with_spike(seed: u64) -> Vec<f64> {
    let mut values = yearly_cycle(104, seed);
    let iqr = quantile(&values, 0.75) - quantile(&values, 0.25);
    values[60] = median(&values) + 10.0 * iqr;
    values
}

fn weekly_config() -> AnomalyConfig {
    AnomalyConfig::default()
        .with_frequency(52)
        .with_alpha(0.05)
        .with_max_anomalies(0.2)
}

fn flagged_indices(report: &AnomalyReport) -> Vec<usize> {
    report
        .table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| row.is_anomaly == AnomalyFlag::Yes)
        .map(|(i, _)| i)
        .collect()
}

#[test]
fn single_spike_is_the_only_anomaly() {
    for seed in 0..40 {
        let series = Series::new(weekly_timestamps(104), weekly_with_spike(seed)).unwrap();
        let report = anomalize(series, &weekly_config()).unwrap();

        assert_eq!(flagged_indices(&report), vec![60], "seed {seed}");
        assert_eq!(
            report.table.rows()[60].anomaly_direction,
            AnomalyDirection::Above,
            "seed {seed}"
        );
        assert_eq!(report.summaries[0].frequency, 52);
    }
}

#[test]
fn detection_ignores_series_level() {
    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut values: Vec<f64> = (0..104)
            .map(|i| {
                10.0 * (2.0 * std::f64::consts::PI * i as f64 / 52.0).sin()
                    + rng.gen_range(-20.0..20.0)
            })
            .collect();
        values[60] += 1000.0;
        let shifted: Vec<f64> = values.iter().map(|v| v + 1e12).collect();

        let base = anomalize(
            Series::new(weekly_timestamps(104), values).unwrap(),
            &weekly_config(),
        )
        .unwrap();
        let lifted = anomalize(
            Series::new(weekly_timestamps(104), shifted).unwrap(),
            &weekly_config(),
        )
        .unwrap();

        assert_eq!(flagged_indices(&base), vec![60], "seed {seed}");
        assert_eq!(flagged_indices(&lifted), flagged_indices(&base), "seed {seed}");
    }
}

#[test]
fn constant_series_has_no_anomalies() {
    let series = Series::new(daily_timestamps(60), vec![5.0; 60]).unwrap();
    let report = anomalize(series, &AnomalyConfig::default()).unwrap();

    assert_eq!(report.table.anomaly_count(), 0);
    for row in report.table.rows() {
        assert_eq!(row.trend, 5.0);
        assert_eq!(row.seasonal, 0.0);
        assert_eq!(row.remainder, 0.0);
        assert_eq!(row.recomposed_lower_bound, 5.0);
        assert_eq!(row.recomposed_upper_bound, 5.0);
    }
}

#[test]
fn short_group_is_excluded_with_diagnostic() {
    let mut timestamps = weekly_timestamps(200);
    timestamps.extend(weekly_timestamps(3));
    let mut values = yearly_cycle(200, 7);
    values.extend([10.0, 11.0, 12.0]);
    let sites: Vec<String> = std::iter::repeat_n("large".to_string(), 200)
        .chain(std::iter::repeat_n("small".to_string(), 3))
        .collect();

    let table = InputTable::new(timestamps, values).with_group_column("site", sites);
    let report = anomalize_table(table, &AnomalyConfig::default().with_frequency(52)).unwrap();

    assert_eq!(report.table.len(), 200);
    assert!(report
        .table
        .rows()
        .iter()
        .all(|row| row.group_key == GroupKey::from("large")));
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].group_key, GroupKey::from("small"));
    assert_eq!(
        report.diagnostics[0].error,
        AnomalyError::InsufficientData {
            needed: 104,
            got: 3
        }
    );
}

#[test]
fn output_satisfies_decomposition_identity() {
    let series = Series::new(weekly_timestamps(104), weekly_with_spike(42)).unwrap();
    let report = anomalize(series, &weekly_config()).unwrap();

    for row in report.table.rows() {
        assert_relative_eq!(row.reconstructed(), row.observed, epsilon = 1e-9);
    }
}

#[test]
fn recomposed_bounds_shift_remainder_bounds() {
    let series = Series::new(weekly_timestamps(104), weekly_with_spike(42)).unwrap();
    let report = anomalize(series, &weekly_config()).unwrap();
    let bounds = report.summaries[0].bounds;

    for row in report.table.rows() {
        let base = row.seasonal + row.trend;
        assert_relative_eq!(row.recomposed_l1(), base + bounds.lower, epsilon = 1e-9);
        assert_relative_eq!(row.recomposed_l2(), base + bounds.upper, epsilon = 1e-9);
        assert_relative_eq!(row.remainder_lower_bound, bounds.lower, epsilon = 1e-12);
        assert_relative_eq!(
            row.recomposed_upper_bound - row.recomposed_lower_bound,
            (1.0 + 2.0 * bounds.factor) * bounds.iqr,
            epsilon = 1e-9
        );
    }
}

#[test]
fn repeated_runs_produce_identical_csv() {
    let build = || {
        let mut timestamps = daily_timestamps(90);
        timestamps.extend(daily_timestamps(90));
        let mut values = yearly_cycle(90, 1);
        values.extend(yearly_cycle(90, 2));
        let regions: Vec<String> = std::iter::repeat_n("north".to_string(), 90)
            .chain(std::iter::repeat_n("south".to_string(), 90))
            .collect();
        InputTable::new(timestamps, values).with_group_column("region", regions)
    };

    let first = anomalize_table(build(), &AnomalyConfig::default()).unwrap();
    let second = anomalize_table(build(), &AnomalyConfig::default()).unwrap();

    let mut a = Vec::new();
    let mut b = Vec::new();
    first.table.write_csv(&mut a).unwrap();
    second.table.write_csv(&mut b).unwrap();
    assert_eq!(a, b);

    let text = String::from_utf8(a).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(
        header,
        "region,timestamp,observed,seasonal,trend,remainder,remainder_lower_bound,\
         remainder_upper_bound,recomposed_lower_bound,recomposed_upper_bound,\
         is_anomaly,anomaly_direction,anomaly_score,observed_cleaned"
    );
    assert_eq!(header.split(',').count(), 1 + OUTPUT_COLUMNS.len());
    assert_eq!(text.lines().count(), 181);
}

#[test]
fn cap_limits_flagged_points() {
    let mut values = yearly_cycle(100, 3);
    for i in (5..100).step_by(5) {
        values[i] += 50.0 + i as f64;
    }
    let series = Series::new(daily_timestamps(100), values).unwrap();
    let config = AnomalyConfig::default()
        .with_frequency(7)
        .with_max_anomalies(0.05);
    let report = anomalize(series, &config).unwrap();

    assert!(report.table.anomaly_count() <= 5);
    assert!(report.summaries[0].raw_anomalies >= report.summaries[0].anomalies);
}

#[test]
fn duration_specs_resolve_against_interval() {
    let series = Series::new(daily_timestamps(120), yearly_cycle(120, 11)).unwrap();
    let config = AnomalyConfig::default()
        .with_frequency(PeriodSpec::duration(2.0, TimeUnit::Week))
        .with_trend("6 weeks".parse::<PeriodSpec>().unwrap());
    let report = anomalize(series, &config).unwrap();

    assert_eq!(report.summaries[0].frequency, 14);
    assert_eq!(report.summaries[0].trend, 43);
}

#[test]
fn malformed_table_is_rejected() {
    let timestamps = daily_timestamps(10);
    let table = InputTable::new(timestamps, vec![1.0; 9]);
    assert!(matches!(
        anomalize_table(table, &AnomalyConfig::default()),
        Err(AnomalyError::MalformedInput(_))
    ));

    let table = InputTable::new(vec![], vec![]);
    assert_eq!(
        anomalize_table(table, &AnomalyConfig::default()).unwrap_err(),
        AnomalyError::EmptyData
    );
}
