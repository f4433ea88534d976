//! Grouped anomaly detection on synthetic daily sales.
//!
//! Run with: cargo run --example anomaly_detection
//! Set RUST_LOG=anofox_anomaly=debug for per-group diagnostics.

use anofox_anomaly::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "anofox_anomaly=info".into()),
        )
        .init();

    println!("=== anofox-anomaly Grouped Detection ===\n");

    // 1. Three stores with weekly seasonality; store C is too short for a
    //    weekly cycle and falls back to trend-only decomposition
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut timestamps = Vec::new();
    let mut values = Vec::new();
    let mut stores = Vec::new();

    for (store, days, level) in [("A", 180, 200.0), ("B", 180, 80.0), ("C", 10, 50.0)] {
        for i in 0..days {
            let t = i as f64;
            let weekly = 0.1 * level * (2.0 * std::f64::consts::PI * t / 7.0).sin();
            let mut value = level + 0.2 * t + weekly + 2.0 * (1.3 * t).sin();
            if store == "A" && i == 90 {
                value += 120.0;
            }
            if store == "B" && i == 45 {
                value -= 60.0;
            }
            timestamps.push(base + Duration::days(i));
            values.push(value);
            stores.push(store.to_string());
        }
    }

    let table = InputTable::new(timestamps, values).with_group_column("store", stores);

    // 2. Detect with a fixed weekly cycle and verbose parameter reporting
    let config = AnomalyConfig::default()
        .with_frequency(PeriodSpec::duration(1.0, TimeUnit::Week))
        .with_alpha(0.05)
        .with_max_anomalies(0.1)
        .verbose(true);

    let report = match anomalize_table(table, &config) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("detection failed: {}", err);
            return;
        }
    };

    // 3. Per-group summaries
    println!("\n--- Group summaries ---");
    for summary in &report.summaries {
        println!(
            "  store {}: frequency={} trend={} IQR={:.3} anomalies={} (raw {})",
            summary.group_key,
            summary.frequency,
            summary.trend,
            summary.bounds.iqr,
            summary.anomalies,
            summary.raw_anomalies
        );
    }

    // 4. Flagged rows
    println!("\n--- Anomalies ---");
    for row in report.table.anomalies() {
        println!(
            "  {} {}: observed={:.2} band=[{:.2}, {:.2}] cleaned={:.2}",
            row.group_key,
            row.timestamp.format("%Y-%m-%d"),
            row.observed,
            row.recomposed_l1(),
            row.recomposed_l2(),
            row.observed_cleaned
        );
    }

    // 5. Fallbacks and excluded groups
    println!("\n--- Fallbacks and exclusions ---");
    for summary in report.summaries.iter().filter(|s| s.trend_only_fallback) {
        println!("  store {}: trend-only", summary.group_key);
    }
    for diagnostic in &report.diagnostics {
        println!("  {}", diagnostic);
    }

    // 6. CSV preview
    println!("\n--- CSV (first 3 lines) ---");
    for line in report.table.to_csv_string().lines().take(3) {
        println!("  {}", line);
    }
}
