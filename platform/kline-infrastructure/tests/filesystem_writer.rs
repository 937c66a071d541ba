use chrono::NaiveDate;
use kline_domain::entities::metrics::MetricsSummary;
use kline_domain::repositories::artifacts::ArtifactWriter;
use kline_domain::value_objects::equity_point::EquityPoint;
use kline_infrastructure::artifacts::FilesystemArtifactWriter;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_tmp_dir(name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("kline_{name}_{}_{}", std::process::id(), now))
}

#[test]
fn writer_creates_nested_run_dir_and_artifacts() {
    let root = unique_tmp_dir("artifacts");
    let run_dir = root.join("run-1").join("600000");
    let writer = FilesystemArtifactWriter::new();

    writer.ensure_dir(&run_dir).expect("ensure dir");
    writer
        .write_trades_csv(&run_dir.join("trades.csv"), &[])
        .expect("trades");
    writer
        .write_equity_csv(
            &run_dir.join("equity.csv"),
            &[EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 2).expect("date"),
                equity: 100_000.0,
                cash: 100_000.0,
                shares: 0,
                close: 12.0,
            }],
        )
        .expect("equity");
    let meta = serde_json::json!({ "run_id": "run-1", "symbol": "600000" });
    writer
        .write_summary_json(
            &run_dir.join("summary.json"),
            &MetricsSummary::default(),
            Some(&meta),
        )
        .expect("summary");
    writer
        .write_report_text(&root.join("report.txt"), "report body\n")
        .expect("report");
    writer
        .write_config_snapshot_toml(&root.join("config_snapshot.toml"), "[run]\n")
        .expect("snapshot");

    let trades = fs::read_to_string(run_dir.join("trades.csv")).expect("read trades");
    assert_eq!(trades.lines().count(), 1);
    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("summary.json")).expect("read"))
            .expect("parse summary");
    assert_eq!(summary["meta"]["symbol"], "600000");
    assert_eq!(summary["total_trades"], 0);
    assert_eq!(
        fs::read_to_string(root.join("report.txt")).expect("read report"),
        "report body\n"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn writing_into_missing_dir_fails_with_context() {
    let root = unique_tmp_dir("missing_dir");
    let writer = FilesystemArtifactWriter::new();
    let err = writer
        .write_report_text(&root.join("nested").join("report.txt"), "x")
        .expect_err("missing dir");
    assert!(err.contains("failed to write report"));
}
