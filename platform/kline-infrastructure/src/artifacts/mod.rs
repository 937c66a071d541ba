use crate::reporting;
use kline_domain::entities::metrics::MetricsSummary;
use kline_domain::repositories::artifacts::ArtifactWriter;
use kline_domain::services::audit::AuditEvent;
use kline_domain::value_objects::equity_point::EquityPoint;
use kline_domain::value_objects::trade::CompletedTrade;
use std::fs;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

fn record_write_metrics(kind: &'static str, start: Instant, result: &Result<(), String>) {
    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!(
        "kline.infra.artifacts.write.calls_total",
        "kind" => kind,
        "result" => result_label
    )
    .increment(1);
    metrics::histogram!("kline.infra.artifacts.write_ms", "kind" => kind, "result" => result_label)
        .record(start.elapsed().as_millis() as f64);
}

fn write_text(path: &Path, contents: &str, what: &str) -> Result<(), String> {
    fs::write(path, contents)
        .map_err(|err| format!("failed to write {what} {}: {}", path.display(), err))
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        let start = Instant::now();
        let result = fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err));
        record_write_metrics("ensure_dir", start, &result);
        result
    }

    fn write_trades_csv(&self, path: &Path, trades: &[CompletedTrade]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_trades_csv(path, trades);
        record_write_metrics("trades_csv", start, &result);
        result
    }

    fn write_equity_csv(&self, path: &Path, points: &[EquityPoint]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_equity_csv(path, points);
        record_write_metrics("equity_csv", start, &result);
        result
    }

    fn write_summary_json(
        &self,
        path: &Path,
        summary: &MetricsSummary,
        meta: Option<&serde_json::Value>,
    ) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_summary_json(path, summary, meta);
        record_write_metrics("summary_json", start, &result);
        result
    }

    fn write_comparison_json(
        &self,
        path: &Path,
        comparison: &serde_json::Value,
    ) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_json_pretty(path, comparison);
        record_write_metrics("comparison_json", start, &result);
        result
    }

    fn write_audit_jsonl(&self, path: &Path, events: &[AuditEvent]) -> Result<(), String> {
        let start = Instant::now();
        let result = reporting::write_audit_jsonl(path, events);
        record_write_metrics("logs_jsonl", start, &result);
        result
    }

    fn write_report_text(&self, path: &Path, contents: &str) -> Result<(), String> {
        let start = Instant::now();
        let result = write_text(path, contents, "report");
        record_write_metrics("report_txt", start, &result);
        result
    }

    fn write_config_snapshot_toml(&self, path: &Path, contents: &str) -> Result<(), String> {
        let start = Instant::now();
        let result = write_text(path, contents, "config snapshot");
        record_write_metrics("config_snapshot_toml", start, &result);
        result
    }
}
