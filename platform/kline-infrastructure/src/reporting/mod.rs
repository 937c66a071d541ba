use kline_domain::entities::metrics::MetricsSummary;
use kline_domain::services::audit::AuditEvent;
use kline_domain::value_objects::equity_point::EquityPoint;
use kline_domain::value_objects::trade::{CompletedTrade, ExitReason};
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::Path;

pub fn write_audit_jsonl(path: &Path, events: &[AuditEvent]) -> Result<(), String> {
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create logs: {}", err))?;
    for event in events {
        let line = serde_json::to_string(event)
            .map_err(|err| format!("failed to serialize audit event: {}", err))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|err| format!("failed to write audit event: {}", err))?;
    }
    Ok(())
}

pub fn write_trades_csv(path: &Path, trades: &[CompletedTrade]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create trades csv {}: {}", path.display(), err))?;
    wtr.write_record([
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "shares",
        "pnl_pct",
        "holding_days",
        "entry_reason",
        "exit_reason",
        "exit_detail",
    ])
    .map_err(|err| format!("failed to write trades csv header: {}", err))?;

    for trade in trades {
        let detail = match &trade.exit_reason {
            ExitReason::Signal(reason) => reason.clone(),
            _ => String::new(),
        };
        wtr.write_record([
            trade.entry_date.to_string(),
            format!("{:.4}", trade.entry_price),
            trade.exit_date.to_string(),
            format!("{:.4}", trade.exit_price),
            trade.shares.to_string(),
            format!("{:.4}", trade.pnl_pct),
            trade.holding_days().to_string(),
            trade.entry_reason.clone(),
            trade.exit_reason.label().to_string(),
            detail,
        ])
        .map_err(|err| format!("failed to write trades row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush trades csv: {}", err))
}

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create equity csv {}: {}", path.display(), err))?;
    wtr.write_record(["date", "equity", "cash", "shares", "close"])
        .map_err(|err| format!("failed to write equity csv header: {}", err))?;

    for point in points {
        wtr.write_record([
            point.date.to_string(),
            format!("{:.4}", point.equity),
            format!("{:.4}", point.cash),
            point.shares.to_string(),
            format!("{:.4}", point.close),
        ])
        .map_err(|err| format!("failed to write equity row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush equity csv: {}", err))
}

/// JSON has no infinity; an unbounded profit factor is written as `"inf"`.
fn finite_or_label(value: f64) -> Value {
    if value.is_finite() {
        json!(value)
    } else if value > 0.0 {
        json!("inf")
    } else {
        Value::Null
    }
}

pub fn summary_to_json(summary: &MetricsSummary, meta: Option<&Value>) -> Value {
    json!({
        "meta": meta,
        "bars_processed": summary.bars_processed,
        "total_trades": summary.total_trades,
        "wins": summary.wins,
        "losses": summary.losses,
        "win_rate": summary.win_rate,
        "total_return": summary.total_return,
        "annual_return": summary.annual_return,
        "max_drawdown": summary.max_drawdown,
        "profit_factor": finite_or_label(summary.profit_factor),
        "avg_holding_days": summary.avg_holding_days,
        "buy_hold_return": summary.buy_hold_return,
        "alpha": summary.alpha(),
        "final_equity": summary.final_equity,
    })
}

pub fn write_summary_json(
    path: &Path,
    summary: &MetricsSummary,
    meta: Option<&Value>,
) -> Result<(), String> {
    write_json_pretty(path, &summary_to_json(summary, meta))
}

pub fn write_json_pretty(path: &Path, value: &Value) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|err| format!("failed to serialize json {}: {}", path.display(), err))?;
    let mut file = fs::File::create(path)
        .map_err(|err| format!("failed to create {}: {}", path.display(), err))?;
    file.write_all(json.as_bytes())
        .map_err(|err| format!("failed to write {}: {}", path.display(), err))
}
