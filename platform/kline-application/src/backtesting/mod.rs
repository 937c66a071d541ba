use crate::config::{Config, InstrumentConfig};
use crate::reporting::render_report;
use crate::shared::{
    build_strategies, data_quality_json, resolve_indicator_config, resolve_lookback,
    resolve_simulator_config, resolve_window_bounds, summary_meta_json,
};
use kline_domain::entities::metrics::{compute_metrics, BacktestWindow, MetricsSummary};
use kline_domain::repositories::artifacts::ArtifactWriter;
use kline_domain::repositories::market_data::{MarketDataRepository, OhlcvQuery};
use kline_domain::services::audit::AuditEvent;
use kline_domain::services::comparison::{
    compare_runs, summarize_instruments, Comparison, CrossInstrumentSummary,
};
use kline_domain::services::engine::simulator::{
    resolve_start_index, SimulationResult, SimulatorConfig, TradeSimulator,
};
use kline_domain::services::indicators::{compute_indicators, IndicatorConfig};
use kline_domain::services::ohlcv::DataQualityReport;
use kline_domain::services::strategy::{SignalGenerator, StrategyKind};
use kline_domain::value_objects::price_bar::PriceBar;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;

pub const DEFAULT_TRADES_LISTED: usize = 10;

#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub strategy: String,
    /// Non-empty signals produced inside the evaluated window.
    pub signals_emitted: usize,
    pub result: SimulationResult,
    pub summary: MetricsSummary,
}

#[derive(Debug, Clone)]
pub struct InstrumentBacktest {
    pub symbol: String,
    pub display_name: String,
    pub bars: usize,
    pub start_index: usize,
    pub window: BacktestWindow,
    pub data_quality: DataQualityReport,
    pub runs: Vec<StrategyRun>,
    pub comparison: Comparison,
}

impl InstrumentBacktest {
    pub fn run(&self, strategy: &str) -> Option<&StrategyRun> {
        self.runs.iter().find(|run| run.strategy == strategy)
    }

    pub fn buy_hold_return(&self) -> f64 {
        self.window.buy_hold_return()
    }

    fn named_summaries(&self) -> Vec<(&str, &MetricsSummary)> {
        self.runs
            .iter()
            .map(|run| (run.strategy.as_str(), &run.summary))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInstrument {
    pub symbol: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub run_id: String,
    pub run_dir: PathBuf,
    pub strategies: Vec<String>,
    pub instruments: Vec<InstrumentBacktest>,
    pub skipped: Vec<SkippedInstrument>,
    pub summary: CrossInstrumentSummary,
}

/// Everything a single-instrument backtest needs besides the bars.
pub struct BacktestPlan {
    pub run_id: String,
    pub simulator: SimulatorConfig,
    pub indicators: IndicatorConfig,
    pub strategies: Vec<StrategyKind>,
    pub warmup_bars: usize,
    pub min_backtest_bars: usize,
}

impl BacktestPlan {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let (warmup_bars, min_backtest_bars) = resolve_window_bounds(config);
        Ok(Self {
            run_id: config.run.run_id.clone(),
            simulator: resolve_simulator_config(config)?,
            indicators: resolve_indicator_config(config),
            strategies: build_strategies(config)?,
            warmup_bars,
            min_backtest_bars,
        })
    }
}

pub fn run_backtest(
    config: &Config,
    config_toml: &str,
    out: Option<PathBuf>,
    market_data: &dyn MarketDataRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<BacktestReport, String> {
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        instruments = config.instruments.len()
    )
    .entered();

    config.validate()?;
    let plan = BacktestPlan::from_config(config)?;
    let run_start = Instant::now();

    let mut audit_events: Vec<AuditEvent> = Vec::new();
    let mut instruments: Vec<InstrumentBacktest> = Vec::new();
    let mut skipped: Vec<SkippedInstrument> = Vec::new();

    for instrument in &config.instruments {
        match load_instrument(config, instrument, market_data, &mut audit_events)
            .and_then(|(bars, report)| {
                backtest_series(&plan, instrument, bars, report, &mut audit_events)
            }) {
            Ok(backtest) => {
                metrics::counter!("kline.backtest.instruments_total", "result" => "ok")
                    .increment(1);
                instruments.push(backtest);
            }
            Err(reason) => {
                metrics::counter!("kline.backtest.instruments_total", "result" => "skipped")
                    .increment(1);
                tracing::warn!(symbol = %instrument.symbol, error = %reason, "instrument skipped");
                audit_events.push(AuditEvent {
                    run_id: config.run.run_id.clone(),
                    date: None,
                    stage: "data".to_string(),
                    symbol: Some(instrument.symbol.clone()),
                    strategy: None,
                    action: "skip".to_string(),
                    error: Some(reason.clone()),
                    details: serde_json::json!({ "path": instrument.path }),
                });
                skipped.push(SkippedInstrument {
                    symbol: instrument.symbol.clone(),
                    reason,
                });
            }
        }
    }

    if instruments.is_empty() {
        return Err(format!(
            "no instrument could be backtested ({} skipped)",
            skipped.len()
        ));
    }

    let per_instrument: Vec<Vec<(&str, &MetricsSummary)>> = instruments
        .iter()
        .map(InstrumentBacktest::named_summaries)
        .collect();
    let summary = summarize_instruments(&per_instrument);
    metrics::histogram!("kline.backtest.run_ms").record(run_start.elapsed().as_millis() as f64);
    metrics::gauge!("kline.backtest.instruments").set(instruments.len() as f64);

    let base_dir = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let report = BacktestReport {
        run_id: config.run.run_id.clone(),
        run_dir: base_dir.join(&config.run.run_id),
        strategies: plan
            .strategies
            .iter()
            .map(|strategy| strategy.name().to_string())
            .collect(),
        instruments,
        skipped,
        summary,
    };

    write_outputs(config, config_toml, &report, artifacts, audit_events)?;
    tracing::info!(
        run_dir = %report.run_dir.display(),
        instruments = report.instruments.len(),
        skipped = report.skipped.len(),
        "backtest complete"
    );
    Ok(report)
}

fn load_instrument(
    config: &Config,
    instrument: &InstrumentConfig,
    market_data: &dyn MarketDataRepository,
    audit_events: &mut Vec<AuditEvent>,
) -> Result<(Vec<PriceBar>, DataQualityReport), String> {
    let stage_start = Instant::now();
    let (bars, report) = market_data.load_ohlcv(&OhlcvQuery {
        symbol: instrument.symbol.clone(),
        path: config.resolve_data_path(instrument),
        lookback_bars: resolve_lookback(config),
    })?;
    metrics::histogram!("kline.backtest.load_ohlcv_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    if report.has_issues() {
        tracing::warn!(
            symbol = %instrument.symbol,
            duplicates = report.duplicates,
            out_of_order = report.out_of_order,
            invalid_close = report.invalid_close,
            gaps = report.gaps,
            "data quality issues"
        );
    }
    audit_events.push(timing_event(
        &config.run.run_id,
        &instrument.symbol,
        "load_ohlcv",
        stage_start.elapsed().as_millis() as u64,
        data_quality_json(&report),
    ));

    if bars.is_empty() {
        return Err(format!("no usable bars for {}", instrument.symbol));
    }
    Ok((bars, report))
}

/// Indicators, signals, simulation and metrics for one instrument's bars.
pub fn backtest_series(
    plan: &BacktestPlan,
    instrument: &InstrumentConfig,
    mut bars: Vec<PriceBar>,
    data_quality: DataQualityReport,
    audit_events: &mut Vec<AuditEvent>,
) -> Result<InstrumentBacktest, String> {
    let _span = info_span!("backtest_instrument", symbol = %instrument.symbol).entered();

    let stage_start = Instant::now();
    compute_indicators(&mut bars, &plan.indicators);
    metrics::histogram!("kline.backtest.indicators_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let start_index = resolve_start_index(bars.len(), plan.warmup_bars, plan.min_backtest_bars);
    let window = BacktestWindow::from_bars(&bars, start_index)
        .ok_or_else(|| format!("empty evaluation window for {}", instrument.symbol))?;
    tracing::info!(
        bars = bars.len(),
        start_index,
        start = %window.first_date,
        end = %window.last_date,
        "evaluation window"
    );

    let mut runs = Vec::with_capacity(plan.strategies.len());
    for strategy in &plan.strategies {
        let stage_start = Instant::now();
        let signals = strategy.generate(&bars);
        let signals_emitted = signals
            .iter()
            .skip(start_index)
            .filter(|signal| !signal.is_none())
            .count();

        let simulator = TradeSimulator::new(plan.simulator.clone()).with_labels(
            &plan.run_id,
            &instrument.symbol,
            strategy.name(),
        );
        let mut result = simulator.simulate(&bars, &signals, start_index);
        let summary = compute_metrics(
            &result.trades,
            &result.equity,
            &window,
            plan.simulator.initial_capital,
        );
        let engine_ms = stage_start.elapsed().as_millis();
        metrics::histogram!("kline.backtest.engine_ms", "strategy" => strategy.name().to_string())
            .record(engine_ms as f64);
        metrics::gauge!("kline.backtest.trades", "strategy" => strategy.name().to_string())
            .set(summary.total_trades as f64);

        tracing::info!(
            strategy = strategy.name(),
            signals = signals_emitted,
            trades = summary.total_trades,
            total_return = summary.total_return,
            max_drawdown = summary.max_drawdown,
            "strategy simulated"
        );

        audit_events.append(&mut result.audit_events);
        audit_events.push(timing_event(
            &plan.run_id,
            &instrument.symbol,
            "run_engine",
            engine_ms as u64,
            serde_json::json!({ "strategy": strategy.name(), "signals": signals_emitted }),
        ));

        runs.push(StrategyRun {
            strategy: strategy.name().to_string(),
            signals_emitted,
            result,
            summary,
        });
    }

    let named: Vec<(&str, &MetricsSummary)> = runs
        .iter()
        .map(|run| (run.strategy.as_str(), &run.summary))
        .collect();
    let comparison = compare_runs(&named);

    Ok(InstrumentBacktest {
        symbol: instrument.symbol.clone(),
        display_name: instrument.display_name(),
        bars: bars.len(),
        start_index,
        window,
        data_quality,
        runs,
        comparison,
    })
}

fn timing_event(
    run_id: &str,
    symbol: &str,
    action: &str,
    duration_ms: u64,
    details: serde_json::Value,
) -> AuditEvent {
    AuditEvent {
        run_id: run_id.to_string(),
        date: None,
        stage: "timing".to_string(),
        symbol: Some(symbol.to_string()),
        strategy: None,
        action: action.to_string(),
        error: None,
        details: serde_json::json!({
            "duration_ms": duration_ms,
            "details": details,
        }),
    }
}

/// Layout: `<run_dir>/<symbol>/<strategy>/{trades.csv,equity.csv,summary.json}`
/// plus run-level `comparison.json`, `logs.jsonl`, `report.txt` and the
/// config snapshot.
fn write_outputs(
    config: &Config,
    config_toml: &str,
    report: &BacktestReport,
    artifacts: &dyn ArtifactWriter,
    audit_events: Vec<AuditEvent>,
) -> Result<(), String> {
    let stage_start = Instant::now();
    artifacts.ensure_dir(&report.run_dir)?;

    for instrument in &report.instruments {
        for run in &instrument.runs {
            let dir = report.run_dir.join(&instrument.symbol).join(&run.strategy);
            artifacts.ensure_dir(&dir)?;
            artifacts.write_trades_csv(dir.join("trades.csv").as_path(), &run.result.trades)?;
            artifacts.write_equity_csv(dir.join("equity.csv").as_path(), &run.result.equity)?;
            let meta = summary_meta_json(
                config,
                &instrument.symbol,
                &run.strategy,
                &instrument.window,
            );
            artifacts.write_summary_json(
                dir.join("summary.json").as_path(),
                &run.summary,
                Some(&meta),
            )?;
        }
    }

    artifacts.write_comparison_json(
        report.run_dir.join("comparison.json").as_path(),
        &comparison_json(report),
    )?;
    artifacts.write_audit_jsonl(report.run_dir.join("logs.jsonl").as_path(), &audit_events)?;

    let text_enabled = config
        .report
        .as_ref()
        .and_then(|report| report.text)
        .unwrap_or(true);
    if text_enabled {
        let max_trades = config
            .report
            .as_ref()
            .and_then(|report| report.max_trades_listed)
            .unwrap_or(DEFAULT_TRADES_LISTED);
        artifacts.write_report_text(
            report.run_dir.join("report.txt").as_path(),
            &render_report(report, max_trades),
        )?;
    }

    artifacts.write_config_snapshot_toml(
        report.run_dir.join("config_snapshot.toml").as_path(),
        config_toml,
    )?;
    metrics::histogram!("kline.backtest.write_outputs_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    Ok(())
}

pub fn comparison_json(report: &BacktestReport) -> serde_json::Value {
    let instruments: Vec<serde_json::Value> = report
        .instruments
        .iter()
        .map(|instrument| {
            let runs: serde_json::Map<String, serde_json::Value> = instrument
                .runs
                .iter()
                .map(|run| {
                    (
                        run.strategy.clone(),
                        serde_json::json!({
                            "total_return": run.summary.total_return,
                            "alpha": run.summary.alpha(),
                            "win_rate": run.summary.win_rate,
                            "trades": run.summary.total_trades,
                            "max_drawdown": run.summary.max_drawdown,
                        }),
                    )
                })
                .collect();
            serde_json::json!({
                "symbol": instrument.symbol,
                "name": instrument.display_name,
                "start": instrument.window.first_date,
                "end": instrument.window.last_date,
                "buy_hold_return": instrument.buy_hold_return(),
                "strategies": runs,
                "best": comparison_value(&instrument.comparison),
            })
        })
        .collect();

    let averages: Vec<serde_json::Value> = report
        .summary
        .strategies
        .iter()
        .map(|avg| {
            serde_json::json!({
                "strategy": avg.strategy,
                "avg_total_return": avg.avg_total_return,
                "avg_alpha": avg.avg_alpha,
                "avg_win_rate": avg.avg_win_rate,
                "best_count": avg.best_count,
            })
        })
        .collect();

    serde_json::json!({
        "run_id": report.run_id,
        "instruments": instruments,
        "averages": averages,
        "avg_buy_hold_return": report.summary.avg_buy_hold_return,
        "skipped": report
            .skipped
            .iter()
            .map(|skip| serde_json::json!({ "symbol": skip.symbol, "reason": skip.reason }))
            .collect::<Vec<_>>(),
    })
}

fn comparison_value(comparison: &Comparison) -> serde_json::Value {
    match comparison {
        Comparison::NoRuns => serde_json::Value::Null,
        Comparison::Best(name) => serde_json::json!(name),
        Comparison::Tie(names) => serde_json::json!({ "tie": names }),
    }
}
