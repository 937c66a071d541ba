use crate::backtesting::{BacktestReport, InstrumentBacktest, StrategyRun};
use kline_domain::entities::metrics::MetricsSummary;
use kline_domain::services::comparison::Comparison;
use std::fmt::Write;

const RULE_WIDTH: usize = 72;

/// Plain-text report: one block per instrument, then a cross-instrument
/// table when more than one instrument was backtested.
pub fn render_report(report: &BacktestReport, max_trades: usize) -> String {
    let mut out = String::new();
    for instrument in &report.instruments {
        render_instrument(&mut out, instrument, max_trades);
    }
    if report.instruments.len() > 1 || !report.skipped.is_empty() {
        render_summary(&mut out, report);
    }
    out
}

fn rule(out: &mut String, ch: char) {
    out.extend(std::iter::repeat(ch).take(RULE_WIDTH));
    out.push('\n');
}

fn render_instrument(out: &mut String, instrument: &InstrumentBacktest, max_trades: usize) {
    out.push('\n');
    rule(out, '=');
    let _ = writeln!(out, "Backtest report: {}", instrument.display_name);
    let _ = writeln!(
        out,
        "Window: {} ~ {} ({} bars, signals from index {})",
        instrument.window.first_date,
        instrument.window.last_date,
        instrument.bars,
        instrument.start_index
    );
    if instrument.data_quality.has_issues() {
        let q = &instrument.data_quality;
        let _ = writeln!(
            out,
            "Data quality: {} duplicates, {} out of order, {} invalid price, {} gaps",
            q.duplicates, q.out_of_order, q.invalid_close, q.gaps
        );
    }
    rule(out, '=');

    for run in &instrument.runs {
        render_run(out, run, max_trades);
    }

    if instrument.runs.len() > 1 {
        let _ = writeln!(out, "\n--- comparison ---");
        for run in &instrument.runs {
            let _ = writeln!(
                out,
                "  {} vs buy & hold: {:+.2}%",
                run.strategy,
                run.summary.alpha()
            );
        }
        let _ = writeln!(out, "  Best strategy: {}", best_label(&instrument.comparison));
    }
    rule(out, '=');
}

fn render_run(out: &mut String, run: &StrategyRun, max_trades: usize) {
    let _ = writeln!(out, "\n--- {} ---", run.strategy);
    let m = &run.summary;
    if m.is_empty() {
        let _ = writeln!(out, "  no valid data");
        return;
    }
    let _ = writeln!(out, "  Total return:   {:+.2}%", m.total_return);
    let _ = writeln!(out, "  Annual return:  {:+.2}%", m.annual_return);
    let _ = writeln!(out, "  Max drawdown:   -{:.2}%", m.max_drawdown);
    let _ = writeln!(
        out,
        "  Win rate:       {:.1}% ({}W/{}L)",
        m.win_rate, m.wins, m.losses
    );
    let _ = writeln!(out, "  Profit factor:  {}", profit_factor_label(m));
    let _ = writeln!(out, "  Trades:         {}", m.total_trades);
    let _ = writeln!(out, "  Avg holding:    {:.1} days", m.avg_holding_days);
    let _ = writeln!(out, "  Final equity:   {}", group_thousands(m.final_equity));
    let _ = writeln!(out, "  Buy & hold:     {:+.2}%", m.buy_hold_return);

    if let Some(position) = &run.result.open_position {
        let _ = writeln!(
            out,
            "  Open position:  {} shares since {} @ {:.2}",
            position.shares, position.entry_date, position.entry_price
        );
    }

    let trades = &run.result.trades;
    if trades.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n  Trades ({} total):", trades.len());
    for (idx, trade) in trades.iter().take(max_trades).enumerate() {
        let marker = if trade.is_win() { '+' } else { '-' };
        let _ = writeln!(
            out,
            "    {marker} #{} buy {} @ {:.2} -> sell {} @ {:.2}  {:+.2}%  [{}] ({})",
            idx + 1,
            trade.entry_date,
            trade.entry_price,
            trade.exit_date,
            trade.exit_price,
            trade.pnl_pct,
            trade.entry_reason,
            trade.exit_reason
        );
    }
    if trades.len() > max_trades {
        let _ = writeln!(
            out,
            "    ... {} more trades omitted",
            trades.len() - max_trades
        );
    }
}

fn render_summary(out: &mut String, report: &BacktestReport) {
    out.push('\n');
    rule(out, '=');
    let _ = writeln!(out, "Multi-instrument summary");
    rule(out, '=');

    let mut header = format!("{:<20}", "Instrument");
    for strategy in &report.strategies {
        let _ = write!(header, " | {:>10}", truncate(strategy, 10));
    }
    let _ = write!(header, " | {:>10} | Best", "Buy&Hold");
    let _ = writeln!(out, "{header}");
    rule(out, '-');

    for instrument in &report.instruments {
        let mut line = format!("{:<20}", truncate(&instrument.display_name, 20));
        for strategy in &report.strategies {
            let cell = instrument
                .run(strategy)
                .filter(|run| !run.summary.is_empty())
                .map(|run| format!("{:+.2}%", run.summary.total_return))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = write!(line, " | {cell:>10}");
        }
        let _ = write!(
            line,
            " | {:>10} | {}",
            format!("{:+.2}%", instrument.buy_hold_return()),
            best_label(&instrument.comparison)
        );
        let _ = writeln!(out, "{line}");
    }

    rule(out, '-');
    let mut line = format!("{:<20}", "Average");
    for strategy in &report.strategies {
        let cell = report
            .summary
            .strategies
            .iter()
            .find(|avg| &avg.strategy == strategy)
            .map(|avg| format!("{:+.2}%", avg.avg_total_return))
            .unwrap_or_else(|| "n/a".to_string());
        let _ = write!(line, " | {cell:>10}");
    }
    let _ = write!(
        line,
        " | {:>10} |",
        format!("{:+.2}%", report.summary.avg_buy_hold_return)
    );
    let _ = writeln!(out, "{line}");

    for avg in &report.summary.strategies {
        let _ = writeln!(
            out,
            "  {}: avg alpha {:+.2}%, avg win rate {:.1}%, best on {}/{} instruments",
            avg.strategy,
            avg.avg_alpha,
            avg.avg_win_rate,
            avg.best_count,
            report.summary.instruments
        );
    }

    for skip in &report.skipped {
        let _ = writeln!(out, "  skipped {}: {}", skip.symbol, skip.reason);
    }
    rule(out, '=');
}

fn best_label(comparison: &Comparison) -> String {
    match comparison {
        Comparison::NoRuns => "-".to_string(),
        other => other.describe(),
    }
}

fn profit_factor_label(summary: &MetricsSummary) -> String {
    if summary.profit_factor.is_infinite() {
        "inf".to_string()
    } else {
        format!("{:.2}", summary.profit_factor)
    }
}

fn truncate(value: &str, width: usize) -> String {
    value.chars().take(width).collect()
}

/// Rounds to whole units and inserts `,` every three digits.
pub fn group_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::{group_thousands, render_report};
    use crate::backtesting::{
        BacktestReport, InstrumentBacktest, SkippedInstrument, StrategyRun,
    };
    use chrono::NaiveDate;
    use kline_domain::entities::metrics::{BacktestWindow, MetricsSummary};
    use kline_domain::services::comparison::{Comparison, CrossInstrumentSummary, StrategyAverage};
    use kline_domain::services::engine::simulator::SimulationResult;
    use kline_domain::services::ohlcv::DataQualityReport;
    use kline_domain::value_objects::trade::{CompletedTrade, ExitReason};
    use std::path::PathBuf;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).expect("date")
    }

    fn trade(day: u32, pnl_pct: f64) -> CompletedTrade {
        CompletedTrade {
            entry_date: date(3, day),
            entry_price: 10.0,
            exit_date: date(3, day + 1),
            exit_price: 10.0 * (1.0 + pnl_pct / 100.0),
            shares: 1000,
            pnl_pct,
            entry_reason: "MACD golden cross".to_string(),
            exit_reason: ExitReason::StopLoss,
        }
    }

    fn run(strategy: &str, total_return: f64, trades: Vec<CompletedTrade>) -> StrategyRun {
        StrategyRun {
            strategy: strategy.to_string(),
            signals_emitted: trades.len() * 2,
            result: SimulationResult {
                trades: trades.clone(),
                ..SimulationResult::default()
            },
            summary: MetricsSummary {
                bars_processed: 100,
                total_trades: trades.len(),
                total_return,
                buy_hold_return: 1.0,
                profit_factor: f64::INFINITY,
                final_equity: 100_000.0 * (1.0 + total_return / 100.0),
                ..MetricsSummary::default()
            },
        }
    }

    fn instrument(symbol: &str, runs: Vec<StrategyRun>, comparison: Comparison) -> InstrumentBacktest {
        InstrumentBacktest {
            symbol: symbol.to_string(),
            display_name: symbol.to_string(),
            bars: 200,
            start_index: 60,
            window: BacktestWindow {
                first_date: date(1, 2),
                last_date: date(6, 28),
                first_close: 10.0,
                last_close: 10.1,
            },
            data_quality: DataQualityReport::default(),
            runs,
            comparison,
        }
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(0.0), "0");
        assert_eq!(group_thousands(999.4), "999");
        assert_eq!(group_thousands(1_234_567.8), "1,234,568");
        assert_eq!(group_thousands(-105_230.0), "-105,230");
    }

    #[test]
    fn single_instrument_report_lists_trades_and_comparison() {
        let trades: Vec<CompletedTrade> = (1..=12).map(|day| trade(day, -3.0)).collect();
        let report = BacktestReport {
            run_id: "r".to_string(),
            run_dir: PathBuf::from("runs/r"),
            strategies: vec!["crossover".to_string(), "composite".to_string()],
            instruments: vec![instrument(
                "600519",
                vec![run("crossover", 5.0, trades), run("composite", -1.0, Vec::new())],
                Comparison::Best("crossover".to_string()),
            )],
            skipped: Vec::new(),
            summary: CrossInstrumentSummary::default(),
        };

        let text = render_report(&report, 10);
        assert!(text.contains("Backtest report: 600519"));
        assert!(text.contains("Total return:   +5.00%"));
        assert!(text.contains("Profit factor:  inf"));
        assert!(text.contains("Trades (12 total):"));
        assert!(text.contains("#10 buy"));
        assert!(!text.contains("#11 buy"));
        assert!(text.contains("... 2 more trades omitted"));
        assert!(text.contains("(stop-loss)"));
        assert!(text.contains("crossover vs buy & hold: +4.00%"));
        assert!(text.contains("Best strategy: crossover"));
        assert!(!text.contains("Multi-instrument summary"));
    }

    #[test]
    fn multi_instrument_report_has_average_row_and_skips() {
        let report = BacktestReport {
            run_id: "r".to_string(),
            run_dir: PathBuf::from("runs/r"),
            strategies: vec!["crossover".to_string(), "composite".to_string()],
            instruments: vec![
                instrument(
                    "600519",
                    vec![run("crossover", 4.0, Vec::new()), run("composite", 4.0, Vec::new())],
                    Comparison::Tie(vec!["crossover".to_string(), "composite".to_string()]),
                ),
                instrument(
                    "000001",
                    vec![run("crossover", 2.0, Vec::new()), run("composite", 6.0, Vec::new())],
                    Comparison::Best("composite".to_string()),
                ),
            ],
            skipped: vec![SkippedInstrument {
                symbol: "300750".to_string(),
                reason: "no usable bars for 300750".to_string(),
            }],
            summary: CrossInstrumentSummary {
                instruments: 2,
                strategies: vec![
                    StrategyAverage {
                        strategy: "crossover".to_string(),
                        avg_total_return: 3.0,
                        avg_alpha: 2.0,
                        avg_win_rate: 0.0,
                        best_count: 0,
                    },
                    StrategyAverage {
                        strategy: "composite".to_string(),
                        avg_total_return: 5.0,
                        avg_alpha: 4.0,
                        avg_win_rate: 0.0,
                        best_count: 1,
                    },
                ],
                avg_buy_hold_return: 1.0,
            },
        };

        let text = render_report(&report, 10);
        assert!(text.contains("Multi-instrument summary"));
        assert!(text.contains("tie (crossover = composite)"));
        let average = text
            .lines()
            .find(|line| line.starts_with("Average"))
            .expect("average row");
        assert!(average.contains("+3.00%"));
        assert!(average.contains("+5.00%"));
        assert!(text.contains("composite: avg alpha +4.00%, avg win rate 0.0%, best on 1/2 instruments"));
        assert!(text.contains("skipped 300750: no usable bars for 300750"));
    }
}
