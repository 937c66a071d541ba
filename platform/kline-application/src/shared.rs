use crate::config::Config;
use kline_domain::entities::costs::CostModel;
use kline_domain::entities::metrics::BacktestWindow;
use kline_domain::entities::risk::RiskControls;
use kline_domain::services::engine::simulator::{EndOfDataPolicy, SimulatorConfig};
use kline_domain::services::indicators::IndicatorConfig;
use kline_domain::services::ohlcv::DataQualityReport;
use kline_domain::services::strategy::{
    CompositeStrategy, CrossoverConfig, CrossoverStrategy, ScoreTable, SignalGenerator,
    StrategyKind,
};

pub const DEFAULT_WARMUP_BARS: usize = 60;
pub const DEFAULT_MIN_BACKTEST_BARS: usize = 130;
pub const DEFAULT_LOT_SIZE: u64 = 100;

pub fn resolve_end_of_data(config: &Config) -> Result<EndOfDataPolicy, String> {
    match config
        .run
        .end_of_data
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        None | Some("mark_to_market") | Some("mark") => Ok(EndOfDataPolicy::MarkToMarket),
        Some("force_close") | Some("close") => Ok(EndOfDataPolicy::ForceClose),
        Some(other) => Err(format!(
            "run.end_of_data must be: mark_to_market | force_close (got {other})"
        )),
    }
}

pub fn resolve_simulator_config(config: &Config) -> Result<SimulatorConfig, String> {
    Ok(SimulatorConfig {
        initial_capital: config.run.initial_capital,
        costs: CostModel {
            commission_rate: config.costs.commission_rate,
            stamp_tax_rate: config.costs.stamp_tax_rate,
        },
        lot_size: config.run.lot_size.unwrap_or(DEFAULT_LOT_SIZE),
        risk: RiskControls {
            stop_loss_pct: config.risk.stop_loss_pct,
            trailing_activate_pct: config.risk.trailing_activate_pct,
            trailing_stop_pct: config.risk.trailing_stop_pct,
            max_holding_days: config.risk.max_holding_days,
        },
        end_of_data: resolve_end_of_data(config)?,
    })
}

pub fn resolve_indicator_config(config: &Config) -> IndicatorConfig {
    let defaults = IndicatorConfig::default();
    let Some(ind) = config.indicators.as_ref() else {
        return defaults;
    };
    IndicatorConfig {
        ma_short: ind.ma_short.unwrap_or(defaults.ma_short),
        ma_mid: ind.ma_mid.unwrap_or(defaults.ma_mid),
        ma_long: ind.ma_long.unwrap_or(defaults.ma_long),
        ma_slope_lookback: ind.ma_slope_lookback.unwrap_or(defaults.ma_slope_lookback),
        macd_fast: ind.macd_fast.unwrap_or(defaults.macd_fast),
        macd_slow: ind.macd_slow.unwrap_or(defaults.macd_slow),
        macd_signal: ind.macd_signal.unwrap_or(defaults.macd_signal),
        kdj_period: ind.kdj_period.unwrap_or(defaults.kdj_period),
        kdj_k_smooth: ind.kdj_k_smooth.unwrap_or(defaults.kdj_k_smooth),
        kdj_d_smooth: ind.kdj_d_smooth.unwrap_or(defaults.kdj_d_smooth),
        rsi_period: ind.rsi_period.unwrap_or(defaults.rsi_period),
        volume_ma: ind.volume_ma.unwrap_or(defaults.volume_ma),
        divergence_lookback: ind
            .divergence_lookback
            .unwrap_or(defaults.divergence_lookback),
    }
}

/// Strategies in the order they are listed under `strategies.enabled`.
pub fn build_strategies(config: &Config) -> Result<Vec<StrategyKind>, String> {
    let mut strategies = Vec::with_capacity(config.strategies.enabled.len());
    for name in &config.strategies.enabled {
        let kind = match StrategyKind::from_name(name)? {
            StrategyKind::Crossover(_) => {
                let defaults = CrossoverConfig::default();
                StrategyKind::Crossover(CrossoverStrategy::new(CrossoverConfig {
                    kdj_low_j: config.strategies.kdj_low_j.unwrap_or(defaults.kdj_low_j),
                    kdj_high_j: config.strategies.kdj_high_j.unwrap_or(defaults.kdj_high_j),
                }))
            }
            StrategyKind::Composite(_) => {
                let defaults = ScoreTable::default();
                StrategyKind::Composite(CompositeStrategy::new(ScoreTable {
                    trigger: config.strategies.composite_trigger.unwrap_or(defaults.trigger),
                    ..defaults
                }))
            }
        };
        if strategies
            .iter()
            .any(|existing: &StrategyKind| existing.name() == kind.name())
        {
            return Err(format!("strategy listed twice: {name}"));
        }
        strategies.push(kind);
    }
    Ok(strategies)
}

pub fn resolve_window_bounds(config: &Config) -> (usize, usize) {
    (
        config.run.warmup_bars.unwrap_or(DEFAULT_WARMUP_BARS),
        config
            .run
            .min_backtest_bars
            .unwrap_or(DEFAULT_MIN_BACKTEST_BARS),
    )
}

pub fn resolve_lookback(config: &Config) -> Option<usize> {
    config.data.as_ref().and_then(|data| data.lookback_bars)
}

pub fn data_quality_json(report: &DataQualityReport) -> serde_json::Value {
    serde_json::json!({
        "rows": report.rows,
        "duplicates": report.duplicates,
        "out_of_order": report.out_of_order,
        "invalid_close": report.invalid_close,
        "invalid_range": report.invalid_range,
        "gaps": report.gaps,
        "first_date": report.first_date,
        "last_date": report.last_date,
        "first_duplicate": report.first_duplicate,
        "first_out_of_order": report.first_out_of_order,
        "first_invalid_close": report.first_invalid_close,
        "first_gap": report.first_gap,
        "max_gap_days": report.max_gap_days,
    })
}

pub fn summary_meta_json(
    config: &Config,
    symbol: &str,
    strategy: &str,
    window: &BacktestWindow,
) -> serde_json::Value {
    serde_json::json!({
        "run_id": config.run.run_id,
        "symbol": symbol,
        "strategy": strategy,
        "start": window.first_date,
        "end": window.last_date,
        "initial_capital": config.run.initial_capital,
        "engine": crate::meta::engine_label(),
    })
}
