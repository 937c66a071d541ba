use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::trade::CompletedTrade;
use chrono::NaiveDate;

/// Performance record of one simulation run. Percent fields are already
/// scaled by 100.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSummary {
    pub bars_processed: usize,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_return: f64,
    pub annual_return: f64,
    pub max_drawdown: f64,
    /// `f64::INFINITY` when there are winning trades and no losing P&L.
    pub profit_factor: f64,
    pub avg_holding_days: f64,
    pub buy_hold_return: f64,
    pub final_equity: f64,
}

impl MetricsSummary {
    /// Excess return over buy-and-hold, in percentage points.
    pub fn alpha(&self) -> f64 {
        self.total_return - self.buy_hold_return
    }

    pub fn is_empty(&self) -> bool {
        self.bars_processed == 0
    }
}

/// Dates and closes bounding the evaluated range: the bar at the start
/// index and the last bar of the series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestWindow {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub first_close: f64,
    pub last_close: f64,
}

impl BacktestWindow {
    pub fn from_bars(bars: &[PriceBar], start_index: usize) -> Option<Self> {
        let first = bars.get(start_index)?;
        let last = bars.last()?;
        Some(Self {
            first_date: first.date,
            last_date: last.date,
            first_close: first.close,
            last_close: last.close,
        })
    }

    pub fn days_elapsed(&self) -> i64 {
        (self.last_date - self.first_date).num_days()
    }

    pub fn buy_hold_return(&self) -> f64 {
        if self.first_close <= 0.0 {
            return 0.0;
        }
        (self.last_close / self.first_close - 1.0) * 100.0
    }
}

pub fn compute_metrics(
    trades: &[CompletedTrade],
    equity: &[EquityPoint],
    window: &BacktestWindow,
    initial_capital: f64,
) -> MetricsSummary {
    let Some(last) = equity.last() else {
        return MetricsSummary::default();
    };

    let final_equity = last.equity;
    let ratio = if initial_capital > 0.0 {
        final_equity / initial_capital
    } else {
        1.0
    };
    let total_return = (ratio - 1.0) * 100.0;

    let days = window.days_elapsed();
    let annual_return = if days > 0 && ratio > 0.0 {
        (ratio.powf(365.0 / days as f64) - 1.0) * 100.0
    } else {
        0.0
    };

    let wins = trades.iter().filter(|trade| trade.is_win()).count();
    let losses = trades.len() - wins;
    let win_rate = if trades.is_empty() {
        0.0
    } else {
        wins as f64 / trades.len() as f64 * 100.0
    };

    let gross_profit: f64 = trades
        .iter()
        .filter(|trade| trade.is_win())
        .map(|trade| trade.pnl_pct)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|trade| !trade.is_win())
        .map(|trade| trade.pnl_pct)
        .sum::<f64>()
        .abs();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    let avg_holding_days = if trades.is_empty() {
        0.0
    } else {
        trades
            .iter()
            .map(|trade| trade.holding_days() as f64)
            .sum::<f64>()
            / trades.len() as f64
    };

    MetricsSummary {
        bars_processed: equity.len(),
        total_trades: trades.len(),
        wins,
        losses,
        win_rate,
        total_return,
        annual_return,
        max_drawdown: max_drawdown_pct(equity),
        profit_factor,
        avg_holding_days,
        buy_hold_return: window.buy_hold_return(),
        final_equity,
    }
}

/// Largest peak-to-trough decline in percent of the running peak, which
/// starts at the first point.
pub fn max_drawdown_pct(equity: &[EquityPoint]) -> f64 {
    let Some(first) = equity.first() else {
        return 0.0;
    };
    let mut peak = first.equity;
    let mut max_drawdown = 0.0f64;
    for point in equity {
        if point.equity > peak {
            peak = point.equity;
        }
        if peak > 0.0 {
            let drawdown = (peak - point.equity) / peak * 100.0;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }
    }
    max_drawdown
}
