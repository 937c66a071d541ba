use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// Strategy sell; carries the signal's reason text.
    Signal(String),
    StopLoss,
    TrailingStop,
    Timeout,
    EndOfBacktest,
}

impl ExitReason {
    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::Signal(_) => "signal",
            ExitReason::StopLoss => "stop-loss",
            ExitReason::TrailingStop => "trailing-stop",
            ExitReason::Timeout => "timeout",
            ExitReason::EndOfBacktest => "end-of-backtest",
        }
    }

    pub fn is_risk_exit(&self) -> bool {
        matches!(
            self,
            ExitReason::StopLoss | ExitReason::TrailingStop | ExitReason::Timeout
        )
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal(reason) if !reason.is_empty() => write!(f, "signal: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// A closed round trip. `pnl_pct` is the gross price change, costs excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub shares: u64,
    pub pnl_pct: f64,
    pub entry_reason: String,
    pub exit_reason: ExitReason,
}

impl CompletedTrade {
    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }

    /// Zero P&L counts as a loss.
    pub fn is_win(&self) -> bool {
        self.pnl_pct > 0.0
    }
}
