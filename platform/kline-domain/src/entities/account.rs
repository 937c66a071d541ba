use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade::{CompletedTrade, ExitReason};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: u64,
    pub entry_reason: String,
    /// Highest intraday high since entry.
    pub peak_price: f64,
    pub holding_days: u32,
}

/// Single-instrument cash/shares ledger holding at most one position.
#[derive(Debug, Clone)]
pub struct Account {
    cash: f64,
    position: Option<Position>,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            position: None,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn shares(&self) -> u64 {
        self.position.as_ref().map_or(0, |position| position.shares)
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn equity(&self, close: f64) -> f64 {
        self.cash + self.shares() as f64 * close
    }

    pub fn mark(&self, date: NaiveDate, close: f64) -> EquityPoint {
        EquityPoint {
            date,
            equity: self.equity(close),
            cash: self.cash,
            shares: self.shares(),
            close,
        }
    }

    /// Debits `price * shares + fee` and opens a position whose peak starts
    /// at `peak_price`.
    pub fn open_position(
        &mut self,
        date: NaiveDate,
        price: f64,
        shares: u64,
        fee: f64,
        peak_price: f64,
        reason: &str,
    ) -> Result<(), String> {
        if self.position.is_some() {
            return Err("position already open".to_string());
        }
        if shares == 0 {
            return Err("share count must be positive".to_string());
        }
        let cost = price * shares as f64 + fee;
        if !cost.is_finite() || cost > self.cash + 1e-6 {
            return Err(format!(
                "insufficient capital: cost {cost:.2} exceeds cash {:.2}",
                self.cash
            ));
        }
        self.cash = (self.cash - cost).max(0.0);
        self.position = Some(Position {
            entry_date: date,
            entry_price: price,
            shares,
            entry_reason: reason.to_string(),
            peak_price,
            holding_days: 0,
        });
        Ok(())
    }

    /// Counts one more holding day and raises the peak with `high`.
    pub fn advance_day(&mut self, high: f64) {
        if let Some(position) = self.position.as_mut() {
            position.holding_days += 1;
            if high > position.peak_price {
                position.peak_price = high;
            }
        }
    }

    /// Credits `price * shares - fee` and returns the completed round trip.
    pub fn close_position(
        &mut self,
        date: NaiveDate,
        price: f64,
        fee: f64,
        reason: ExitReason,
    ) -> Option<CompletedTrade> {
        let position = self.position.take()?;
        self.cash += price * position.shares as f64 - fee;
        let pnl_pct = if position.entry_price > 0.0 {
            (price - position.entry_price) / position.entry_price * 100.0
        } else {
            0.0
        };
        Some(CompletedTrade {
            entry_date: position.entry_date,
            entry_price: position.entry_price,
            exit_date: date,
            exit_price: price,
            shares: position.shares,
            pnl_pct,
            entry_reason: position.entry_reason,
            exit_reason: reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Account;
    use crate::value_objects::trade::ExitReason;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).expect("date")
    }

    #[test]
    fn open_then_close_updates_cash_and_returns_trade() {
        let mut account = Account::new(10_000.0);
        account
            .open_position(day(6), 10.0, 900, 2.25, 10.5, "buy")
            .expect("open");
        assert_eq!(account.shares(), 900);
        assert!((account.cash() - (10_000.0 - 9_000.0 - 2.25)).abs() < 1e-9);
        assert!((account.equity(11.0) - (account.cash() + 9_900.0)).abs() < 1e-9);

        let trade = account
            .close_position(day(8), 11.0, 7.425, ExitReason::Signal("sell".to_string()))
            .expect("trade");
        assert!(account.is_flat());
        assert_eq!(trade.shares, 900);
        assert!((trade.pnl_pct - 10.0).abs() < 1e-9);
        assert!((account.cash() - (997.75 + 9_900.0 - 7.425)).abs() < 1e-9);
    }

    #[test]
    fn second_position_is_rejected() {
        let mut account = Account::new(10_000.0);
        account
            .open_position(day(6), 10.0, 100, 0.0, 10.0, "first")
            .expect("open");
        let err = account
            .open_position(day(7), 10.0, 100, 0.0, 10.0, "second")
            .expect_err("already open");
        assert!(err.contains("already open"));
        assert_eq!(account.shares(), 100);
    }

    #[test]
    fn open_rejects_unaffordable_cost() {
        let mut account = Account::new(50.0);
        let err = account
            .open_position(day(6), 100.0, 100, 2.5, 100.0, "buy")
            .expect_err("insufficient");
        assert!(err.contains("insufficient capital"));
        assert!((account.cash() - 50.0).abs() < 1e-12);
        assert!(account.is_flat());
    }

    #[test]
    fn advance_day_tracks_peak_and_days() {
        let mut account = Account::new(10_000.0);
        account
            .open_position(day(6), 10.0, 100, 0.0, 10.2, "buy")
            .expect("open");
        account.advance_day(10.1);
        account.advance_day(10.8);
        let position = account.position().expect("position");
        assert_eq!(position.holding_days, 2);
        assert!((position.peak_price - 10.8).abs() < 1e-12);
    }

    #[test]
    fn close_without_position_is_none() {
        let mut account = Account::new(1_000.0);
        assert!(account
            .close_position(day(6), 10.0, 0.0, ExitReason::Timeout)
            .is_none());
    }
}
