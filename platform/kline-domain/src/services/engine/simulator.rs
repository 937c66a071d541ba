use crate::entities::account::{Account, Position};
use crate::entities::costs::CostModel;
use crate::entities::risk::RiskControls;
use crate::services::audit::AuditEvent;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::signal::{Signal, SignalAction};
use crate::value_objects::trade::{CompletedTrade, ExitReason};
use chrono::NaiveDate;
use serde_json::json;

/// What happens to a position still open after the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EndOfDataPolicy {
    /// Keep it open; it only shows up in the final equity point.
    #[default]
    MarkToMarket,
    /// Sell it at the last close with exit reason `EndOfBacktest`.
    ForceClose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    pub costs: CostModel,
    pub lot_size: u64,
    pub risk: RiskControls,
    pub end_of_data: EndOfDataPolicy,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            costs: CostModel::default(),
            lot_size: 100,
            risk: RiskControls::default(),
            end_of_data: EndOfDataPolicy::MarkToMarket,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulationResult {
    pub trades: Vec<CompletedTrade>,
    pub equity: Vec<EquityPoint>,
    pub audit_events: Vec<AuditEvent>,
    /// Position left open at the end under `MarkToMarket`.
    pub open_position: Option<Position>,
}

impl SimulationResult {
    pub fn is_empty(&self) -> bool {
        self.equity.is_empty()
    }
}

/// All-in/all-out single-instrument simulator.
///
/// A signal observed on bar `i` executes at bar `i + 1`'s open. Risk exits
/// are checked on the execution bar before the signal and pre-empt it.
/// Every call works on a fresh [`Account`].
#[derive(Debug, Clone)]
pub struct TradeSimulator {
    config: SimulatorConfig,
    run_id: String,
    symbol: Option<String>,
    strategy: Option<String>,
}

impl TradeSimulator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            run_id: String::new(),
            symbol: None,
            strategy: None,
        }
    }

    /// Labels copied into every audit event.
    pub fn with_labels(mut self, run_id: &str, symbol: &str, strategy: &str) -> Self {
        self.run_id = run_id.to_string();
        self.symbol = Some(symbol.to_string());
        self.strategy = Some(strategy.to_string());
        self
    }

    pub fn simulate(
        &self,
        bars: &[PriceBar],
        signals: &[Signal],
        start_index: usize,
    ) -> SimulationResult {
        if bars.is_empty() || bars.len() != signals.len() {
            return SimulationResult {
                audit_events: vec![self.event(
                    None,
                    "engine",
                    "reject_input",
                    Some("misaligned_or_empty_series"),
                    json!({ "bars": bars.len(), "signals": signals.len() }),
                )],
                ..SimulationResult::default()
            };
        }

        let mut account = Account::new(self.config.initial_capital);
        let mut trades: Vec<CompletedTrade> = Vec::new();
        let mut equity: Vec<EquityPoint> = Vec::new();
        let mut events = vec![self.event(
            None,
            "engine",
            "start",
            None,
            json!({
                "bars": bars.len(),
                "start_index": start_index,
                "initial_capital": self.config.initial_capital,
                "commission_rate": self.config.costs.commission_rate,
                "stamp_tax_rate": self.config.costs.stamp_tax_rate,
                "lot_size": self.config.lot_size,
            }),
        )];

        let last = bars.len() - 1;
        for i in start_index..last {
            let exec = &bars[i + 1];

            if let Some(trade) = self.apply_risk_controls(&mut account, exec, &mut events) {
                trades.push(trade);
                equity.push(account.mark(exec.date, exec.close));
                continue;
            }

            if let Some(trade) =
                self.apply_signal(&mut account, &signals[i], bars[i].date, exec, &mut events)
            {
                trades.push(trade);
            }
            equity.push(account.mark(exec.date, exec.close));
        }

        let final_bar = &bars[last];
        if equity.last().map_or(true, |point| point.date != final_bar.date) {
            equity.push(account.mark(final_bar.date, final_bar.close));
        }

        if self.config.end_of_data == EndOfDataPolicy::ForceClose {
            let shares = account.shares();
            let fee = self.config.costs.sell_fee(final_bar.close, shares);
            if let Some(trade) = account.close_position(
                final_bar.date,
                final_bar.close,
                fee,
                ExitReason::EndOfBacktest,
            ) {
                events.push(self.event(
                    Some(final_bar.date),
                    "trade",
                    "SELL",
                    None,
                    json!({
                        "price": final_bar.close,
                        "shares": shares,
                        "fee": fee,
                        "pnl_pct": trade.pnl_pct,
                        "exit_reason": trade.exit_reason.label(),
                    }),
                ));
                trades.push(trade);
                if let Some(point) = equity.last_mut() {
                    *point = account.mark(final_bar.date, final_bar.close);
                }
            }
        }

        let final_equity = equity.last().map_or(account.cash(), |point| point.equity);
        events.push(self.event(
            Some(final_bar.date),
            "engine",
            "complete",
            None,
            json!({
                "equity_points": equity.len(),
                "trades": trades.len(),
                "final_equity": final_equity,
                "open_position": !account.is_flat(),
            }),
        ));

        SimulationResult {
            trades,
            equity,
            audit_events: events,
            open_position: account.position().cloned(),
        }
    }

    fn apply_risk_controls(
        &self,
        account: &mut Account,
        bar: &PriceBar,
        events: &mut Vec<AuditEvent>,
    ) -> Option<CompletedTrade> {
        if account.is_flat() {
            return None;
        }
        account.advance_day(bar.high);
        let position = account.position()?;
        let exit = self.config.risk.check(position, bar)?;
        let holding_days = position.holding_days;
        let shares = position.shares;

        let fee = self.config.costs.sell_fee(exit.price, shares);
        let trade = account.close_position(bar.date, exit.price, fee, exit.reason.clone())?;
        events.push(self.event(
            Some(bar.date),
            "risk",
            exit.reason.label(),
            None,
            json!({
                "price": exit.price,
                "shares": shares,
                "fee": fee,
                "holding_days": holding_days,
                "peak_gain_pct": exit.peak_gain_pct,
                "pnl_pct": trade.pnl_pct,
            }),
        ));
        Some(trade)
    }

    fn apply_signal(
        &self,
        account: &mut Account,
        signal: &Signal,
        signal_date: NaiveDate,
        bar: &PriceBar,
        events: &mut Vec<AuditEvent>,
    ) -> Option<CompletedTrade> {
        let price = bar.open;
        match signal.action {
            SignalAction::Buy if account.is_flat() => {
                let cash = account.cash();
                let shares = self
                    .config
                    .costs
                    .max_lot_shares(cash, price, self.config.lot_size);
                if shares == 0 {
                    events.push(self.event(
                        Some(bar.date),
                        "order",
                        "reject",
                        Some("insufficient_capital"),
                        json!({
                            "signal_date": signal_date,
                            "price": price,
                            "cash": cash,
                            "lot_size": self.config.lot_size,
                        }),
                    ));
                    return None;
                }
                let fee = self.config.costs.buy_fee(price, shares);
                match account.open_position(bar.date, price, shares, fee, bar.high, &signal.reason) {
                    Ok(()) => events.push(self.event(
                        Some(bar.date),
                        "trade",
                        "BUY",
                        None,
                        json!({
                            "signal_date": signal_date,
                            "price": price,
                            "shares": shares,
                            "fee": fee,
                            "reason": signal.reason,
                        }),
                    )),
                    Err(err) => events.push(self.event(
                        Some(bar.date),
                        "order",
                        "reject",
                        Some(err.as_str()),
                        json!({ "signal_date": signal_date, "price": price, "shares": shares }),
                    )),
                }
                None
            }
            SignalAction::Sell if !account.is_flat() => {
                let shares = account.shares();
                let fee = self.config.costs.sell_fee(price, shares);
                let trade = account.close_position(
                    bar.date,
                    price,
                    fee,
                    ExitReason::Signal(signal.reason.clone()),
                )?;
                events.push(self.event(
                    Some(bar.date),
                    "trade",
                    "SELL",
                    None,
                    json!({
                        "signal_date": signal_date,
                        "price": price,
                        "shares": shares,
                        "fee": fee,
                        "pnl_pct": trade.pnl_pct,
                        "reason": signal.reason,
                    }),
                ));
                Some(trade)
            }
            _ => None,
        }
    }

    fn event(
        &self,
        date: Option<NaiveDate>,
        stage: &str,
        action: &str,
        error: Option<&str>,
        details: serde_json::Value,
    ) -> AuditEvent {
        AuditEvent {
            run_id: self.run_id.clone(),
            date,
            stage: stage.to_string(),
            symbol: self.symbol.clone(),
            strategy: self.strategy.clone(),
            action: action.to_string(),
            error: error.map(|err| err.to_string()),
            details,
        }
    }
}

/// First bar index on which signals may act: the warm-up length, shortened
/// so that at least `min_window` bars remain when the series is long enough.
pub fn resolve_start_index(len: usize, warmup_bars: usize, min_window: usize) -> usize {
    warmup_bars.min(len.saturating_sub(min_window))
}

#[cfg(test)]
mod tests {
    use super::{resolve_start_index, EndOfDataPolicy, SimulatorConfig, TradeSimulator};
    use crate::value_objects::price_bar::PriceBar;
    use crate::value_objects::signal::Signal;
    use crate::value_objects::trade::ExitReason;
    use chrono::{Duration, NaiveDate};

    fn flat_bars(n: usize, price: f64) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        (0..n)
            .map(|idx| {
                PriceBar::new(start + Duration::days(idx as i64), price, price, price, price, 1_000)
            })
            .collect()
    }

    #[test]
    fn start_index_keeps_minimum_window() {
        assert_eq!(resolve_start_index(240, 60, 130), 60);
        assert_eq!(resolve_start_index(150, 60, 130), 20);
        assert_eq!(resolve_start_index(100, 60, 130), 0);
    }

    #[test]
    fn misaligned_input_yields_empty_result() {
        let simulator = TradeSimulator::new(SimulatorConfig::default());
        let bars = flat_bars(5, 10.0);
        let result = simulator.simulate(&bars, &vec![Signal::none(); 4], 0);
        assert!(result.is_empty());
        assert!(result.trades.is_empty());
        assert_eq!(result.audit_events[0].action, "reject_input");

        assert!(simulator.simulate(&[], &[], 0).is_empty());
    }

    #[test]
    fn short_series_records_single_point() {
        let simulator = TradeSimulator::new(SimulatorConfig::default());
        let bars = flat_bars(3, 10.0);
        let result = simulator.simulate(&bars, &vec![Signal::buy("x"); 3], 5);
        assert!(result.trades.is_empty());
        assert_eq!(result.equity.len(), 1);
        assert_eq!(result.equity[0].date, bars[2].date);
        assert!((result.equity[0].equity - 100_000.0).abs() < 1e-9);
    }

    #[test]
    fn one_point_per_execution_day() {
        let simulator = TradeSimulator::new(SimulatorConfig::default());
        let bars = flat_bars(10, 10.0);
        let result = simulator.simulate(&bars, &vec![Signal::none(); 10], 2);
        assert_eq!(result.equity.len(), 7);
        assert_eq!(result.equity[0].date, bars[3].date);
        assert_eq!(result.equity[6].date, bars[9].date);
    }

    #[test]
    fn open_position_is_marked_unless_forced_closed() {
        let bars = flat_bars(5, 10.0);
        let mut signals = vec![Signal::none(); 5];
        signals[0] = Signal::buy("entry");

        let marked = TradeSimulator::new(SimulatorConfig::default()).simulate(&bars, &signals, 0);
        assert!(marked.trades.is_empty());
        assert!(marked.open_position.is_some());
        let last = marked.equity.last().expect("point");
        assert_eq!(last.shares, 9_900);

        let forced = TradeSimulator::new(SimulatorConfig {
            end_of_data: EndOfDataPolicy::ForceClose,
            ..SimulatorConfig::default()
        })
        .simulate(&bars, &signals, 0);
        assert_eq!(forced.trades.len(), 1);
        assert_eq!(forced.trades[0].exit_reason, ExitReason::EndOfBacktest);
        assert!(forced.open_position.is_none());
        let last = forced.equity.last().expect("point");
        assert_eq!(last.shares, 0);
        assert!((last.equity - last.cash).abs() < 1e-9);
        assert_eq!(forced.equity.len(), marked.equity.len());
    }
}
