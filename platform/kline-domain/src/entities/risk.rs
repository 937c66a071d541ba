use crate::entities::account::Position;
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::trade::ExitReason;

/// Protective exits evaluated each execution day while a position is open.
///
/// Percentages are relative to the entry price. A non-negative
/// `stop_loss_pct`, a non-positive `trailing_activate_pct` or a zero
/// `max_holding_days` disables the corresponding rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskControls {
    pub stop_loss_pct: f64,
    pub trailing_activate_pct: f64,
    pub trailing_stop_pct: f64,
    pub max_holding_days: u32,
}

impl Default for RiskControls {
    fn default() -> Self {
        Self {
            stop_loss_pct: -3.0,
            trailing_activate_pct: 2.0,
            trailing_stop_pct: 1.0,
            max_holding_days: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskExit {
    pub reason: ExitReason,
    pub price: f64,
    /// Peak gain since entry at the time of the exit, in percent.
    pub peak_gain_pct: f64,
}

impl RiskControls {
    pub fn stop_price(&self, entry_price: f64) -> Option<f64> {
        if self.stop_loss_pct >= 0.0 {
            return None;
        }
        Some(entry_price * (1.0 + self.stop_loss_pct / 100.0))
    }

    /// Floor price once the peak gain reached the activation level.
    pub fn trailing_floor(&self, entry_price: f64, peak_price: f64) -> Option<f64> {
        if self.trailing_activate_pct <= 0.0 || entry_price <= 0.0 {
            return None;
        }
        let peak_gain = (peak_price - entry_price) / entry_price * 100.0;
        if peak_gain >= self.trailing_activate_pct {
            Some(entry_price * (1.0 + self.trailing_stop_pct / 100.0))
        } else {
            None
        }
    }

    pub fn timed_out(&self, holding_days: u32) -> bool {
        self.max_holding_days > 0 && holding_days >= self.max_holding_days
    }

    /// First matching exit for `bar`, in priority order stop-loss,
    /// trailing stop, timeout. The position's peak and holding days must
    /// already include `bar`.
    pub fn check(&self, position: &Position, bar: &PriceBar) -> Option<RiskExit> {
        let entry = position.entry_price;
        let peak_gain_pct = if entry > 0.0 {
            (position.peak_price - entry) / entry * 100.0
        } else {
            0.0
        };

        if let Some(stop) = self.stop_price(entry) {
            if bar.low <= stop {
                return Some(RiskExit {
                    reason: ExitReason::StopLoss,
                    price: stop,
                    peak_gain_pct,
                });
            }
        }

        if let Some(floor) = self.trailing_floor(entry, position.peak_price) {
            if bar.low <= floor {
                return Some(RiskExit {
                    reason: ExitReason::TrailingStop,
                    price: floor,
                    peak_gain_pct,
                });
            }
        }

        if self.timed_out(position.holding_days) {
            return Some(RiskExit {
                reason: ExitReason::Timeout,
                price: bar.open,
                peak_gain_pct,
            });
        }

        None
    }
}
