use super::crosses::{death_cross, golden_cross, kdj_lines, macd_lines};
use super::SignalGenerator;
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::signal::Signal;

pub const DOUBLE_GOLDEN_CROSS: &str = "MACD+KDJ double golden cross";
pub const DOUBLE_DEATH_CROSS: &str = "MACD+KDJ double death cross";
pub const WEAK_TREND: &str = "weak trend (below MA20)";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrossoverConfig {
    /// KDJ golden crosses only count below this J.
    pub kdj_low_j: f64,
    /// KDJ death crosses only count above this J.
    pub kdj_high_j: f64,
}

impl Default for CrossoverConfig {
    fn default() -> Self {
        Self {
            kdj_low_j: 30.0,
            kdj_high_j: 70.0,
        }
    }
}

/// MACD/KDJ crossover rules with an MA20 trend guard on entries.
#[derive(Debug, Clone, Default)]
pub struct CrossoverStrategy {
    config: CrossoverConfig,
}

impl CrossoverStrategy {
    pub fn new(config: CrossoverConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, prev: &PriceBar, cur: &PriceBar) -> Signal {
        let macd_golden = golden_cross(macd_lines(prev), macd_lines(cur));
        let macd_death = death_cross(macd_lines(prev), macd_lines(cur));
        let kdj_golden = golden_cross(kdj_lines(prev), kdj_lines(cur));
        let kdj_death = death_cross(kdj_lines(prev), kdj_lines(cur));
        let j = cur.indicators.j;

        let mut buy: Vec<String> = Vec::new();
        let mut sell: Vec<String> = Vec::new();

        if macd_golden {
            buy.push("MACD golden cross".to_string());
        }
        if macd_death {
            sell.push("MACD death cross".to_string());
        }
        if let Some(j) = j.filter(|j| kdj_golden && *j < self.config.kdj_low_j) {
            buy.push(format!("KDJ low golden cross (J={j:.0})"));
        }
        if let Some(j) = j.filter(|j| kdj_death && *j > self.config.kdj_high_j) {
            sell.push(format!("KDJ high death cross (J={j:.0})"));
        }

        let double_golden = macd_golden && kdj_golden;
        let double_death = macd_death && kdj_death;
        if double_golden {
            buy.push(DOUBLE_GOLDEN_CROSS.to_string());
        }
        if double_death {
            sell.push(DOUBLE_DEATH_CROSS.to_string());
        }

        let above_trend = match cur.indicators.ma20 {
            Some(ma20) if ma20 > 0.0 => cur.close > ma20,
            _ => true,
        };
        if !buy.is_empty() && !above_trend {
            if double_golden {
                buy.push(WEAK_TREND.to_string());
            } else {
                buy.clear();
            }
        }

        match (buy.is_empty(), sell.is_empty()) {
            (false, true) => Signal::buy(buy.join("+")),
            (true, false) => Signal::sell(sell.join("+")),
            (false, false) if double_golden => Signal::buy(buy.join("+")),
            (false, false) if double_death => Signal::sell(sell.join("+")),
            _ => Signal::none(),
        }
    }
}

impl SignalGenerator for CrossoverStrategy {
    fn name(&self) -> &str {
        "crossover"
    }

    fn generate(&self, bars: &[PriceBar]) -> Vec<Signal> {
        let mut signals = Vec::with_capacity(bars.len());
        if bars.is_empty() {
            return signals;
        }
        signals.push(Signal::none());
        for pair in bars.windows(2) {
            signals.push(self.evaluate(&pair[0], &pair[1]));
        }
        signals
    }
}

#[cfg(test)]
mod tests {
    use super::{CrossoverStrategy, DOUBLE_GOLDEN_CROSS, WEAK_TREND};
    use crate::services::strategy::SignalGenerator;
    use crate::value_objects::price_bar::PriceBar;
    use crate::value_objects::signal::SignalAction;
    use chrono::NaiveDate;

    fn bar(close: f64, macd: (f64, f64), kdj: (f64, f64, f64), ma20: Option<f64>) -> PriceBar {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).expect("date");
        let mut bar = PriceBar::new(date, close, close, close, close, 1_000);
        bar.indicators.dif = Some(macd.0);
        bar.indicators.dea = Some(macd.1);
        bar.indicators.k = Some(kdj.0);
        bar.indicators.d = Some(kdj.1);
        bar.indicators.j = Some(kdj.2);
        bar.indicators.ma20 = ma20;
        bar
    }

    #[test]
    fn macd_golden_cross_above_trend_buys() {
        let strategy = CrossoverStrategy::default();
        let prev = bar(10.0, (-0.1, 0.0), (60.0, 50.0, 80.0), Some(9.5));
        let cur = bar(10.2, (0.1, 0.0), (62.0, 52.0, 82.0), Some(9.6));
        let signal = strategy.evaluate(&prev, &cur);
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.reason, "MACD golden cross");
    }

    #[test]
    fn kdj_cross_needs_extreme_j() {
        let strategy = CrossoverStrategy::default();
        let prev = bar(10.0, (0.2, 0.1), (40.0, 45.0, 30.0), None);
        let cur = bar(10.1, (0.25, 0.12), (50.0, 46.0, 58.0), None);
        assert_eq!(strategy.evaluate(&prev, &cur).action, SignalAction::None);

        let cur = bar(10.1, (0.25, 0.12), (27.0, 26.0, 25.0), None);
        let prev = bar(10.0, (0.2, 0.1), (20.0, 25.0, 10.0), None);
        let signal = strategy.evaluate(&prev, &cur);
        assert_eq!(signal.action, SignalAction::Buy);
        assert_eq!(signal.reason, "KDJ low golden cross (J=25)");
    }

    #[test]
    fn trend_guard_drops_single_buy_below_ma20() {
        let strategy = CrossoverStrategy::default();
        let prev = bar(10.0, (-0.1, 0.0), (60.0, 50.0, 80.0), Some(11.0));
        let cur = bar(10.2, (0.1, 0.0), (62.0, 52.0, 82.0), Some(11.0));
        assert_eq!(strategy.evaluate(&prev, &cur).action, SignalAction::None);
    }

    #[test]
    fn double_golden_cross_survives_guard_as_weakened() {
        let strategy = CrossoverStrategy::default();
        let prev = bar(10.0, (-0.1, 0.0), (40.0, 45.0, 30.0), Some(11.0));
        let cur = bar(10.2, (0.1, 0.0), (50.0, 46.0, 58.0), Some(11.0));
        let signal = strategy.evaluate(&prev, &cur);
        assert_eq!(signal.action, SignalAction::Buy);
        assert!(signal.reason.contains(DOUBLE_GOLDEN_CROSS));
        assert!(signal.reason.ends_with(WEAK_TREND));
    }

    #[test]
    fn conflicting_single_crosses_cancel_out() {
        let strategy = CrossoverStrategy::default();
        // MACD golden cross together with a KDJ high death cross.
        let prev = bar(10.0, (-0.1, 0.0), (80.0, 75.0, 90.0), None);
        let cur = bar(10.2, (0.1, 0.0), (74.0, 76.0, 72.0), None);
        assert_eq!(strategy.evaluate(&prev, &cur).action, SignalAction::None);
    }

    #[test]
    fn double_death_cross_sells() {
        let strategy = CrossoverStrategy::default();
        let prev = bar(10.0, (0.1, 0.0), (80.0, 75.0, 90.0), None);
        let cur = bar(9.8, (-0.1, 0.0), (60.0, 70.0, 40.0), None);
        let signal = strategy.evaluate(&prev, &cur);
        assert_eq!(signal.action, SignalAction::Sell);
        assert_eq!(signal.reason, "MACD death cross+MACD+KDJ double death cross");
    }

    #[test]
    fn generate_never_signals_first_bar() {
        let strategy = CrossoverStrategy::default();
        let bars = vec![
            bar(10.0, (-0.1, 0.0), (60.0, 50.0, 80.0), None),
            bar(10.2, (0.1, 0.0), (62.0, 52.0, 82.0), None),
        ];
        let signals = strategy.generate(&bars);
        assert_eq!(signals.len(), 2);
        assert!(signals[0].is_none());
        assert_eq!(signals[1].action, SignalAction::Buy);
    }
}
