pub mod rolling;

use crate::services::divergence::detect_divergence;
use crate::value_objects::price_bar::{Indicators, PriceBar};
use rolling::{RecursiveEma, RollingRange, RollingRsi, RollingSma};

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub ma_short: usize,
    pub ma_mid: usize,
    pub ma_long: usize,
    pub ma_slope_lookback: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub kdj_period: usize,
    pub kdj_k_smooth: usize,
    pub kdj_d_smooth: usize,
    pub rsi_period: usize,
    pub volume_ma: usize,
    /// Bars before the current one scanned for MACD divergence.
    pub divergence_lookback: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_short: 5,
            ma_mid: 10,
            ma_long: 20,
            ma_slope_lookback: 5,
            macd_fast: 8,
            macd_slow: 17,
            macd_signal: 9,
            kdj_period: 6,
            kdj_k_smooth: 3,
            kdj_d_smooth: 3,
            rsi_period: 14,
            volume_ma: 5,
            divergence_lookback: 30,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Result<(), String> {
        let windows = [
            ("ma_short", self.ma_short),
            ("ma_mid", self.ma_mid),
            ("ma_long", self.ma_long),
            ("ma_slope_lookback", self.ma_slope_lookback),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("kdj_period", self.kdj_period),
            ("kdj_k_smooth", self.kdj_k_smooth),
            ("kdj_d_smooth", self.kdj_d_smooth),
            ("rsi_period", self.rsi_period),
            ("volume_ma", self.volume_ma),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(format!("indicators.{name} must be positive"));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(format!(
                "indicators.macd_fast ({}) must be below macd_slow ({})",
                self.macd_fast, self.macd_slow
            ));
        }
        Ok(())
    }
}

/// Computes every indicator column in place, oldest bar first.
///
/// Values only depend on the bar itself and earlier bars.
pub fn compute_indicators(bars: &mut [PriceBar], config: &IndicatorConfig) {
    let mut ma_short = RollingSma::new(config.ma_short);
    let mut ma_mid = RollingSma::new(config.ma_mid);
    let mut ma_long = RollingSma::new(config.ma_long);
    let mut vol_ma = RollingSma::new(config.volume_ma);
    let mut ema_fast = RecursiveEma::with_span(config.macd_fast);
    let mut ema_slow = RecursiveEma::with_span(config.macd_slow);
    let mut dea_ema = RecursiveEma::with_span(config.macd_signal);
    let mut range = RollingRange::new(config.kdj_period);
    let mut k_smooth = RecursiveEma::with_period(config.kdj_k_smooth);
    let mut d_smooth = RecursiveEma::with_period(config.kdj_d_smooth);
    let mut rsi = RollingRsi::new(config.rsi_period);
    let mut ma_long_history: Vec<Option<f64>> = Vec::with_capacity(bars.len());

    for idx in 0..bars.len() {
        let bar = &bars[idx];
        let close = bar.close;

        let ma20 = ma_long.update(close);
        let ma20_slope = idx
            .checked_sub(config.ma_slope_lookback)
            .filter(|prev_idx| *prev_idx < idx)
            .and_then(|prev_idx| ma_long_history[prev_idx])
            .zip(ma20)
            .and_then(|(prev, current)| {
                (prev != 0.0).then(|| (current - prev) / prev * 100.0)
            });
        ma_long_history.push(ma20);

        let dif = ema_fast.update(close) - ema_slow.update(close);
        let dea = dea_ema.update(dif);

        let (k, d) = match range.update(bar.high, bar.low) {
            Some((lowest, highest)) if highest > lowest => {
                let rsv = (close - lowest) / (highest - lowest) * 100.0;
                let k = k_smooth.update(rsv);
                (Some(k), Some(d_smooth.update(k)))
            }
            _ => (k_smooth.current(), d_smooth.current()),
        };

        let indicators = Indicators {
            ma5: ma_short.update(close),
            ma10: ma_mid.update(close),
            ma20,
            ma20_slope,
            dif: Some(dif),
            dea: Some(dea),
            macd: Some(2.0 * (dif - dea)),
            k,
            d,
            j: k.zip(d).map(|(k, d)| 3.0 * k - 2.0 * d),
            rsi: rsi.update(close),
            vol_ma5: vol_ma.update(bar.volume as f64),
            divergence: Default::default(),
        };
        bars[idx].indicators = indicators;
    }

    let lookback = config.divergence_lookback;
    if lookback == 0 {
        return;
    }
    for idx in lookback..bars.len() {
        let tag = detect_divergence(&bars[idx - lookback..=idx]);
        bars[idx].indicators.divergence = tag;
    }
}
