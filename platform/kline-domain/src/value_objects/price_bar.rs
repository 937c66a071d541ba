use crate::value_objects::divergence::Divergence;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Indicator values attached to a bar by the indicator layer.
///
/// `None` means the value is still warming up (or undefined for that bar).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Indicators {
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    /// Percentage change of MA20 over the slope lookback (5 bars by default).
    pub ma20_slope: Option<f64>,
    pub dif: Option<f64>,
    pub dea: Option<f64>,
    pub macd: Option<f64>,
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub j: Option<f64>,
    pub rsi: Option<f64>,
    pub vol_ma5: Option<f64>,
    pub divergence: Divergence,
}

/// One trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    #[serde(default)]
    pub indicators: Indicators,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            indicators: Indicators::default(),
        }
    }

    /// Close-to-close change versus `prev`, in percent.
    pub fn change_pct(&self, prev: &PriceBar) -> f64 {
        if prev.close <= 0.0 {
            return 0.0;
        }
        (self.close - prev.close) / prev.close * 100.0
    }
}
