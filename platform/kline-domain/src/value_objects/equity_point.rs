use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Mark-to-market snapshot: `equity == cash + shares * close`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
    pub cash: f64,
    pub shares: u64,
    pub close: f64,
}
