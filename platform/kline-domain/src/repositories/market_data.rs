use crate::services::ohlcv::DataQualityReport;
use crate::value_objects::price_bar::PriceBar;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OhlcvQuery {
    pub symbol: String,
    pub path: PathBuf,
    /// Keep only the most recent N bars.
    pub lookback_bars: Option<usize>,
}

pub trait MarketDataRepository {
    /// Daily bars ascending by date, without indicator values.
    fn load_ohlcv(&self, query: &OhlcvQuery) -> Result<(Vec<PriceBar>, DataQualityReport), String>;
}
