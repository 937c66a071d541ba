use chrono::NaiveDate;
use kline_domain::repositories::market_data::{MarketDataRepository, OhlcvQuery};
use kline_domain::services::ohlcv::{
    data_quality_from_bars, prices_are_valid, DataQualityReport, DEFAULT_MAX_GAP_DAYS,
};
use kline_domain::value_objects::price_bar::PriceBar;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Deserialize)]
pub struct DailyBarRecord {
    #[serde(alias = "trade_date")]
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(alias = "vol")]
    pub volume: f64,
}

pub fn load_csv(path: &Path) -> Result<(Vec<PriceBar>, DataQualityReport), String> {
    load_csv_with_gap(path, DEFAULT_MAX_GAP_DAYS)
}

/// Reads a daily OHLCV CSV. Rows are sorted by date and de-duplicated with
/// the last row winning; rows with a non-finite or non-positive price are
/// dropped and counted under `invalid_close`.
pub fn load_csv_with_gap(
    path: &Path,
    max_gap_days: i64,
) -> Result<(Vec<PriceBar>, DataQualityReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open OHLCV CSV {}: {}", path.display(), err))?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut bars_by_date: BTreeMap<NaiveDate, PriceBar> = BTreeMap::new();
    let mut parsed = DataQualityReport::default();
    let mut last_seen: Option<NaiveDate> = None;

    for (row, result) in reader.deserialize::<DailyBarRecord>().enumerate() {
        let record = result.map_err(|err| {
            format!("failed to parse CSV row {} in {}: {}", row + 1, path.display(), err)
        })?;
        parsed.rows += 1;
        let date = parse_date(&record.date)?;

        if !prices_are_valid(record.open, record.high, record.low, record.close) {
            parsed.invalid_close += 1;
            parsed.first_invalid_close.get_or_insert(date);
            continue;
        }

        if last_seen.is_some_and(|prev| date < prev) {
            parsed.out_of_order += 1;
            parsed.first_out_of_order.get_or_insert(date);
        }
        last_seen = Some(date);

        let volume = if record.volume.is_finite() && record.volume > 0.0 {
            record.volume.round() as u64
        } else {
            0
        };
        let bar = PriceBar::new(
            date,
            record.open,
            record.high,
            record.low,
            record.close,
            volume,
        );
        if bars_by_date.insert(date, bar).is_some() {
            parsed.duplicates += 1;
            parsed.first_duplicate.get_or_insert(date);
        }
    }

    let bars: Vec<PriceBar> = bars_by_date.into_values().collect();
    let mut report = data_quality_from_bars(&bars, max_gap_days);
    report.merge_parse_stage(&parsed);

    Ok((bars, report))
}

/// Accepts `YYYY-MM-DD`, `YYYYMMDD` and `YYYY/MM/DD`, optionally followed by
/// a time part which is ignored.
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    let day = value
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(value)
        .trim();
    for format in ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(day, format) {
            return Ok(date);
        }
    }
    Err(format!("unsupported date format: {value}"))
}

type CachedSeries = (Vec<PriceBar>, DataQualityReport);

/// CSV-backed repository. Parsed series are cached per query for the
/// lifetime of the instance.
#[derive(Debug)]
pub struct CsvMarketDataRepository {
    max_gap_days: i64,
    cache: Mutex<HashMap<OhlcvQuery, CachedSeries>>,
}

impl Default for CsvMarketDataRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvMarketDataRepository {
    pub fn new() -> Self {
        Self {
            max_gap_days: DEFAULT_MAX_GAP_DAYS,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_gap_days(mut self, max_gap_days: i64) -> Self {
        self.max_gap_days = max_gap_days;
        self
    }

    pub fn cached_series(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn load_ohlcv(&self, query: &OhlcvQuery) -> Result<(Vec<PriceBar>, DataQualityReport), String> {
        if let Some(hit) = self.cache.lock().get(query) {
            metrics::counter!("kline.infra.ohlcv.cache_total", "result" => "hit").increment(1);
            return Ok(hit.clone());
        }
        metrics::counter!("kline.infra.ohlcv.cache_total", "result" => "miss").increment(1);

        let start = Instant::now();
        let (mut bars, report) = load_csv_with_gap(&query.path, self.max_gap_days)
            .map_err(|err| format!("{}: {err}", query.symbol))?;
        if let Some(lookback) = query.lookback_bars {
            if bars.len() > lookback {
                bars.drain(..bars.len() - lookback);
            }
        }
        metrics::histogram!("kline.infra.ohlcv.load_ms").record(start.elapsed().as_millis() as f64);
        tracing::debug!(
            symbol = %query.symbol,
            path = %query.path.display(),
            bars = bars.len(),
            duplicates = report.duplicates,
            invalid_close = report.invalid_close,
            "loaded daily bars"
        );

        self.cache
            .lock()
            .insert(query.clone(), (bars.clone(), report.clone()));
        Ok((bars, report))
    }
}
