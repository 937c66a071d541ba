use crate::config::Config;
use crate::shared::{data_quality_json, resolve_lookback};
use kline_domain::repositories::market_data::{MarketDataRepository, OhlcvQuery};
use kline_domain::services::ohlcv::DataQualityReport;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityLimits {
    pub max_gaps: usize,
    pub max_duplicates: usize,
    pub max_out_of_order: usize,
    pub max_invalid_close: usize,
    pub max_invalid_range: usize,
}

impl QualityLimits {
    pub fn from_config(config: &Config) -> Self {
        let limits = config.data_quality.as_ref();
        Self {
            max_gaps: limits.and_then(|l| l.max_gaps).unwrap_or(0),
            max_duplicates: limits.and_then(|l| l.max_duplicates).unwrap_or(0),
            max_out_of_order: limits.and_then(|l| l.max_out_of_order).unwrap_or(0),
            max_invalid_close: limits.and_then(|l| l.max_invalid_close).unwrap_or(0),
            max_invalid_range: limits.and_then(|l| l.max_invalid_range).unwrap_or(0),
        }
    }

    pub fn exceeded_by(&self, report: &DataQualityReport) -> bool {
        report.gaps > self.max_gaps
            || report.duplicates > self.max_duplicates
            || report.out_of_order > self.max_out_of_order
            || report.invalid_close > self.max_invalid_close
            || report.invalid_range > self.max_invalid_range
    }
}

/// Checks the config and every instrument's data. In strict mode any
/// instrument over the `[data_quality]` limits fails the whole call.
pub fn validate(
    config: &Config,
    strict: bool,
    market_data: &dyn MarketDataRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate",
        strict = strict,
        run_id = %config.run.run_id,
        instruments = config.instruments.len()
    )
    .entered();

    config.validate()?;
    let limits = QualityLimits::from_config(config);
    let stage_start = Instant::now();

    let mut instruments = Vec::with_capacity(config.instruments.len());
    let mut failing: Vec<String> = Vec::new();
    for instrument in &config.instruments {
        let (bars, report) = market_data.load_ohlcv(&OhlcvQuery {
            symbol: instrument.symbol.clone(),
            path: config.resolve_data_path(instrument),
            lookback_bars: resolve_lookback(config),
        })?;
        let exceeded = limits.exceeded_by(&report);
        if exceeded {
            failing.push(instrument.symbol.clone());
        }
        if bars.is_empty() {
            tracing::warn!(symbol = %instrument.symbol, "no usable bars");
        }

        metrics::gauge!("kline.validate.ohlcv.gaps", "symbol" => instrument.symbol.clone())
            .set(report.gaps as f64);
        metrics::gauge!("kline.validate.ohlcv.duplicates", "symbol" => instrument.symbol.clone())
            .set(report.duplicates as f64);
        metrics::gauge!("kline.validate.ohlcv.invalid_close", "symbol" => instrument.symbol.clone())
            .set(report.invalid_close as f64);

        instruments.push(serde_json::json!({
            "symbol": instrument.symbol,
            "path": config.resolve_data_path(instrument).display().to_string(),
            "bars": bars.len(),
            "ohlcv": data_quality_json(&report),
            "within_limits": !exceeded,
        }));
    }
    metrics::histogram!("kline.validate.load_ohlcv_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    if strict && !failing.is_empty() {
        return Err(format!(
            "strict validation failed: data quality limits exceeded for {}",
            failing.join(", ")
        ));
    }

    Ok(serde_json::json!({
        "run_id": config.run.run_id,
        "instruments": instruments,
        "limits": {
            "max_gaps": limits.max_gaps,
            "max_duplicates": limits.max_duplicates,
            "max_out_of_order": limits.max_out_of_order,
            "max_invalid_close": limits.max_invalid_close,
            "max_invalid_range": limits.max_invalid_range,
        },
        "strict": strict,
    }))
}
