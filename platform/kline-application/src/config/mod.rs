use kline_domain::services::ohlcv::DEFAULT_MAX_GAP_DAYS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub paths: PathsConfig,
    pub costs: CostsConfig,
    pub risk: RiskConfig,
    pub strategies: StrategiesConfig,
    pub data: Option<DataConfig>,
    pub indicators: Option<IndicatorsConfig>,
    pub data_quality: Option<DataQualityConfig>,
    pub report: Option<ReportConfig>,
    pub instruments: Vec<InstrumentConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub initial_capital: f64,
    /// Bars skipped before the first signal may execute.
    pub warmup_bars: Option<usize>,
    /// Bars kept in the evaluated window when the series is short.
    pub min_backtest_bars: Option<usize>,
    pub lot_size: Option<u64>,
    /// `mark_to_market` (default) or `force_close`.
    pub end_of_data: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub name: Option<String>,
    /// CSV path, relative to `paths.data_dir` when that is set.
    pub path: String,
}

impl InstrumentConfig {
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => format!("{name}({})", self.symbol),
            _ => self.symbol.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub data_dir: Option<String>,
    pub out_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CostsConfig {
    pub commission_rate: f64,
    pub stamp_tax_rate: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    pub stop_loss_pct: f64,
    pub trailing_activate_pct: f64,
    pub trailing_stop_pct: f64,
    pub max_holding_days: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StrategiesConfig {
    pub enabled: Vec<String>,
    pub kdj_low_j: Option<f64>,
    pub kdj_high_j: Option<f64>,
    /// Score a side needs before the composite strategy acts.
    pub composite_trigger: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub lookback_bars: Option<usize>,
    pub max_gap_days: Option<i64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct IndicatorsConfig {
    pub ma_short: Option<usize>,
    pub ma_mid: Option<usize>,
    pub ma_long: Option<usize>,
    pub ma_slope_lookback: Option<usize>,
    pub macd_fast: Option<usize>,
    pub macd_slow: Option<usize>,
    pub macd_signal: Option<usize>,
    pub kdj_period: Option<usize>,
    pub kdj_k_smooth: Option<usize>,
    pub kdj_d_smooth: Option<usize>,
    pub rsi_period: Option<usize>,
    pub volume_ma: Option<usize>,
    pub divergence_lookback: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DataQualityConfig {
    pub max_gaps: Option<usize>,
    pub max_duplicates: Option<usize>,
    pub max_out_of_order: Option<usize>,
    pub max_invalid_close: Option<usize>,
    pub max_invalid_range: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Write `report.txt` next to the run artifacts (default true).
    pub text: Option<bool>,
    /// Trades listed per strategy in the text report (default 10).
    pub max_trades_listed: Option<usize>,
}

impl Config {
    /// Checks values serde cannot: ranges, known strategy names and
    /// non-empty instrument lists.
    pub fn validate(&self) -> Result<(), String> {
        if self.run.run_id.trim().is_empty() {
            return Err("run.run_id must not be empty".to_string());
        }
        if !self.run.initial_capital.is_finite() || self.run.initial_capital <= 0.0 {
            return Err("run.initial_capital must be finite and > 0".to_string());
        }
        if self.run.lot_size == Some(0) {
            return Err("run.lot_size must be >= 1".to_string());
        }
        crate::shared::resolve_end_of_data(self)?;

        for (name, value) in [
            ("costs.commission_rate", self.costs.commission_rate),
            ("costs.stamp_tax_rate", self.costs.stamp_tax_rate),
        ] {
            if !value.is_finite() || !(0.0..1.0).contains(&value) {
                return Err(format!("{name} must be within [0, 1)"));
            }
        }

        for (name, value) in [
            ("risk.stop_loss_pct", self.risk.stop_loss_pct),
            ("risk.trailing_activate_pct", self.risk.trailing_activate_pct),
            ("risk.trailing_stop_pct", self.risk.trailing_stop_pct),
        ] {
            if !value.is_finite() {
                return Err(format!("{name} must be finite"));
            }
        }
        if self.risk.stop_loss_pct <= -100.0 {
            return Err("risk.stop_loss_pct must be above -100".to_string());
        }

        if self.strategies.enabled.is_empty() {
            return Err("strategies.enabled must list at least one strategy".to_string());
        }
        crate::shared::build_strategies(self)?;

        if self.instruments.is_empty() {
            return Err("at least one [[instruments]] entry is required".to_string());
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.instruments.len());
        for instrument in &self.instruments {
            let symbol = instrument.symbol.trim();
            if symbol.is_empty() {
                return Err("instruments.symbol must not be empty".to_string());
            }
            if instrument.path.trim().is_empty() {
                return Err(format!("instruments.path must not be empty ({symbol})"));
            }
            if seen.contains(&symbol) {
                return Err(format!("duplicate instrument symbol: {symbol}"));
            }
            seen.push(symbol);
        }

        if self.data.as_ref().and_then(|data| data.lookback_bars) == Some(0) {
            return Err("data.lookback_bars must be >= 1".to_string());
        }
        crate::shared::resolve_indicator_config(self).validate()
    }

    /// Calendar-day gap reported by the data-quality checks.
    pub fn max_gap_days(&self) -> i64 {
        self.data
            .as_ref()
            .and_then(|data| data.max_gap_days)
            .unwrap_or(DEFAULT_MAX_GAP_DAYS)
    }

    pub fn resolve_data_path(&self, instrument: &InstrumentConfig) -> PathBuf {
        let path = PathBuf::from(&instrument.path);
        match &self.paths.data_dir {
            Some(dir) if path.is_relative() => Path::new(dir).join(path),
            _ => path,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{to_toml_pretty, Config};
    use std::path::PathBuf;

    const MINIMAL: &str = r#"
[run]
run_id = "ashare_daily"
initial_capital = 100000.0

[paths]
data_dir = "data"
out_dir = "runs/"

[costs]
commission_rate = 0.00025
stamp_tax_rate = 0.0005

[risk]
stop_loss_pct = -3.0
trailing_activate_pct = 2.0
trailing_stop_pct = 1.0
max_holding_days = 20

[strategies]
enabled = ["crossover", "composite"]

[[instruments]]
symbol = "600519"
name = "Kweichow Moutai"
path = "600519.csv"

[[instruments]]
symbol = "000001"
path = "/srv/market/000001.csv"
"#;

    fn parse_config(toml_str: &str) -> Config {
        toml::from_str(toml_str).expect("config should parse")
    }

    #[test]
    fn parse_minimal_config() {
        let config = parse_config(MINIMAL);
        assert_eq!(config.instruments.len(), 2);
        assert_eq!(config.strategies.enabled, vec!["crossover", "composite"]);
        assert!(config.indicators.is_none());
        config.validate().expect("valid config");
    }

    #[test]
    fn parse_config_rejects_malformed_toml() {
        let err = toml::from_str::<Config>("[run\nrun_id = 1").expect_err("malformed");
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn parse_config_rejects_unknown_fields() {
        let toml_str = MINIMAL.replace(
            "max_holding_days = 20",
            "max_holding_days = 20\nmax_exposure = 1.0",
        );
        let err = toml::from_str::<Config>(&toml_str).expect_err("unknown field should fail");
        assert!(err.to_string().to_lowercase().contains("unknown field"));
    }

    #[test]
    fn data_paths_resolve_against_data_dir() {
        let config = parse_config(MINIMAL);
        assert_eq!(
            config.resolve_data_path(&config.instruments[0]),
            PathBuf::from("data").join("600519.csv")
        );
        assert_eq!(
            config.resolve_data_path(&config.instruments[1]),
            PathBuf::from("/srv/market/000001.csv")
        );
        assert_eq!(
            config.instruments[0].display_name(),
            "Kweichow Moutai(600519)"
        );
        assert_eq!(config.instruments[1].display_name(), "000001");
    }

    #[test]
    fn validate_rejects_unknown_strategy() {
        let mut config = parse_config(MINIMAL);
        config.strategies.enabled.push("momentum".to_string());
        let err = config.validate().expect_err("unknown strategy");
        assert!(err.contains("unknown strategy"));
    }

    #[test]
    fn validate_rejects_duplicate_symbols_and_bad_capital() {
        let mut config = parse_config(MINIMAL);
        config.instruments[1].symbol = "600519".to_string();
        assert!(config.validate().expect_err("dup").contains("duplicate"));

        let mut config = parse_config(MINIMAL);
        config.run.initial_capital = 0.0;
        assert!(config
            .validate()
            .expect_err("capital")
            .contains("initial_capital"));
    }

    #[test]
    fn validate_rejects_unknown_end_of_data_policy() {
        let mut config = parse_config(MINIMAL);
        config.run.end_of_data = Some("liquidate_later".to_string());
        assert!(config.validate().expect_err("policy").contains("end_of_data"));
    }

    #[test]
    fn validate_checks_indicator_windows() {
        let toml_str = format!("{MINIMAL}\n[indicators]\nmacd_fast = 20\nmacd_slow = 10\n");
        let config = parse_config(&toml_str);
        assert!(config.validate().expect_err("macd").contains("macd_fast"));
    }

    #[test]
    fn validate_rejects_zero_slope_lookback() {
        let toml_str = format!("{MINIMAL}\n[indicators]\nma_slope_lookback = 0\n");
        let config = parse_config(&toml_str);
        assert!(config
            .validate()
            .expect_err("slope lookback")
            .contains("ma_slope_lookback"));
    }

    #[test]
    fn pretty_toml_parses_back() {
        let config = parse_config(MINIMAL);
        let rendered = to_toml_pretty(&config).expect("render");
        let reparsed = parse_config(&rendered);
        assert_eq!(reparsed.instruments.len(), 2);
        assert_eq!(reparsed.run.run_id, "ashare_daily");
    }
}
