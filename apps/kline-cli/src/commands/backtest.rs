use kline_application::backtesting::DEFAULT_TRADES_LISTED;
use kline_application::config::load_config_with_source;
use kline_application::meta::ENGINE_NAME;
use kline_application::reporting::render_report;
use std::path::PathBuf;

pub(super) fn run_backtest(
    config_path: PathBuf,
    out: Option<PathBuf>,
    quiet: bool,
) -> Result<(), String> {
    let (config, config_toml) = load_config_with_source(&config_path)?;
    super::common::print_config_summary("backtest", &config, out.as_ref());

    let overall_start = std::time::Instant::now();
    let crate::infra::EngineDeps {
        market_data,
        artifacts,
    } = crate::infra::build_engine_deps(&config);

    let report = kline_application::backtesting::run_backtest(
        &config,
        &config_toml,
        out,
        market_data.as_ref(),
        artifacts.as_ref(),
    )?;

    if !quiet {
        let max_trades = config
            .report
            .as_ref()
            .and_then(|report| report.max_trades_listed)
            .unwrap_or(DEFAULT_TRADES_LISTED);
        println!();
        println!("{}", render_report(&report, max_trades));
    } else {
        for skipped in &report.skipped {
            println!("skipped {}: {}", skipped.symbol, skipped.reason);
        }
    }
    println!("run output: {}", report.run_dir.display());
    println!(
        "{} cli: backtest total_ms={}",
        ENGINE_NAME,
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
