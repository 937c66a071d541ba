use kline_application::config::Config;
use kline_application::meta::engine_label;
use std::path::PathBuf;

pub(super) fn print_config_summary(command: &str, config: &Config, out: Option<&PathBuf>) {
    println!(
        "{} cli: {} (run_id={}, instruments={}, initial_capital={})",
        engine_label(),
        command,
        config.run.run_id,
        config.instruments.len(),
        config.run.initial_capital
    );
    println!(
        "data: data_dir={}, out_dir={}",
        config.paths.data_dir.as_deref().unwrap_or("."),
        out.map(|path| path.display().to_string())
            .unwrap_or_else(|| config.paths.out_dir.clone())
    );
    println!(
        "costs: commission_rate={}, stamp_tax_rate={}",
        config.costs.commission_rate, config.costs.stamp_tax_rate
    );
    println!(
        "risk: stop_loss_pct={}, trailing_activate_pct={}, trailing_stop_pct={}, max_holding_days={}",
        config.risk.stop_loss_pct,
        config.risk.trailing_activate_pct,
        config.risk.trailing_stop_pct,
        config.risk.max_holding_days
    );
    println!("strategies: {}", config.strategies.enabled.join(", "));
}
