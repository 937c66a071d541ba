use kline_application::config::load_config_with_source;
use std::path::PathBuf;

pub(super) fn run_validate(
    config_path: PathBuf,
    strict: bool,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let (config, _config_toml) = load_config_with_source(&config_path)?;
    super::common::print_config_summary("validate", &config, None);

    let market_data = crate::infra::build_market_data_repo(&config);
    let report = kline_application::validation::validate(&config, strict, market_data.as_ref())?;

    let pretty = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("failed to serialize validation report: {err}"))?;
    println!("{pretty}");

    if let Some(out_path) = out {
        std::fs::write(&out_path, &pretty)
            .map_err(|err| format!("failed to write report {}: {}", out_path.display(), err))?;
    }

    Ok(())
}
