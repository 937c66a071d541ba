use kline_application::backtesting::run_backtest;
use kline_application::config::load_config_with_source;
use kline_infrastructure::artifacts::FilesystemArtifactWriter;
use kline_infrastructure::market_data::CsvMarketDataRepository;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_tmp_dir(name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    std::env::temp_dir().join(format!("kline_{name}_{}_{}", std::process::id(), now))
}

fn write_daily_csv(path: &PathBuf, days: usize) {
    let start = chrono::NaiveDate::from_ymd_opt(2023, 6, 1).expect("date");
    let mut csv = String::from("date,open,high,low,close,volume\n");
    for idx in 0..days {
        let t = idx as f64;
        let close = 15.0 + 1.5 * (t / 6.0).sin();
        let open = close - 0.1 * (t / 2.0).cos();
        let date = start + chrono::Duration::days(idx as i64);
        csv.push_str(&format!(
            "{},{:.2},{:.2},{:.2},{:.2},{}\n",
            date.format("%Y%m%d"),
            open,
            open.max(close) + 0.1,
            open.min(close) - 0.1,
            close,
            50_000 + idx * 10
        ));
    }
    fs::write(path, csv).expect("write csv");
}

#[test]
fn csv_to_artifacts_end_to_end() {
    let root = unique_tmp_dir("e2e");
    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).expect("data dir");
    write_daily_csv(&data_dir.join("601318.csv"), 180);

    let config_path = root.join("backtest.toml");
    let config_toml = format!(
        r#"
[run]
run_id = "e2e"
initial_capital = 50000.0
end_of_data = "force_close"

[paths]
data_dir = "{data}"
out_dir = "{out}"

[costs]
commission_rate = 0.00025
stamp_tax_rate = 0.0005

[risk]
stop_loss_pct = -3.0
trailing_activate_pct = 2.0
trailing_stop_pct = 1.0
max_holding_days = 20

[strategies]
enabled = ["composite", "crossover"]

[data]
lookback_bars = 160

[[instruments]]
symbol = "601318"
path = "601318.csv"
"#,
        data = data_dir.display(),
        out = root.join("runs").display()
    );
    fs::write(&config_path, &config_toml).expect("write config");

    let (config, source) = load_config_with_source(&config_path).expect("load config");
    let repo = CsvMarketDataRepository::new().with_max_gap_days(config.max_gap_days());
    let writer = FilesystemArtifactWriter::new();
    let report = run_backtest(&config, &source, None, &repo, &writer).expect("backtest");

    let instrument = &report.instruments[0];
    assert_eq!(instrument.bars, 160);
    assert_eq!(instrument.start_index, 30);
    for run in &instrument.runs {
        assert!(run.result.open_position.is_none());
    }

    let run_dir = root.join("runs").join("e2e");
    for strategy in ["composite", "crossover"] {
        let dir = run_dir.join("601318").join(strategy);
        assert!(dir.join("trades.csv").exists());
        assert!(dir.join("summary.json").exists());
        let equity = fs::read_to_string(dir.join("equity.csv")).expect("equity");
        assert_eq!(equity.lines().count(), 1 + 160 - 1 - 30);
    }
    assert!(run_dir.join("logs.jsonl").exists());
    assert!(run_dir.join("comparison.json").exists());
    assert!(run_dir.join("report.txt").exists());
    assert_eq!(
        fs::read_to_string(run_dir.join("config_snapshot.toml")).expect("snapshot"),
        config_toml
    );
    assert_eq!(repo.cached_series(), 1);

    let _ = fs::remove_dir_all(&root);
}
