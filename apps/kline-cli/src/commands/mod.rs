mod backtest;
mod common;
mod validate;

use std::path::PathBuf;
use std::time::Instant;

pub enum Command {
    Backtest {
        config: PathBuf,
        out: Option<PathBuf>,
        quiet: bool,
    },
    Validate {
        config: PathBuf,
        strict: bool,
        out: Option<PathBuf>,
    },
}

impl Command {
    fn label(&self) -> &'static str {
        match self {
            Command::Backtest { .. } => "backtest",
            Command::Validate { .. } => "validate",
        }
    }
}

pub fn run(command: Command) -> Result<(), String> {
    let label = command.label();
    let start = Instant::now();
    let result = match command {
        Command::Backtest { config, out, quiet } => backtest::run_backtest(config, out, quiet),
        Command::Validate {
            config,
            strict,
            out,
        } => validate::run_validate(config, strict, out),
    };
    let outcome = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!("kline.cli.commands_total", "command" => label, "result" => outcome)
        .increment(1);
    metrics::histogram!("kline.cli.command_ms", "command" => label)
        .record(start.elapsed().as_millis() as f64);
    result
}
