mod commands;
mod infra;
mod obs;

use clap::{Parser, Subcommand, ValueEnum};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kline")]
#[command(about = "Daily-bar A-share backtester", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  kline backtest --config configs/sample.toml --out runs/\n  kline validate --config configs/sample.toml --strict\n  KLINE_LOG=debug kline --log-format json backtest --config configs/sample.toml\n"
)]
struct Cli {
    /// Log filter used when KLINE_LOG is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    log_format: LogFormat,
    /// Expose Prometheus metrics on host:port while the command runs.
    #[arg(long, global = true)]
    metrics_addr: Option<String>,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Plain,
    Json,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run every enabled strategy over every configured instrument.
    Backtest {
        #[arg(long)]
        config: PathBuf,
        /// Base directory for run output (defaults to paths.out_dir).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Skip printing the text report to stdout.
        #[arg(long, default_value_t = false)]
        quiet: bool,
    },
    /// Load every instrument and report data quality without trading.
    Validate {
        #[arg(long)]
        config: PathBuf,
        /// Fail when any instrument exceeds the [data_quality] limits.
        #[arg(long, default_value_t = false)]
        strict: bool,
        /// Also write the JSON report to this file.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

impl From<CliCommand> for Command {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Backtest { config, out, quiet } => Command::Backtest {
                config,
                out,
                quiet,
            },
            CliCommand::Validate {
                config,
                strict,
                out,
            } => Command::Validate {
                config,
                strict,
                out,
            },
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let json_logs = cli.log_format == LogFormat::Json;
    if let Err(err) = obs::init_tracing(&cli.log_level, json_logs) {
        eprintln!("error: {}", err);
        std::process::exit(2);
    }
    if let Err(err) = obs::init_metrics(cli.metrics_addr.as_deref()) {
        eprintln!("error: {}", err);
        std::process::exit(2);
    }

    if let Err(err) = commands::run(cli.command.into()) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, CliCommand, LogFormat};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn parses_backtest_with_global_flags() {
        let cli = Cli::try_parse_from([
            "kline",
            "backtest",
            "--config",
            "configs/sample.toml",
            "--log-format",
            "json",
            "--out",
            "runs",
        ])
        .expect("parse");
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.log_level, "info");
        match cli.command {
            CliCommand::Backtest { config, out, quiet } => {
                assert_eq!(config, PathBuf::from("configs/sample.toml"));
                assert_eq!(out, Some(PathBuf::from("runs")));
                assert!(!quiet);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn validate_defaults_to_lenient() {
        let cli = Cli::try_parse_from(["kline", "validate", "--config", "a.toml"]).expect("parse");
        match cli.command {
            CliCommand::Validate { strict, out, .. } => {
                assert!(!strict);
                assert!(out.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn config_flag_is_required() {
        assert!(Cli::try_parse_from(["kline", "backtest"]).is_err());
        assert!(Cli::try_parse_from([
            "kline",
            "--log-format",
            "xml",
            "validate",
            "--config",
            "a.toml"
        ])
        .is_err());
    }
}
