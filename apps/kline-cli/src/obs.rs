//! Process-wide observability: the tracing subscriber and the optional
//! Prometheus exporter. Both are installed once, from `main`.

use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "KLINE_LOG";

/// `KLINE_LOG` wins over `--log-level`.
fn log_filter(env_value: Option<String>, log_level: &str) -> Result<EnvFilter, String> {
    let directives = env_value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| log_level.to_string());
    EnvFilter::try_new(&directives)
        .map_err(|err| format!("invalid log filter {directives:?}: {err}"))
}

/// Logs go to stderr so stdout only carries the report.
pub fn init_tracing(log_level: &str, json: bool) -> Result<(), String> {
    let filter = log_filter(std::env::var(LOG_ENV).ok(), log_level)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn parse_metrics_addr(raw: Option<&str>) -> Result<Option<SocketAddr>, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|err| format!("invalid --metrics-addr {value:?} (expected host:port): {err}")),
    }
}

#[cfg(feature = "prometheus")]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(addr) = parse_metrics_addr(metrics_addr)? else {
        return Ok(None);
    };
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter on {addr}: {err}"))?;
    tracing::info!(metrics_addr = %addr, "serving prometheus metrics");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
pub fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    match parse_metrics_addr(metrics_addr)? {
        Some(_) => {
            Err("--metrics-addr needs kline-cli built with feature `prometheus`".to_string())
        }
        None => Ok(None),
    }
}
