//! CLI module for vipgate-server.
//!
//! This module provides the command-line interface that can be used either
//! as a standalone binary or as a subcommand of the main vipgate CLI.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vipgate_config::{
    CliOverrides, LoggingConfig, apply_overrides, load_config_or_default, validate_config,
};

use crate::{CancellationToken, run_with_shutdown};

/// Server CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "vipgate-server", version, about = "VIP subscription bots")]
pub struct ServerArgs {
    /// Config file path (json/jsonc/yaml/toml). Env and flags alone suffice.
    #[arg(short, long, env = "VIPGATE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: CliOverrides,
}

/// Run the bots with the given arguments.
///
/// Configuration is loaded and validated before any task starts, so a
/// missing token or id exits non-zero without side effects.
pub async fn run(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, &args.overrides);
    validate_config(&config)?;

    init_tracing(&config.logging);

    if let Some(listen) = &config.metrics.listen {
        match vipgate_metrics::init_prometheus(listen) {
            Ok(()) => info!(listen = %listen, "metrics exporter listening"),
            Err(e) => warn!(error = %e, "failed to start metrics exporter"),
        }
    }

    // Set up graceful shutdown on SIGTERM/SIGINT
    let shutdown = CancellationToken::new();
    let shutdown_signal = shutdown.clone();

    tokio::spawn(async move {
        shutdown_signal_handler().await;
        info!("shutdown signal received");
        shutdown_signal.cancel();
    });

    run_with_shutdown(config, shutdown).await?;
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal_handler() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Initialize tracing subscriber with the given logging configuration.
///
/// Supports:
/// - `level`: Base log level (trace, debug, info, warn, error)
/// - `format`: Output format (json, pretty, compact). Default: pretty
/// - `output`: Output target (stdout, stderr). Default: stderr
/// - `filters`: Per-module log level overrides
fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(filter_directives(config))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = config.format.as_deref().unwrap_or("pretty");
    let output = config.output.as_deref().unwrap_or("stderr");

    match (format, output) {
        ("json", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stdout))
                .init();
        }
        ("json", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(io::stderr))
                .init();
        }
        ("compact", "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stdout))
                .init();
        }
        ("compact", _) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
        (_, "stdout") => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stdout))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(io::stderr))
                .init();
        }
    }
}

/// Base level followed by `module=level` overrides, sorted for stable output.
fn filter_directives(config: &LoggingConfig) -> String {
    let mut directives = config.level.as_deref().unwrap_or("info").to_string();
    let mut filters: Vec<_> = config.filters.iter().collect();
    filters.sort();
    for (module, level) in filters {
        directives.push(',');
        directives.push_str(module);
        directives.push('=');
        directives.push_str(level);
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_env_style_flags() {
        let args = ServerArgs::try_parse_from([
            "vipgate-server",
            "--main-token",
            "123:abc",
            "--admin-id",
            "42",
            "--vip-channel-id",
            "-1001234",
            "--port",
            "8080",
        ])
        .unwrap();
        assert!(args.config.is_none());
        assert_eq!(args.overrides.admin_id, Some(42));
        assert_eq!(args.overrides.vip_channel_id, Some(-1001234));
        assert_eq!(args.overrides.port, Some(8080));
    }

    #[test]
    fn directives_include_module_filters() {
        let mut config = LoggingConfig {
            level: Some("warn".into()),
            ..Default::default()
        };
        assert_eq!(filter_directives(&config), "warn");

        config.filters.insert("vipgate_store".into(), "debug".into());
        config.filters.insert("sqlx".into(), "error".into());
        assert_eq!(
            filter_directives(&config),
            "warn,sqlx=error,vipgate_store=debug"
        );
    }
}
