//! PromptGate
//!
//! Prompt moderation gateway. Every prompt is blocked, redacted or allowed
//! according to a hot-reloadable policy, over HTTP/JSON and a minimal
//! ICAP-style TCP protocol.

use anyhow::Result;
use clap::Parser;
use promptgate_proxy::{server, ConfigOverrides, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "promptgate")]
#[command(about = "PromptGate prompt moderation gateway", long_about = None)]
struct Cli {
    /// Configuration file path (YAML, JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Policy file path
    #[arg(short, long)]
    policy: Option<String>,

    /// HTTP listen address
    #[arg(long)]
    http_listen: Option<String>,

    /// ICAP listen address
    #[arg(long)]
    icap_listen: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting PromptGate");

    let overrides = ConfigOverrides {
        policy_path: cli.policy.clone(),
        http_listen: cli.http_listen.clone(),
        icap_listen: cli.icap_listen.clone(),
    };
    let config = ServerConfig::load(cli.config.as_deref(), &overrides)?;
    info!("Configuration loaded successfully");
    info!("Policy: {}", config.policy_path);
    info!("History capacity: {}", config.history_capacity);

    if config.metrics.enabled {
        init_metrics(&config.metrics.listen)?;
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping gateways...");
        signal_token.cancel();
    });

    if let Err(e) = server::run(config, shutdown).await {
        error!(error = %e, "PromptGate failed");
        return Err(e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("promptgate=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("promptgate=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Install the Prometheus exporter with its own HTTP listener
fn init_metrics(listen: &str) -> Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid metrics listen address {}: {}", listen, e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    promptgate_telemetry::metrics::describe();

    info!(%addr, "Metrics exporter initialized");
    Ok(())
}
