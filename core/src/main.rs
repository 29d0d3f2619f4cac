use clap::Parser;
use gatemq::{bootstrap, GatewayConfig, HttpGatewayServer, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "gatemq")]
#[command(about = "A synchronous HTTP request/reply gateway in front of Kafka topics")]
struct Args {
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(parse_log_level(&args.log_level))
        .init();

    let config = Arc::new(GatewayConfig::from_env()?);

    info!(
        bootstrap_servers = %config.bootstrap_servers,
        bind = %format!("{}:{}", config.host, config.port),
        request_timeout_secs = config.request_timeout_secs,
        "starting gatemq"
    );

    // The provisioner must finish before the facade accepts traffic:
    // topics exist and the readiness sentinel is in place first.
    bootstrap::run(&config).await?;

    let server = HttpGatewayServer::new(Arc::clone(&config));
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve().await {
            error!("Server error: {}", e);
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = server_handle => {
            info!("Server task completed");
        }
    }

    info!("gatemq shut down successfully");
    Ok(())
}

fn parse_log_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            warn!("Invalid log level '{}', defaulting to 'info'", level);
            tracing::Level::INFO
        }
    }
}
