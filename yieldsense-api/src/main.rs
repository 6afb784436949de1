//! YieldSense liquidity API server

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yieldsense_api::{api, LightRpcClient, ServiceConfig};

#[derive(Parser)]
#[command(name = "yieldsense-api")]
#[command(about = "Orca Whirlpools position and swap transaction API")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "yieldsense.toml")]
    config: String,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_found = std::path::Path::new(&cli.config).exists();
    let mut config = if config_found {
        ServiceConfig::from_file(&cli.config)?
    } else {
        ServiceConfig::default()
    };
    config.apply_env_overrides();

    if let Some(log_level) = cli.log_level {
        config.monitoring.log_level = log_level;
    }

    init_logging(&config);

    if !config_found {
        warn!("Config file not found, using defaults: {}", cli.config);
    }

    config.check()?;
    info!("Starting YieldSense API");
    info!("RPC endpoint: {}", config.rpc.url);
    info!("Whirlpool program: {}", config.whirlpools.program_id);
    info!("Private relay: {}", config.trading.use_private_relay);

    if cli.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    let chain = Arc::new(LightRpcClient::new(&config.rpc));
    let state = api::ApiState::new(chain, &config)?;
    let api_server = api::start_server(state, &config.api).await?;

    info!("API started successfully. Press Ctrl+C to shutdown.");
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
        result = api_server => {
            if let Err(e) = result {
                error!("API server task error: {}", e);
            }
        }
    }

    info!("Shutting down YieldSense API");
    Ok(())
}

fn init_logging(config: &ServiceConfig) {
    let log_level = config
        .monitoring
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("yieldsense_api={},tower_http=info", log_level).into());

    if config.monitoring.structured_logging {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
