mod backend;
mod billing;
mod config;
mod entitlement;
mod rpc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stable-core")]
#[command(about = "Stable Core - Entitlement engine for the MyHorseManager client")]
struct Cli {
    #[arg(long, default_value = "http")]
    mode: String,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value = "21480")]
    port: u16,

    /// Config file path (defaults to the user config dir)
    #[arg(long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = config::AppConfig::load(cli.config.as_deref())?;

    match cli.mode.as_str() {
        "http" => {
            tracing::info!(
                "Starting stable-core HTTP server on {}:{}",
                cli.host,
                cli.port
            );
            rpc::run_http_server(&cli.host, cli.port, config).await
        }
        "stdio" => {
            tracing::info!("Starting stable-core JSON-RPC server (stdio mode)");
            rpc::run_stdio_server(config).await
        }
        _ => {
            anyhow::bail!("Invalid mode: {}. Use 'http' or 'stdio'", cli.mode)
        }
    }
}
