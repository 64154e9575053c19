//! `copilot-relay` binary.

mod config;

use clap::{Parser, Subcommand};
use config::RelayConfig;
use relay_core::ModelSelector;
use relay_gateway::GatewayServer;
use relay_upstream::{ChatBackend, CopilotClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "copilot-relay", about = "HTTP relay for Copilot chat")]
struct Cli {
    /// Path to config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Send one message upstream and print the aggregated response
    Ask {
        /// The message to send
        message: String,
        /// Model selector: default, think-deeper or gpt-5
        #[arg(short, long, default_value = "default")]
        model: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = RelayConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            let backend = Arc::new(CopilotClient::new(&config.upstream)?);
            let app = GatewayServer::build(backend);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!(
                upstream = %config.upstream.http_base_url,
                timeout_secs = config.upstream.timeout_secs,
                "Copilot relay listening on {addr}"
            );
            axum::serve(listener, app).await?;
        }
        Commands::Ask { message, model } => {
            let model: ModelSelector = model.parse()?;
            let client = CopilotClient::new(&config.upstream)?;
            let response = client.chat(&message, model).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
