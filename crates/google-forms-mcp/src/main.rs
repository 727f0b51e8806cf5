//! Google Forms MCP Server - Entry Point

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use google_forms_mcp::{config::Config, server::McpServer};

#[derive(Parser, Debug)]
#[command(name = "google-forms-mcp")]
#[command(about = "MCP server for Google Forms with per-session OAuth2")]
#[command(version)]
struct Cli {
    /// OAuth2 client ID from the Google Cloud console
    #[arg(long, env = "GOOGLE_CLIENT_ID", default_value = "")]
    client_id: String,

    /// OAuth2 client secret
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", default_value = "", hide_env_values = true)]
    client_secret: String,

    /// Interface to bind
    #[arg(long, default_value = "localhost", env = "HOST")]
    host: String,

    /// HTTP server port
    #[arg(long, default_value = "3000", env = "PORT")]
    port: u16,

    /// Public base URL, used for the OAuth2 redirect and SSE endpoint announcements
    #[arg(long, env = "BASE_URL")]
    base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Google Forms MCP server");

    let config = Config::new(cli.client_id, cli.client_secret).with_listen(
        cli.host,
        cli.port,
        cli.base_url,
    );
    tracing::info!(base_url = %config.base_url, "Running in HTTP mode");

    McpServer::new(config)?.run_http().await
}
