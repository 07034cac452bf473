use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use cozi_mcp::config::{parse_header, session_config_schema};
use cozi_mcp::rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use cozi_mcp::rmcp::ServiceExt;
use cozi_mcp::{ClientFactory, Config, CoziServer, Credentials, RestClientFactory};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Parser)]
#[command(name = "cozi-mcp", version, about = "Cozi Family Organizer tools over MCP")]
struct Cli {
    /// Cozi REST API root (overrides COZI_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<Url>,

    /// HTTP timeout for Cozi requests, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Extra header sent with every Cozi request, as Name=value (repeatable)
    #[arg(long = "header", global = true, value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve one account over stdin/stdout
    Stdio,
    /// Serve per-session configured accounts over streamable HTTP
    Http {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
        #[arg(long, default_value = "/mcp")]
        path: String,
    },
    /// Print the JSON schema of the per-session configuration
    ConfigSchema,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // stdout carries the stdio transport, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut config = Config::from_env()?;
    if let Some(base_url) = cli.base_url.clone() {
        config.base_url = base_url;
    }
    if let Some(secs) = cli.timeout_secs {
        config.transport = config.transport.with_timeout(Duration::from_secs(secs));
    }
    for (name, value) in cli.headers.clone() {
        config.transport = config.transport.with_header(name, value);
    }
    let factory: Arc<dyn ClientFactory> = Arc::new(RestClientFactory::new(config));

    match cli.command.unwrap_or(Command::Stdio) {
        Command::Stdio => serve_stdio(factory).await,
        Command::Http { bind, path } => serve_http(factory, bind, &path).await,
        Command::ConfigSchema => {
            println!("{}", serde_json::to_string_pretty(&session_config_schema())?);
            Ok(())
        }
    }
}

async fn serve_stdio(factory: Arc<dyn ClientFactory>) -> Result<(), Box<dyn std::error::Error>> {
    let credentials = Credentials::from_env().inspect_err(|e| error!("{}", e))?;

    info!("Starting Cozi MCP server on stdio");
    let service = CoziServer::standalone(factory, Some(credentials))
        .serve(cozi_mcp::rmcp::transport::stdio())
        .await?;
    service.waiting().await?;
    Ok(())
}

async fn serve_http(
    factory: Arc<dyn ClientFactory>,
    bind: SocketAddr,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if !path.starts_with('/') || path.len() < 2 {
        return Err(format!("invalid MCP path {path:?}: must start with '/'").into());
    }

    let service = StreamableHttpService::new(
        move || Ok(CoziServer::session(Arc::clone(&factory))),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service(path, service);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Serving Cozi MCP sessions on http://{}{}", bind, path);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
