//! tradelink CLI - marketplace backend entry point
//!
//! Runs the HTTP/WebSocket server for supplier-consumer links,
//! complaints, incidents, and chat.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod tracing_setup;

#[derive(Parser, Debug)]
#[command(
    name = "tradelink",
    author,
    version,
    about = "B2B marketplace backend: supplier-consumer links, complaints, and chat"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API and WebSocket server
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
struct ServeArgs {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// PostgreSQL connection string (falls back to DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Allow requests from any origin
    #[arg(long)]
    cors_permissive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug })?;

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .context("database URL required: pass --database-url or set DATABASE_URL")?;

    let bind_addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("invalid host/port")?;

    let pool = tradelink_server::db::create_pool(&database_url)
        .await
        .context("failed to connect to database")?;

    let config = tradelink_server::ServerConfig {
        bind_addr,
        cors_permissive: args.cors_permissive,
    };

    tradelink_server::run_server(pool, config)
        .await
        .context("server error")?;

    Ok(())
}
