//! Observability demo service entry point.

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use obsdemo::app::{init_state, serve};
use obsdemo::config::{Config, LogFormat};
use obsdemo::utils::shutdown_signal;

/// Demo HTTP service with health, processing and message lookup endpoints.
#[derive(Parser, Debug)]
#[command(name = "obsdemo")]
#[command(about = "Instrumented demo HTTP service with Prometheus metrics")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the HTTP port (otherwise PORT or 8000).
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Override the database URL (otherwise DATABASE_URL).
    #[arg(long, global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default).
    Serve,

    /// Check configuration validity.
    CheckConfig,

    /// Apply the schema and seed an empty store, then exit.
    Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.database_url.clone() {
        config.database_url = url;
    }

    init_logging(&config, args.verbose);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Seed) => cmd_seed(&config).await,
        Some(Command::Serve) | None => cmd_serve(&config).await,
    }
}

/// Install the process-wide tracing subscriber.
fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("obsdemo=debug,info")
    } else {
        EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().flatten_event(true))
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
}

/// Run the HTTP service until a shutdown signal arrives.
async fn cmd_serve(config: &Config) -> anyhow::Result<()> {
    let state = init_state(config).await?;

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", addr);

    serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("OBSDEMO - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Database URL: {}", config.database_url);
    println!("  Max Connections: {}", config.database_max_connections);
    println!("  Listen Address: {}", config.bind_addr());
    println!("  Log Level: {}", config.rust_log);
    println!("  Log Format: {}", config.log_format);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Apply the schema and seed an empty store without serving.
async fn cmd_seed(config: &Config) -> anyhow::Result<()> {
    let state = init_state(config).await?;
    let total = state.store.count().await?;
    info!(total, "store ready");
    state.store.close().await;
    Ok(())
}
