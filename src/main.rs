//! strata server binary.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!   request  ───▶ │ tower-http layers (request id, trace, timeout, limit) │
//!                 └───────────────────────────┬──────────────────────────┘
//!                                             ▼
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │ AppService: create_context → spawn dispatch          │
//!                 │   error-handler → logger → response-time → … → echo  │
//!                 │                                   └─▶ finalizer      │
//!                 └───────────────────────────┬──────────────────────────┘
//!   response ◀────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use strata::config::{load_config, AppConfig};
use strata::middleware::Registry;
use strata::observability::{logging, metrics};
use strata::App;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Serve a configured middleware stack", long_about = None)]
struct Cli {
    /// TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the server (default)
    Serve,
    /// Validate the config and resolve the middleware stack, then exit
    Check,
    /// List middleware names available to `middleware.stack`
    Middleware,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Check => {
            let app = App::from_config(&config)?;
            println!("config ok: {:?}", app.middleware_names());
            Ok(())
        }
        Commands::Middleware => {
            for name in Registry::default().names() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Serve => serve(config).await,
    }
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init(&config.observability)?;
    tracing::info!("strata v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = App::from_config(&config)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.listener.request_timeout_secs,
        env = %config.app.env,
        "Configuration loaded"
    );

    app.listen(&config.listener.bind_address).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
