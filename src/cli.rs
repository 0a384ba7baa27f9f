use clap::{Parser, Subcommand};

use crate::commands;

#[derive(Parser)]
#[command(name = "coinwatch")]
#[command(about = "Cryptocurrency market data cache and API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server and background market worker
    Serve {
        /// Port to listen on (falls back to PORT env var, then 9100)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Synchronize historical data for one symbol
    Pull {
        /// Ticker symbol, e.g. BTC
        #[arg(short, long)]
        symbol: String,
        /// Number of days of history to fetch
        #[arg(short, long, default_value_t = 30)]
        days: i64,
    },
    /// Show store statistics
    Status,
}

pub async fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            commands::serve::run(port).await;
        }
        Commands::Pull { symbol, days } => {
            commands::pull::run(symbol, days).await;
        }
        Commands::Status => {
            commands::status::run().await;
        }
    }
}
