//! Grid Trading Bot Binary
//!
//! Runs one spot grid until the last take-profit sell fills, the feed dies,
//! or Ctrl-C is pressed. Every order still open at that point is cancelled.
//!
//! ## Setup
//!
//! 1. Create a `config.toml` (see `config.example.toml`) and keep the
//!    secret out of it, e.g. in a `.env` file:
//!    ```
//!    APP_NETWORK__API_KEY=...
//!    APP_NETWORK__API_SECRET=...
//!    ```
//!
//! 2. Run the bot:
//!    ```bash
//!    cargo run --bin grid_bot -- --config config.toml --symbol BTCUSDT --budget 500
//!    ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};
use rust_decimal::Decimal;
use tokio::sync::broadcast;

use spot_grid::runner::BotRunner;

#[derive(Debug, Parser)]
#[command(name = "grid_bot", about = "Laddered grid trading on a spot market")]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Trading pair, e.g. BTCUSDT
    #[arg(long)]
    symbol: Option<String>,

    /// Quote amount of the opening market buy
    #[arg(long)]
    initial: Option<Decimal>,

    /// Rung distance as a fraction of the average fill price
    #[arg(long)]
    drop_ratio: Option<Decimal>,

    /// Quantity growth factor for deeper buys
    #[arg(long)]
    multiplier: Option<Decimal>,

    /// Ceiling on projected quote exposure
    #[arg(long)]
    budget: Option<Decimal>,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    let runner = match BotRunner::new(&args.config) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Failed to load config {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut strategy = runner.settings().strategy.clone();
    if let Some(symbol) = args.symbol {
        strategy.symbol = symbol;
    }
    if let Some(initial) = args.initial {
        strategy.initial_amount = initial;
    }
    if let Some(drop_ratio) = args.drop_ratio {
        strategy.drop_ratio = drop_ratio;
    }
    if let Some(multiplier) = args.multiplier {
        strategy.multiplier = multiplier;
    }
    if let Some(budget) = args.budget {
        strategy.budget = budget;
    }
    let runner = runner.with_strategy(strategy);
    runner.init_logging();

    match dotenv {
        Ok(path) => info!("Loaded environment from: {}", path.display()),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Ctrl-C received, shutting down");
                let _ = shutdown_tx.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    match runner.run(shutdown_rx).await {
        Ok(summary) if summary.shutdown.is_clean() => ExitCode::SUCCESS,
        Ok(summary) => {
            error!("{} order(s) could not be cancelled: {:?}", summary.shutdown.failed.len(), summary.shutdown.failed);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Grid bot failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
