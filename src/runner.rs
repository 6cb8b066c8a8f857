use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::broadcast;

use crate::config::Settings;
use crate::exchange::{RequestSigner, SpotClient};
use crate::grid::{GridRunner, RunSummary, RunnerConfig, SpotExchange, StrategyParameters};

/// Runner for the grid bot
pub struct BotRunner {
    config: Settings,
}

impl BotRunner {
    /// Create a new runner from a configuration file
    pub fn new(config_path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        let path = config_path.as_ref().to_string_lossy();
        let config = Settings::new(&path)?;
        Ok(Self { config })
    }

    pub fn settings(&self) -> &Settings {
        &self.config
    }

    /// Replace the strategy parameters loaded from file
    pub fn with_strategy(mut self, strategy: StrategyParameters) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Initialise `env_logger`; `RUST_LOG` wins over `log.level`
    pub fn init_logging(&self) {
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", &self.config.log.level);
        }
        env_logger::try_init().ok();
    }

    /// Run the bot until the grid stops or `shutdown` fires
    pub async fn run(self, shutdown: broadcast::Receiver<()>) -> Result<RunSummary, Box<dyn std::error::Error>> {
        // 1. Setup Logging
        self.init_logging();

        info!("Starting BotRunner...");

        // 2. Setup Network & Client
        let network = &self.config.network;
        info!("Connecting to {} ({})", network.env, network.rest_url());
        let client = SpotClient::with_endpoints(
            network.rest_url(),
            network.websocket_url(),
            RequestSigner::new(network.api_key.as_str(), network.api_secret.as_str()),
            network.request_timeout(),
        )?;
        let exchange = Arc::new(SpotExchange::new(client));

        // 3. Run the grid
        let runner_config = RunnerConfig {
            renew_interval: Duration::from_secs(self.config.runner.renew_interval_secs),
        };
        let runner = GridRunner::new(exchange, self.config.strategy.clone(), runner_config);
        let summary = runner.run(shutdown).await?;

        info!(
            "Grid finished ({}): received {} / spent {}, {} order(s) cancelled, {} cancel failure(s)",
            summary.reason,
            summary.totals.received,
            summary.totals.spent,
            summary.shutdown.cancelled.len(),
            summary.shutdown.failed.len()
        );
        Ok(summary)
    }
}
