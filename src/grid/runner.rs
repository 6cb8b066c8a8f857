//! Grid runner - one complete strategy run against an exchange

use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::{broadcast, mpsc};

use crate::consts::LEASE_RENEW_INTERVAL;

use super::config::StrategyParameters;
use super::engine::GridEngine;
use super::errors::GridResult;
use super::executor::GridExchange;
use super::router::EventRouter;
use super::shutdown::ShutdownReport;
use super::types::{RunningTotals, StopReason};

/// Grid runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Period of the data-stream lease keepalive
    pub renew_interval: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            renew_interval: LEASE_RENEW_INTERVAL,
        }
    }
}

/// What a finished run reports back
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub totals: RunningTotals,
    pub shutdown: ShutdownReport,
}

pub struct GridRunner<E: GridExchange> {
    exchange: Arc<E>,
    params: StrategyParameters,
    runner_config: RunnerConfig,
}

impl<E: GridExchange + 'static> GridRunner<E> {
    pub fn new(exchange: Arc<E>, params: StrategyParameters, runner_config: RunnerConfig) -> Self {
        Self {
            exchange,
            params,
            runner_config,
        }
    }

    /// Run the strategy to completion.
    ///
    /// Errors are only returned for failures before any order is placed
    /// (invalid parameters, rules lookup, lease or feed setup). Once the
    /// engine is running every exit path goes through the drain.
    pub async fn run(&self, shutdown: broadcast::Receiver<()>) -> GridResult<RunSummary> {
        self.params.validate()?;
        let symbol = self.params.symbol.as_str();

        info!("Starting grid on {}", symbol);
        let rules = self.exchange.get_symbol_rules(symbol).await?;
        info!("Symbol rules: {:?}", rules);

        let lease_id = self.exchange.open_lease().await?;
        info!("Data stream lease opened");

        let (tx, rx) = mpsc::unbounded_channel();
        let mut router = match EventRouter::start(
            self.exchange.clone(),
            lease_id.clone(),
            tx,
            self.runner_config.renew_interval,
        )
        .await
        {
            Ok(router) => router,
            Err(e) => {
                error!("Failed to start event router: {}", e);
                self.close_lease(&lease_id).await;
                return Err(e);
            }
        };

        let mut engine = GridEngine::new(self.exchange.clone(), self.params.clone(), rules);
        let reason = match engine.run(rx, shutdown).await {
            Ok(reason) => reason,
            Err(e) => {
                error!("Engine failed: {}", e);
                StopReason::Interrupted
            }
        };
        info!("Grid stopping: {}", reason);

        router.stop();
        let shutdown = engine.drain().await;
        self.close_lease(&lease_id).await;

        Ok(RunSummary {
            reason,
            totals: engine.totals(),
            shutdown,
        })
    }

    async fn close_lease(&self, lease_id: &str) {
        match self.exchange.close_lease(lease_id).await {
            Ok(()) => info!("Data stream lease closed"),
            Err(e) => warn!("Failed to close data stream lease: {}", e),
        }
    }
}
