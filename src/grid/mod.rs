//! Grid trading strategy for spot markets
//!
//! Starting from one market buy, the strategy ladders a take-profit SELL
//! above and a geometrically larger BUY below every filled buy, and re-enters
//! below every filled sell while other sells are still open. Deeper buys are
//! gated by a budget on projected quote exposure. The run ends when no SELL
//! order is left open.
//!
//! # Architecture
//!
//! - [`config`] - Strategy parameters and validation
//! - [`types`] - Core data types (GridOrder, ExecutionReport, messages)
//! - [`errors`] - Grid-specific error types
//! - [`quantizer`] - Price/quantity snapping to the symbol's filters
//! - [`executor`] - Exchange abstraction (mockable for testing)
//! - [`router`] - Lease keepalive and feed forwarding tasks
//! - [`engine`] - The strategy state machine
//! - [`shutdown`] - Residual order cancellation
//! - [`runner`] - One complete run
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use spot_grid::grid::{GridRunner, RunnerConfig, SpotExchange, StrategyParameters};
//! use rust_decimal_macros::dec;
//!
//! let params = StrategyParameters::new("BTCUSDT", dec!(100), dec!(0.05), dec!(2), dec!(1000));
//! let runner = GridRunner::new(Arc::new(exchange), params, RunnerConfig::default());
//!
//! let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
//! let summary = runner.run(shutdown_rx).await?;
//! ```
//!
//! # Testing
//!
//! ```rust,ignore
//! use spot_grid::grid::executor::mock::MockExchange;
//!
//! let exchange = MockExchange::new(rules);
//! let feed = exchange.take_feed_sender().await.unwrap();
//! feed.send(Ok(StreamEvent::Ready))?;
//! ```

pub mod config;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod quantizer;
pub mod router;
pub mod runner;
pub mod shutdown;
pub mod types;

// Re-export commonly used types
pub use config::StrategyParameters;
pub use engine::GridEngine;
pub use errors::{GridError, GridResult};
pub use executor::{EventStream, GridExchange, SpotExchange};
pub use quantizer::SymbolRules;
pub use router::EventRouter;
pub use runner::{GridRunner, RunSummary, RunnerConfig};
pub use shutdown::{ShutdownReport, ShutdownSequencer};
pub use types::{
    BotStatus, ExecutionReport, GridMessage, GridOrder, GridOrderRequest, OrderSide, OrderStatus, RunningTotals,
    StopReason, StreamEvent,
};
