//! Cancellation of residual orders when a run ends

use std::collections::HashMap;

use log::{info, warn};

use super::executor::GridExchange;
use super::types::GridOrder;

/// Outcome of one cancellation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShutdownReport {
    /// Orders the exchange confirmed as cancelled
    pub cancelled: Vec<u64>,
    /// Orders whose cancel failed, with the error text
    pub failed: Vec<(u64, String)>,
}

impl ShutdownReport {
    pub fn attempted(&self) -> usize {
        self.cancelled.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Issues one best-effort cancel per residual order
pub struct ShutdownSequencer<'a, E: GridExchange + ?Sized> {
    exchange: &'a E,
    symbol: &'a str,
}

impl<'a, E: GridExchange + ?Sized> ShutdownSequencer<'a, E> {
    pub fn new(exchange: &'a E, symbol: &'a str) -> Self {
        Self { exchange, symbol }
    }

    /// Cancel every order in `orders`. A failure is recorded and the pass
    /// moves on to the next order.
    pub async fn cancel_all(&self, orders: HashMap<u64, GridOrder>) -> ShutdownReport {
        let mut ids: Vec<(u64, GridOrder)> = orders.into_iter().collect();
        ids.sort_by_key(|(id, _)| *id);

        let mut report = ShutdownReport::default();
        for (order_id, order) in ids {
            match self.exchange.cancel_order(self.symbol, order_id).await {
                Ok(()) => {
                    info!("Cancelled {} order {}", order.side, order_id);
                    report.cancelled.push(order_id);
                }
                Err(e) => {
                    warn!("Failed to cancel {} order {}: {}", order.side, order_id, e);
                    report.failed.push((order_id, e.to_string()));
                }
            }
        }

        info!(
            "Shutdown: {} cancelled, {} failed",
            report.cancelled.len(),
            report.failed.len()
        );
        report
    }
}
