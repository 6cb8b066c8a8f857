//! Exchange abstraction for grid trading - enables mocking for tests

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::exchange::{connect_user_stream, SpotClient};

use super::errors::{GridError, GridResult};
use super::quantizer::SymbolRules;
use super::types::{GridOrderRequest, StreamEvent};

/// Live feed of user-data events. Not restartable: once it ends, open a new one.
pub type EventStream = BoxStream<'static, GridResult<StreamEvent>>;

/// Exchange operations trait - can be mocked for testing
#[async_trait]
pub trait GridExchange: Send + Sync {
    /// Place an order, returning the exchange-assigned order id.
    /// A request without a price is a market order.
    async fn place_order(&self, symbol: &str, order: &GridOrderRequest) -> GridResult<u64>;

    /// Cancel an order by id. Cancelling a terminal order is an error.
    async fn cancel_order(&self, symbol: &str, order_id: u64) -> GridResult<()>;

    /// Price and lot-size rules for a symbol
    async fn get_symbol_rules(&self, symbol: &str) -> GridResult<SymbolRules>;

    /// Open a data-stream lease, returning its id
    async fn open_lease(&self) -> GridResult<String>;

    /// Extend a data-stream lease
    async fn renew_lease(&self, lease_id: &str) -> GridResult<()>;

    /// Close a data-stream lease
    async fn close_lease(&self, lease_id: &str) -> GridResult<()>;

    /// Subscribe to the live event feed authorised by `lease_id`
    async fn stream_events(&self, lease_id: &str) -> GridResult<EventStream>;
}

// ============================================================================
// Real Spot Exchange Implementation
// ============================================================================

/// Live spot exchange implementation
#[derive(Debug, Clone)]
pub struct SpotExchange {
    client: Arc<SpotClient>,
}

impl SpotExchange {
    pub fn new(client: SpotClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

#[async_trait]
impl GridExchange for SpotExchange {
    async fn place_order(&self, symbol: &str, order: &GridOrderRequest) -> GridResult<u64> {
        Ok(self.client.place_order(symbol, order).await?)
    }

    async fn cancel_order(&self, symbol: &str, order_id: u64) -> GridResult<()> {
        self.client.cancel_order(symbol, order_id).await?;
        Ok(())
    }

    async fn get_symbol_rules(&self, symbol: &str) -> GridResult<SymbolRules> {
        let info = self
            .client
            .symbol_info(symbol)
            .await?
            .ok_or_else(|| GridError::AssetNotFound(symbol.to_string()))?;

        info.symbol_rules().unwrap_or_else(|| {
            Err(GridError::AssetNotFound(format!(
                "{symbol}: missing PRICE_FILTER or LOT_SIZE filter"
            )))
        })
    }

    async fn open_lease(&self) -> GridResult<String> {
        Ok(self.client.open_user_data_stream().await?)
    }

    async fn renew_lease(&self, lease_id: &str) -> GridResult<()> {
        Ok(self.client.renew_user_data_stream(lease_id).await?)
    }

    async fn close_lease(&self, lease_id: &str) -> GridResult<()> {
        Ok(self.client.close_user_data_stream(lease_id).await?)
    }

    async fn stream_events(&self, lease_id: &str) -> GridResult<EventStream> {
        let feed = connect_user_stream(self.client.ws_url(), lease_id).await?;
        Ok(feed.map(|item| item.map_err(GridError::from)).boxed())
    }
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================

/// Mock exchange for testing grid bots without a real exchange connection.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use futures_util::stream;
    use tokio::sync::{mpsc, Mutex};

    pub const MOCK_LEASE_ID: &str = "mock-lease";

    pub type FeedSender = mpsc::UnboundedSender<GridResult<StreamEvent>>;

    /// Mock exchange for testing
    pub struct MockExchange {
        pub orders: Arc<Mutex<Vec<GridOrderRequest>>>,
        pub cancelled_oids: Arc<Mutex<Vec<u64>>>,
        pub closed_leases: Arc<Mutex<Vec<String>>>,
        pub renewals: Arc<AtomicUsize>,
        pub rules: Arc<Mutex<SymbolRules>>,
        next_oid: AtomicU64,
        pub should_fail: Arc<Mutex<bool>>,
        pub fail_cancels: Arc<Mutex<bool>>,
        pub fail_renewals: Arc<Mutex<bool>>,
        feed_tx: Mutex<Option<FeedSender>>,
        feed_rx: Mutex<Option<mpsc::UnboundedReceiver<GridResult<StreamEvent>>>>,
    }

    impl MockExchange {
        pub fn new(rules: SymbolRules) -> Self {
            let (feed_tx, feed_rx) = mpsc::unbounded_channel();
            Self {
                orders: Arc::new(Mutex::new(Vec::new())),
                cancelled_oids: Arc::new(Mutex::new(Vec::new())),
                closed_leases: Arc::new(Mutex::new(Vec::new())),
                renewals: Arc::new(AtomicUsize::new(0)),
                rules: Arc::new(Mutex::new(rules)),
                next_oid: AtomicU64::new(1),
                should_fail: Arc::new(Mutex::new(false)),
                fail_cancels: Arc::new(Mutex::new(false)),
                fail_renewals: Arc::new(Mutex::new(false)),
                feed_tx: Mutex::new(Some(feed_tx)),
                feed_rx: Mutex::new(Some(feed_rx)),
            }
        }

        pub async fn set_should_fail(&self, fail: bool) {
            *self.should_fail.lock().await = fail;
        }

        pub async fn set_fail_cancels(&self, fail: bool) {
            *self.fail_cancels.lock().await = fail;
        }

        pub async fn set_fail_renewals(&self, fail: bool) {
            *self.fail_renewals.lock().await = fail;
        }

        /// Hand out the sending side of the event feed. The feed ends once
        /// the returned sender is dropped.
        pub async fn take_feed_sender(&self) -> Option<FeedSender> {
            self.feed_tx.lock().await.take()
        }
    }

    #[async_trait]
    impl GridExchange for MockExchange {
        async fn place_order(&self, _symbol: &str, order: &GridOrderRequest) -> GridResult<u64> {
            if *self.should_fail.lock().await {
                return Err(GridError::Exchange {
                    code: -2010,
                    message: "Mock failure".into(),
                });
            }

            self.orders.lock().await.push(order.clone());
            Ok(self.next_oid.fetch_add(1, Ordering::SeqCst))
        }

        async fn cancel_order(&self, _symbol: &str, order_id: u64) -> GridResult<()> {
            self.cancelled_oids.lock().await.push(order_id);
            if *self.fail_cancels.lock().await {
                return Err(GridError::Exchange {
                    code: -2011,
                    message: "Unknown order sent.".into(),
                });
            }
            Ok(())
        }

        async fn get_symbol_rules(&self, _symbol: &str) -> GridResult<SymbolRules> {
            Ok(*self.rules.lock().await)
        }

        async fn open_lease(&self) -> GridResult<String> {
            Ok(MOCK_LEASE_ID.to_string())
        }

        async fn renew_lease(&self, _lease_id: &str) -> GridResult<()> {
            self.renewals.fetch_add(1, Ordering::SeqCst);
            if *self.fail_renewals.lock().await {
                return Err(GridError::Transport("Mock renewal failure".into()));
            }
            Ok(())
        }

        async fn close_lease(&self, lease_id: &str) -> GridResult<()> {
            self.closed_leases.lock().await.push(lease_id.to_string());
            Ok(())
        }

        async fn stream_events(&self, _lease_id: &str) -> GridResult<EventStream> {
            let rx = self
                .feed_rx
                .lock()
                .await
                .take()
                .ok_or_else(|| GridError::Feed("mock feed already consumed".into()))?;

            Ok(stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use crate::grid::types::OrderSide;
    use rust_decimal_macros::dec;

    fn rules() -> SymbolRules {
        SymbolRules::new(dec!(0.01), dec!(0.01), dec!(1000000), dec!(0.001), dec!(0.001), dec!(90000)).unwrap()
    }

    #[tokio::test]
    async fn test_mock_assigns_sequential_ids() {
        let exchange = MockExchange::new(rules());
        let a = exchange
            .place_order("ABCUSDT", &GridOrderRequest::market_quote(OrderSide::Buy, dec!(100)))
            .await
            .unwrap();
        let b = exchange
            .place_order("ABCUSDT", &GridOrderRequest::limit(OrderSide::Sell, dec!(10.5), dec!(10)))
            .await
            .unwrap();

        assert_eq!((a, b), (1, 2));
        assert_eq!(exchange.orders.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure_records_nothing() {
        let exchange = MockExchange::new(rules());
        exchange.set_should_fail(true).await;

        let result = exchange
            .place_order("ABCUSDT", &GridOrderRequest::market_quote(OrderSide::Buy, dec!(100)))
            .await;

        assert!(matches!(result, Err(GridError::Exchange { .. })));
        assert!(exchange.orders.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_mock_feed_is_not_restartable() {
        let exchange = MockExchange::new(rules());
        let feed = exchange.take_feed_sender().await.unwrap();
        let mut events = exchange.stream_events(MOCK_LEASE_ID).await.unwrap();

        feed.send(Ok(StreamEvent::Ready)).unwrap();
        drop(feed);

        assert_eq!(events.next().await.unwrap().unwrap(), StreamEvent::Ready);
        assert!(events.next().await.is_none());
        assert!(exchange.stream_events(MOCK_LEASE_ID).await.is_err());
    }
}
