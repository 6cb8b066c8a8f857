//! Grid strategy engine.
//!
//! The engine is the single consumer of [`GridMessage`]s. It owns the open
//! order table and the running totals; nothing else reads or writes them.
//! Every placement and cancellation is awaited inline, so messages that
//! arrive meanwhile queue up on the channel and are handled in order.
//!
//! Lifecycle: `AwaitingStart` → `Running` → `Draining` → `Stopped`.
//! The run drains once no SELL order is left open, or when the feed, the
//! channel or the operator ends it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;
use tokio::sync::{broadcast, mpsc};

use super::config::StrategyParameters;
use super::errors::{GridError, GridResult};
use super::executor::GridExchange;
use super::quantizer::SymbolRules;
use super::shutdown::{ShutdownReport, ShutdownSequencer};
use super::types::{
    BotStatus, ExecutionReport, GridMessage, GridOrder, GridOrderRequest, OrderSide, OrderStatus, RunningTotals,
    StopReason,
};

pub struct GridEngine<E: GridExchange> {
    exchange: Arc<E>,
    params: StrategyParameters,
    rules: SymbolRules,
    open_orders: HashMap<u64, GridOrder>,
    totals: RunningTotals,
    status: BotStatus,
    stop_reason: Option<StopReason>,
}

impl<E: GridExchange> GridEngine<E> {
    pub fn new(exchange: Arc<E>, params: StrategyParameters, rules: SymbolRules) -> Self {
        Self {
            exchange,
            params,
            rules,
            open_orders: HashMap::new(),
            totals: RunningTotals::default(),
            status: BotStatus::AwaitingStart,
            stop_reason: None,
        }
    }

    pub fn status(&self) -> BotStatus {
        self.status
    }

    pub fn open_orders(&self) -> &HashMap<u64, GridOrder> {
        &self.open_orders
    }

    pub fn totals(&self) -> RunningTotals {
        self.totals
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    /// Consume messages until the engine leaves its active states.
    ///
    /// A `FeedClosed` message, the channel closing, or a signal on `shutdown`
    /// forces `Draining`. Call [`drain`](Self::drain) afterwards.
    pub async fn run(
        &mut self,
        mut rx: mpsc::UnboundedReceiver<GridMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> GridResult<StopReason> {
        if self.status != BotStatus::AwaitingStart {
            return Err(GridError::InvalidState {
                current_state: format!("{:?}", self.status),
            });
        }

        let mut shutdown_open = true;
        while self.status.is_active() {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => self.begin_draining(StopReason::ChannelClosed),
                },
                signal = shutdown.recv(), if shutdown_open => match signal {
                    Err(broadcast::error::RecvError::Closed) => shutdown_open = false,
                    _ => self.begin_draining(StopReason::Interrupted),
                },
            }
        }

        Ok(self.stop_reason.clone().unwrap_or(StopReason::ChannelClosed))
    }

    /// Apply one message to the engine state
    pub async fn handle_message(&mut self, message: GridMessage) {
        if !self.status.is_active() {
            debug!("Engine {:?}, ignoring {:?}", self.status, message);
            return;
        }

        match message {
            GridMessage::Begin { timestamp } => self.on_begin(timestamp).await,
            GridMessage::Execution(report) => self.on_execution_report(report).await,
            GridMessage::FeedClosed(reason) => self.begin_draining(StopReason::FeedClosed(reason)),
        }
    }

    /// Cancel every order still in the table and stop. Runs once.
    pub async fn drain(&mut self) -> ShutdownReport {
        if self.status == BotStatus::Stopped {
            return ShutdownReport::default();
        }
        self.begin_draining(StopReason::Interrupted);

        let residual = std::mem::take(&mut self.open_orders);
        info!("Draining {} open order(s)", residual.len());
        let report = ShutdownSequencer::new(self.exchange.as_ref(), &self.params.symbol)
            .cancel_all(residual)
            .await;

        self.status = BotStatus::Stopped;
        info!(
            "Grid stopped: received {} / spent {}",
            self.totals.received, self.totals.spent
        );
        report
    }

    async fn on_begin(&mut self, timestamp: DateTime<Utc>) {
        if self.status != BotStatus::AwaitingStart {
            warn!("Stream ready again at {} while {:?}, ignoring", timestamp, self.status);
            return;
        }

        info!(
            "Stream ready at {}, buying {} quote of {}",
            timestamp, self.params.initial_amount, self.params.symbol
        );
        let request = GridOrderRequest::market_quote(OrderSide::Buy, self.params.initial_amount);
        if self.place(request).await.is_some() {
            self.status = BotStatus::Running;
            info!("Grid running");
        } else {
            self.begin_draining(StopReason::InitialOrderFailed);
        }
    }

    async fn on_execution_report(&mut self, report: ExecutionReport) {
        let order_id = report.order_id;
        if !self.open_orders.contains_key(&order_id) {
            warn!("Ignoring {:?} report for unmanaged order {}", report.status, order_id);
            return;
        }

        match report.status {
            OrderStatus::PartiallyFilled => {
                if let Some(order) = self.open_orders.get_mut(&order_id) {
                    order.fill(&report);
                    debug!(
                        "Order {} partially filled: {} for {}",
                        order_id,
                        order.cumulative_base_quantity(),
                        order.cumulative_quote_amount()
                    );
                }
            }
            OrderStatus::Filled => {
                if let Some(mut order) = self.open_orders.remove(&order_id) {
                    order.fill(&report);
                    info!(
                        "{} order {} filled: {} @ {}",
                        order.side,
                        order_id,
                        order.cumulative_base_quantity(),
                        order.average_price()
                    );
                    self.on_filled(order).await;
                }
                self.check_open_sells();
            }
            status if status.is_terminal() => {
                self.open_orders.remove(&order_id);
                info!("Order {} closed as {:?} {}", order_id, status, report.reject_reason);
                self.check_open_sells();
            }
            _ => {}
        }
    }

    async fn on_filled(&mut self, order: GridOrder) {
        let average = order.average_price();
        let distance = average * self.params.drop_ratio;
        let lower = self.rules.quantize_price(average - distance);
        let quantity = self.rules.quantize_quantity(order.cumulative_base_quantity());

        match order.side {
            OrderSide::Sell => {
                self.totals.add_received(order.cumulative_quote_amount());
                info!(
                    "{} (+{}) / {}",
                    self.totals.received,
                    order.cumulative_quote_amount(),
                    self.totals.spent
                );

                if self.has_open_sell() {
                    self.place(GridOrderRequest::limit(OrderSide::Buy, lower, quantity)).await;
                } else {
                    info!("Last sell filled, no re-entry");
                }
            }
            OrderSide::Buy => {
                self.totals.add_spent(order.cumulative_quote_amount());
                info!(
                    "{} / {} (+{})",
                    self.totals.received,
                    self.totals.spent,
                    order.cumulative_quote_amount()
                );

                let upper = self.rules.quantize_price(average + distance);
                self.place(GridOrderRequest::limit(OrderSide::Sell, upper, quantity)).await;

                let next_quantity = self.rules.quantize_quantity(order.cumulative_base_quantity() * self.params.multiplier);
                let projected = self.projected_exposure(lower, next_quantity);
                if projected < self.params.budget {
                    self.place(GridOrderRequest::limit(OrderSide::Buy, lower, next_quantity)).await;
                } else {
                    info!(
                        "Budget reached: projected {} >= {}, no deeper rung",
                        projected, self.params.budget
                    );
                }
            }
        }
    }

    fn projected_exposure(&self, price: Decimal, quantity: Decimal) -> Decimal {
        self.totals.exposure() + price * quantity
    }

    /// Place an order and track it. A failure is logged and leaves the table unchanged.
    async fn place(&mut self, request: GridOrderRequest) -> Option<u64> {
        match self.exchange.place_order(&self.params.symbol, &request).await {
            Ok(order_id) => {
                match request.price {
                    Some(price) => info!("Placed {} {} @ {}: order {}", request.side, request.quantity, price, order_id),
                    None => info!("Placed market {} for {}: order {}", request.side, request.quantity, order_id),
                }
                self.open_orders.insert(order_id, GridOrder::new(request.side));
                Some(order_id)
            }
            Err(e) => {
                error!("Failed to place {} order: {}", request.side, e);
                None
            }
        }
    }

    fn has_open_sell(&self) -> bool {
        self.open_orders.values().any(|o| o.side == OrderSide::Sell)
    }

    fn check_open_sells(&mut self) {
        if !self.has_open_sell() {
            self.begin_draining(StopReason::NoSellOrders);
        }
    }

    fn begin_draining(&mut self, reason: StopReason) {
        if !self.status.is_active() {
            return;
        }
        info!("Draining: {}", reason);
        self.status = BotStatus::Draining;
        self.stop_reason = Some(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::executor::mock::MockExchange;
    use rust_decimal_macros::dec;

    fn rules() -> SymbolRules {
        SymbolRules::new(dec!(0.01), dec!(0.01), dec!(1000000), dec!(0.001), dec!(0.001), dec!(90000)).unwrap()
    }

    fn params(budget: Decimal) -> StrategyParameters {
        StrategyParameters::new("ABCUSDT", dec!(100), dec!(0.05), dec!(2), budget)
    }

    fn engine(budget: Decimal) -> (Arc<MockExchange>, GridEngine<MockExchange>) {
        let exchange = Arc::new(MockExchange::new(rules()));
        let engine = GridEngine::new(exchange.clone(), params(budget), rules());
        (exchange, engine)
    }

    fn begin() -> GridMessage {
        GridMessage::Begin { timestamp: Utc::now() }
    }

    fn report(order_id: u64, side: OrderSide, status: OrderStatus, qty: Decimal, quote: Decimal) -> GridMessage {
        GridMessage::Execution(ExecutionReport::new(order_id, "ABCUSDT", side, status).with_fill(qty, quote))
    }

    fn filled(order_id: u64, side: OrderSide, qty: Decimal, quote: Decimal) -> GridMessage {
        report(order_id, side, OrderStatus::Filled, qty, quote)
    }

    fn closed(order_id: u64, side: OrderSide, status: OrderStatus) -> GridMessage {
        GridMessage::Execution(ExecutionReport::new(order_id, "ABCUSDT", side, status))
    }

    /// Begin, then fill the opening buy at 10 for 10 units: SELL 2 and BUY 3 open
    async fn started(budget: Decimal) -> (Arc<MockExchange>, GridEngine<MockExchange>) {
        let (exchange, mut engine) = engine(budget);
        engine.handle_message(begin()).await;
        engine.handle_message(filled(1, OrderSide::Buy, dec!(10), dec!(100))).await;
        (exchange, engine)
    }

    #[tokio::test]
    async fn test_begin_places_one_market_buy() {
        let (exchange, mut engine) = engine(dec!(1000));
        assert_eq!(engine.status(), BotStatus::AwaitingStart);

        engine.handle_message(begin()).await;

        assert_eq!(engine.status(), BotStatus::Running);
        assert_eq!(
            *exchange.orders.lock().await,
            vec![GridOrderRequest::market_quote(OrderSide::Buy, dec!(100))]
        );
        assert_eq!(engine.open_orders().get(&1).map(|o| o.side), Some(OrderSide::Buy));
    }

    #[tokio::test]
    async fn test_second_begin_is_ignored() {
        let (exchange, mut engine) = engine(dec!(1000));
        engine.handle_message(begin()).await;
        engine.handle_message(begin()).await;

        assert_eq!(exchange.orders.lock().await.len(), 1);
        assert_eq!(engine.status(), BotStatus::Running);
    }

    #[tokio::test]
    async fn test_buy_fill_places_take_profit_and_deeper_rung() {
        let (exchange, engine) = started(dec!(1000)).await;

        let orders = exchange.orders.lock().await;
        assert_eq!(orders.len(), 3);
        assert_eq!(orders[1], GridOrderRequest::limit(OrderSide::Sell, dec!(10.50), dec!(10)));
        assert_eq!(orders[2], GridOrderRequest::limit(OrderSide::Buy, dec!(9.50), dec!(20)));
        assert_eq!(orders[1].price.map(|p| p.to_string()), Some("10.50000000".to_string()));

        assert_eq!(engine.totals().spent, dec!(100));
        assert_eq!(engine.totals().received, dec!(0));
        assert_eq!(engine.open_orders().len(), 2);
        assert_eq!(engine.open_orders()[&2].side, OrderSide::Sell);
        assert_eq!(engine.open_orders()[&3].side, OrderSide::Buy);
        assert_eq!(engine.status(), BotStatus::Running);
    }

    #[tokio::test]
    async fn test_rungs_from_average_price_100() {
        let (exchange, mut engine) = engine(dec!(1000));
        engine.handle_message(begin()).await;
        engine.handle_message(filled(1, OrderSide::Buy, dec!(1), dec!(100))).await;

        let orders = exchange.orders.lock().await;
        assert_eq!(orders[1], GridOrderRequest::limit(OrderSide::Sell, dec!(105), dec!(1)));
        assert_eq!(orders[2], GridOrderRequest::limit(OrderSide::Buy, dec!(95), dec!(2)));
    }

    #[tokio::test]
    async fn test_budget_threshold_is_exclusive() {
        // spent 100 + 9.50 * 20 - received 0 = 290
        let (exchange, engine) = started(dec!(290)).await;
        assert_eq!(exchange.orders.lock().await.len(), 2);
        assert_eq!(engine.open_orders().len(), 1);

        let (exchange, engine) = started(dec!(290.01)).await;
        assert_eq!(exchange.orders.lock().await.len(), 3);
        assert_eq!(engine.open_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_nets_out_received_quote() {
        let (exchange, mut engine) = started(dec!(650)).await;

        // 290 + 9.02 * 40 = 650.8: no deeper rung
        engine.handle_message(filled(3, OrderSide::Buy, dec!(20), dec!(190))).await;
        assert_eq!(exchange.orders.lock().await.len(), 4);

        // SELL 4 fills, SELL 2 still open: BUY 5 @ 9.47 for 20
        engine.handle_message(filled(4, OrderSide::Sell, dec!(20), dec!(199.4))).await;
        assert_eq!(engine.totals().exposure(), dec!(90.6));

        // 479.4 - 199.4 + 8.99 * 40 = 639.6 < 650
        engine.handle_message(filled(5, OrderSide::Buy, dec!(20), dec!(189.4))).await;
        let orders = exchange.orders.lock().await;
        assert_eq!(orders.len(), 7);
        assert_eq!(orders[6], GridOrderRequest::limit(OrderSide::Buy, dec!(8.99), dec!(40)));
    }

    #[tokio::test]
    async fn test_sell_fill_with_sells_remaining_rebuys() {
        let (exchange, mut engine) = started(dec!(1000)).await;

        // Deeper buy fills at 9.50: SELL 4 @ 9.97 and BUY 5 @ 9.02 for 40
        engine.handle_message(filled(3, OrderSide::Buy, dec!(20), dec!(190))).await;
        {
            let orders = exchange.orders.lock().await;
            assert_eq!(orders[3], GridOrderRequest::limit(OrderSide::Sell, dec!(9.97), dec!(20)));
            assert_eq!(orders[4], GridOrderRequest::limit(OrderSide::Buy, dec!(9.02), dec!(40)));
        }
        assert_eq!(engine.totals().spent, dec!(290));

        // SELL 4 fills while SELL 2 is still open: rebuy 20 @ qp(9.97 * 0.95)
        engine.handle_message(filled(4, OrderSide::Sell, dec!(20), dec!(199.4))).await;

        let orders = exchange.orders.lock().await;
        assert_eq!(orders.len(), 6);
        assert_eq!(orders[5], GridOrderRequest::limit(OrderSide::Buy, dec!(9.47), dec!(20)));
        assert_eq!(engine.totals().received, dec!(199.4));
        assert_eq!(engine.status(), BotStatus::Running);
        assert!(engine.open_orders().contains_key(&6));
    }

    #[tokio::test]
    async fn test_last_sell_fill_drains_and_cancels_each_once() {
        let (exchange, mut engine) = started(dec!(1000)).await;

        engine.handle_message(filled(2, OrderSide::Sell, dec!(10), dec!(105))).await;

        assert_eq!(engine.status(), BotStatus::Draining);
        assert_eq!(engine.stop_reason(), Some(&StopReason::NoSellOrders));
        assert_eq!(exchange.orders.lock().await.len(), 3);
        assert_eq!(engine.totals().received, dec!(105));

        let report = engine.drain().await;
        assert_eq!(report.cancelled, vec![3]);
        assert_eq!(engine.status(), BotStatus::Stopped);
        assert!(engine.open_orders().is_empty());

        let again = engine.drain().await;
        assert_eq!(again.attempted(), 0);
        assert_eq!(*exchange.cancelled_oids.lock().await, vec![3]);
    }

    #[tokio::test]
    async fn test_unmanaged_reports_are_ignored() {
        let (exchange, mut engine) = started(dec!(1000)).await;

        engine.handle_message(filled(99, OrderSide::Sell, dec!(10), dec!(105))).await;
        engine.handle_message(closed(98, OrderSide::Sell, OrderStatus::Canceled)).await;

        assert_eq!(exchange.orders.lock().await.len(), 3);
        assert_eq!(engine.open_orders().len(), 2);
        assert_eq!(engine.totals().received, dec!(0));
        assert_eq!(engine.status(), BotStatus::Running);
    }

    #[tokio::test]
    async fn test_partial_fills_accumulate_before_fill() {
        let (exchange, mut engine) = engine(dec!(1000));
        engine.handle_message(begin()).await;

        engine.handle_message(report(1, OrderSide::Buy, OrderStatus::PartiallyFilled, dec!(4), dec!(40))).await;
        engine.handle_message(report(1, OrderSide::Buy, OrderStatus::PartiallyFilled, dec!(5), dec!(50))).await;
        assert_eq!(engine.open_orders()[&1].cumulative_base_quantity(), dec!(9));
        assert_eq!(exchange.orders.lock().await.len(), 1);

        engine.handle_message(filled(1, OrderSide::Buy, dec!(1), dec!(10))).await;

        let orders = exchange.orders.lock().await;
        assert_eq!(orders[1], GridOrderRequest::limit(OrderSide::Sell, dec!(10.50), dec!(10)));
        assert_eq!(engine.totals().spent, dec!(100));
    }

    #[tokio::test]
    async fn test_cancel_with_no_sells_drains() {
        let (_exchange, mut engine) = engine(dec!(1000));
        engine.handle_message(begin()).await;

        engine.handle_message(closed(1, OrderSide::Buy, OrderStatus::Canceled)).await;

        assert!(engine.open_orders().is_empty());
        assert_eq!(engine.status(), BotStatus::Draining);
        assert_eq!(engine.stop_reason(), Some(&StopReason::NoSellOrders));
    }

    #[tokio::test]
    async fn test_non_terminal_statuses_are_no_ops() {
        let (_exchange, mut engine) = started(dec!(1000)).await;

        engine.handle_message(closed(2, OrderSide::Sell, OrderStatus::New)).await;
        engine.handle_message(closed(2, OrderSide::Sell, OrderStatus::PendingCancel)).await;
        assert_eq!(engine.open_orders().len(), 2);

        engine.handle_message(closed(3, OrderSide::Buy, OrderStatus::ExpiredInMatch)).await;
        assert_eq!(engine.open_orders().len(), 1);
        assert_eq!(engine.status(), BotStatus::Running);
    }

    #[tokio::test]
    async fn test_every_terminal_status_closes_the_last_sell() {
        for status in [OrderStatus::Rejected, OrderStatus::Expired, OrderStatus::ExpiredInMatch] {
            let (_exchange, mut engine) = started(dec!(1000)).await;

            engine.handle_message(closed(2, OrderSide::Sell, status)).await;

            assert_eq!(engine.open_orders().keys().copied().collect::<Vec<_>>(), vec![3]);
            assert_eq!(engine.status(), BotStatus::Draining, "{:?}", status);
            assert_eq!(engine.stop_reason(), Some(&StopReason::NoSellOrders));
        }
    }

    #[tokio::test]
    async fn test_placement_failure_leaves_table_unchanged() {
        let (exchange, mut engine) = started(dec!(1000)).await;
        exchange.set_should_fail(true).await;

        engine.handle_message(filled(3, OrderSide::Buy, dec!(20), dec!(190))).await;

        assert_eq!(engine.open_orders().keys().copied().collect::<Vec<_>>(), vec![2]);
        assert_eq!(engine.totals().spent, dec!(290));
        assert_eq!(engine.status(), BotStatus::Running);
    }

    #[tokio::test]
    async fn test_initial_buy_failure_drains() {
        let (exchange, mut engine) = engine(dec!(1000));
        exchange.set_should_fail(true).await;

        engine.handle_message(begin()).await;

        assert_eq!(engine.status(), BotStatus::Draining);
        assert_eq!(engine.stop_reason(), Some(&StopReason::InitialOrderFailed));
        assert_eq!(engine.drain().await.attempted(), 0);
        assert_eq!(engine.status(), BotStatus::Stopped);
    }

    #[tokio::test]
    async fn test_run_stops_on_feed_closed() {
        let (exchange, mut engine) = engine(dec!(1000));
        let (tx, rx) = mpsc::unbounded_channel();
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        tx.send(begin()).unwrap();
        tx.send(filled(1, OrderSide::Buy, dec!(10), dec!(100))).unwrap();
        tx.send(GridMessage::FeedClosed("feed ended".into())).unwrap();

        let reason = engine.run(rx, shutdown_rx).await.unwrap();
        assert_eq!(reason, StopReason::FeedClosed("feed ended".into()));
        assert_eq!(engine.status(), BotStatus::Draining);

        let report = engine.drain().await;
        assert_eq!(report.cancelled, vec![2, 3]);
        assert_eq!(*exchange.cancelled_oids.lock().await, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_run_stops_on_channel_close_and_shutdown_signal() {
        let (_exchange, mut engine) = engine(dec!(1000));
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        drop(shutdown_tx);
        tx.send(begin()).unwrap();
        drop(tx);

        assert_eq!(engine.run(rx, shutdown_rx).await.unwrap(), StopReason::ChannelClosed);

        let (_exchange, mut engine) = self::engine(dec!(1000));
        let (_tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        shutdown_tx.send(()).unwrap();

        assert_eq!(engine.run(rx, shutdown_rx).await.unwrap(), StopReason::Interrupted);
        assert!(matches!(
            engine.run(mpsc::unbounded_channel().1, shutdown_tx.subscribe()).await,
            Err(GridError::InvalidState { .. })
        ));
    }
}
