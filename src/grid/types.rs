//! Core data types for grid trading

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Convert to exchange side string
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exchange order status as carried by execution reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Expired,
    ExpiredInMatch,
}

impl OrderStatus {
    /// Order will receive no further reports
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
                | OrderStatus::ExpiredInMatch
        )
    }
}

/// Engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotStatus {
    /// Waiting for the feed to come up; no orders placed yet
    AwaitingStart,
    /// Consuming execution reports
    Running,
    /// Terminal condition reached, residual orders being cancelled
    Draining,
    /// Fully stopped
    Stopped,
}

impl BotStatus {
    /// Check if the engine should keep consuming messages
    pub fn is_active(&self) -> bool {
        matches!(self, BotStatus::AwaitingStart | BotStatus::Running)
    }
}

/// Request to place an order.
///
/// `price = None` means a market order. For market orders `quote_quantity`
/// selects whether `quantity` is denominated in the quote asset.
#[derive(Debug, Clone, PartialEq)]
pub struct GridOrderRequest {
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub quote_quantity: bool,
}

impl GridOrderRequest {
    /// Market order sized in quote currency
    pub fn market_quote(side: OrderSide, amount: Decimal) -> Self {
        Self {
            side,
            quantity: amount,
            price: None,
            quote_quantity: true,
        }
    }

    /// Good-till-cancel limit order
    pub fn limit(side: OrderSide, price: Decimal, quantity: Decimal) -> Self {
        Self {
            side,
            quantity,
            price: Some(price),
            quote_quantity: false,
        }
    }
}

/// Execution report for a single order state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "c", default)]
    pub client_order_id: String,
    #[serde(rename = "S")]
    pub side: OrderSide,
    #[serde(rename = "x", default)]
    pub execution_type: String,
    #[serde(rename = "X")]
    pub status: OrderStatus,
    #[serde(rename = "r", default)]
    pub reject_reason: String,
    #[serde(rename = "i")]
    pub order_id: u64,
    /// Base quantity filled by this event
    #[serde(rename = "l", default)]
    pub last_executed_quantity: Decimal,
    #[serde(rename = "z", default)]
    pub cumulative_filled_quantity: Decimal,
    #[serde(rename = "L", default)]
    pub last_executed_price: Decimal,
    /// Quote value filled by this event
    #[serde(rename = "Y", default)]
    pub last_quote_quantity: Decimal,
    #[serde(rename = "Z", default)]
    pub cumulative_quote_quantity: Decimal,
}

impl ExecutionReport {
    /// Report with no fill attached
    pub fn new(order_id: u64, symbol: impl Into<String>, side: OrderSide, status: OrderStatus) -> Self {
        Self {
            event_time: Utc::now().timestamp_millis(),
            symbol: symbol.into(),
            client_order_id: String::new(),
            side,
            execution_type: String::new(),
            status,
            reject_reason: String::new(),
            order_id,
            last_executed_quantity: Decimal::ZERO,
            cumulative_filled_quantity: Decimal::ZERO,
            last_executed_price: Decimal::ZERO,
            last_quote_quantity: Decimal::ZERO,
            cumulative_quote_quantity: Decimal::ZERO,
        }
    }

    /// Attach a fill increment
    pub fn with_fill(mut self, quantity: Decimal, quote_amount: Decimal) -> Self {
        self.last_executed_quantity = quantity;
        self.last_quote_quantity = quote_amount;
        if !quantity.is_zero() {
            self.last_executed_price = quote_amount / quantity;
        }
        self.cumulative_filled_quantity += quantity;
        self.cumulative_quote_quantity += quote_amount;
        self
    }
}

/// One open order managed by this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridOrder {
    pub side: OrderSide,
    cumulative_quote_amount: Decimal,
    cumulative_base_quantity: Decimal,
}

impl GridOrder {
    pub fn new(side: OrderSide) -> Self {
        Self {
            side,
            cumulative_quote_amount: Decimal::ZERO,
            cumulative_base_quantity: Decimal::ZERO,
        }
    }

    /// Accumulate the fill increment carried by `report`
    pub fn fill(&mut self, report: &ExecutionReport) -> &mut Self {
        self.cumulative_quote_amount += report.last_quote_quantity;
        self.cumulative_base_quantity += report.last_executed_quantity;
        self
    }

    pub fn cumulative_quote_amount(&self) -> Decimal {
        self.cumulative_quote_amount
    }

    pub fn cumulative_base_quantity(&self) -> Decimal {
        self.cumulative_base_quantity
    }

    /// Average fill price, zero while nothing has filled
    pub fn average_price(&self) -> Decimal {
        if self.cumulative_base_quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.cumulative_quote_amount / self.cumulative_base_quantity
        }
    }
}

/// Quote-currency totals over completed fills
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningTotals {
    /// Cost of filled buys
    pub spent: Decimal,
    /// Proceeds of filled sells
    pub received: Decimal,
}

impl RunningTotals {
    pub fn add_spent(&mut self, amount: Decimal) {
        self.spent += amount;
    }

    pub fn add_received(&mut self, amount: Decimal) {
        self.received += amount;
    }

    /// Quote currency still committed (spent minus received)
    pub fn exposure(&self) -> Decimal {
        self.spent - self.received
    }
}

/// Item produced by the exchange's live event feed
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Connection established, events will follow
    Ready,
    ExecutionReport(ExecutionReport),
    /// The data-stream lease expired on the exchange side
    LeaseExpired { lease_id: String },
    /// Any other event kind, by name
    Other(String),
}

/// Message consumed by the engine loop
#[derive(Debug, Clone, PartialEq)]
pub enum GridMessage {
    Begin { timestamp: DateTime<Utc> },
    Execution(ExecutionReport),
    /// The live feed is gone and will not come back
    FeedClosed(String),
}

/// Why the engine left its consuming loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// No sell order remains open
    NoSellOrders,
    /// The opening market buy could not be placed
    InitialOrderFailed,
    FeedClosed(String),
    /// All message producers went away
    ChannelClosed,
    /// Operator requested shutdown
    Interrupted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::NoSellOrders => write!(f, "no sell orders remain"),
            StopReason::InitialOrderFailed => write!(f, "initial order failed"),
            StopReason::FeedClosed(reason) => write!(f, "feed closed: {reason}"),
            StopReason::ChannelClosed => write!(f, "message channel closed"),
            StopReason::Interrupted => write!(f, "interrupted"),
        }
    }
}
