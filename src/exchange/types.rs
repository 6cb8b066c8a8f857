//! REST wire payloads for the spot API

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::grid::quantizer::SymbolRules;
use crate::grid::types::{OrderSide, OrderStatus};

/// Error body returned with non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenKeyResponse {
    pub listen_key: String,
}

/// `newOrderRespType=ACK` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default)]
    pub order_list_id: i64,
    pub client_order_id: String,
    pub transact_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResult {
    pub symbol: String,
    pub order_id: u64,
    #[serde(default)]
    pub orig_client_order_id: String,
    pub status: OrderStatus,
    pub side: OrderSide,
    #[serde(default)]
    pub executed_qty: Decimal,
}

/// Symbol filters; only the two used for quantization are decoded
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER", rename_all = "camelCase")]
    Price {
        min_price: Decimal,
        max_price: Decimal,
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize {
        min_qty: Decimal,
        max_qty: Decimal,
        step_size: Decimal,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub filters: Vec<SymbolFilter>,
}

impl SymbolInfo {
    /// Extract price and lot-size rules; `None` if either filter is missing
    pub fn rules(&self) -> Option<(Decimal, Decimal, Decimal, Decimal, Decimal, Decimal)> {
        let (tick, min_price, max_price) = self.filters.iter().find_map(|f| match f {
            SymbolFilter::Price {
                min_price,
                max_price,
                tick_size,
            } => Some((*tick_size, *min_price, *max_price)),
            _ => None,
        })?;
        let (step, min_qty, max_qty) = self.filters.iter().find_map(|f| match f {
            SymbolFilter::LotSize {
                min_qty,
                max_qty,
                step_size,
            } => Some((*step_size, *min_qty, *max_qty)),
            _ => None,
        })?;
        Some((tick, min_price, max_price, step, min_qty, max_qty))
    }

    pub fn symbol_rules(&self) -> Option<crate::grid::GridResult<SymbolRules>> {
        self.rules()
            .map(|(tick, min_price, max_price, step, min_qty, max_qty)| {
                SymbolRules::new(tick, min_price, max_price, step, min_qty, max_qty)
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeInformation {
    pub timezone: String,
    pub server_time: i64,
    pub symbols: Vec<SymbolInfo>,
}
