//! Signed REST client for the spot API.

use std::time::Duration;

use chrono::Utc;
use log::debug;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::consts::{
    DEFAULT_REQUEST_TIMEOUT_SECS, MAINNET_API_URL, MAINNET_WS_URL, TESTNET_API_URL, TESTNET_WS_URL,
};
use crate::errors::Error;
use crate::grid::types::GridOrderRequest;

use super::signer::{RequestSigner, API_KEY_HEADER};
use super::types::{ApiError, CancelOrderResult, ExchangeInformation, ListenKeyResponse, OrderAck, SymbolInfo};

const ORDER_PATH: &str = "/api/v3/order";
const EXCHANGE_INFO_PATH: &str = "/api/v3/exchangeInfo";
const USER_DATA_STREAM_PATH: &str = "/api/v3/userDataStream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseUrl {
    Mainnet,
    Testnet,
}

impl BaseUrl {
    pub(crate) fn rest_url(&self) -> &'static str {
        match self {
            BaseUrl::Mainnet => MAINNET_API_URL,
            BaseUrl::Testnet => TESTNET_API_URL,
        }
    }

    pub(crate) fn ws_url(&self) -> &'static str {
        match self {
            BaseUrl::Mainnet => MAINNET_WS_URL,
            BaseUrl::Testnet => TESTNET_WS_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpotClient {
    http_client: reqwest::Client,
    signer: RequestSigner,
    rest_url: String,
    ws_url: String,
}

impl SpotClient {
    pub fn new(base_url: BaseUrl, signer: RequestSigner) -> Result<Self, Error> {
        Self::with_endpoints(
            base_url.rest_url(),
            base_url.ws_url(),
            signer,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Build a client against explicit endpoints (overrides, local gateways)
    pub fn with_endpoints(
        rest_url: impl Into<String>,
        ws_url: impl Into<String>,
        signer: RequestSigner,
        request_timeout: Duration,
    ) -> Result<Self, Error> {
        let http_client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http_client,
            signer,
            rest_url: rest_url.into().trim_end_matches('/').to_string(),
            ws_url: ws_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Place an order and return the exchange-assigned order id
    pub async fn place_order(&self, symbol: &str, request: &GridOrderRequest) -> Result<u64, Error> {
        let params = order_params(symbol, request, &Uuid::new_v4().simple().to_string());
        debug!("Placing order: {:?}", params);

        let ack: OrderAck = self.signed(Method::POST, ORDER_PATH, params).await?;
        Ok(ack.order_id)
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: u64) -> Result<CancelOrderResult, Error> {
        let params = vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        self.signed(Method::DELETE, ORDER_PATH, params).await
    }

    pub async fn exchange_info(&self, symbol: &str) -> Result<ExchangeInformation, Error> {
        let url = format!("{}{}", self.rest_url, EXCHANGE_INFO_PATH);
        let request = self.http_client.get(url).query(&[("symbol", symbol)]);
        self.send(request).await
    }

    /// Trading rules for `symbol`, `None` if the exchange does not list it
    pub async fn symbol_info(&self, symbol: &str) -> Result<Option<SymbolInfo>, Error> {
        let info = self.exchange_info(symbol).await?;
        Ok(info.symbols.into_iter().find(|s| s.symbol == symbol))
    }

    pub async fn open_user_data_stream(&self) -> Result<String, Error> {
        let response: ListenKeyResponse = self.keyed(Method::POST, None).await?;
        Ok(response.listen_key)
    }

    pub async fn renew_user_data_stream(&self, listen_key: &str) -> Result<(), Error> {
        let _: serde_json::Value = self.keyed(Method::PUT, Some(listen_key)).await?;
        Ok(())
    }

    pub async fn close_user_data_stream(&self, listen_key: &str) -> Result<(), Error> {
        let _: serde_json::Value = self.keyed(Method::DELETE, Some(listen_key)).await?;
        Ok(())
    }

    async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&'static str, String)>,
    ) -> Result<T, Error> {
        let query = self.signer.sign(&mut params, Utc::now().timestamp_millis())?;
        let url = format!("{}{}?{}", self.rest_url, path, query);
        let request = self
            .http_client
            .request(method, url)
            .header(API_KEY_HEADER, self.signer.api_key());
        self.send(request).await
    }

    /// Listen-key endpoints authenticate with the API key header only
    async fn keyed<T: DeserializeOwned>(&self, method: Method, listen_key: Option<&str>) -> Result<T, Error> {
        let url = format!("{}{}", self.rest_url, USER_DATA_STREAM_PATH);
        let mut request = self
            .http_client
            .request(method, url)
            .header(API_KEY_HEADER, self.signer.api_key());
        if let Some(key) = listen_key {
            request = request.query(&[("listenKey", key)]);
        }
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiError>(&text) {
                Ok(err) => Error::Exchange {
                    code: err.code,
                    message: err.msg,
                },
                Err(_) => Error::Transport(format!("HTTP {status}: {text}")),
            });
        }

        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(format!("{e}: {text}")))
    }
}

fn order_params(symbol: &str, request: &GridOrderRequest, client_order_id: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![("symbol", symbol.to_string()), ("side", request.side.as_str().to_string())];

    match request.price {
        None => {
            params.push(("type", "MARKET".to_string()));
            let size_field = if request.quote_quantity { "quoteOrderQty" } else { "quantity" };
            params.push((size_field, request.quantity.to_string()));
        }
        Some(price) => {
            params.push(("type", "LIMIT".to_string()));
            params.push(("timeInForce", "GTC".to_string()));
            params.push(("quantity", request.quantity.to_string()));
            params.push(("price", price.to_string()));
        }
    }

    params.push(("newClientOrderId", client_order_id.to_string()));
    params.push(("newOrderRespType", "ACK".to_string()));
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::types::OrderSide;
    use rust_decimal_macros::dec;

    fn value<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_market_quote_order_params() {
        let request = GridOrderRequest::market_quote(OrderSide::Buy, dec!(100));
        let params = order_params("ABCUSDT", &request, "abc");

        assert_eq!(value(&params, "type"), Some("MARKET"));
        assert_eq!(value(&params, "quoteOrderQty"), Some("100"));
        assert_eq!(value(&params, "quantity"), None);
        assert_eq!(value(&params, "timeInForce"), None);
        assert_eq!(value(&params, "newOrderRespType"), Some("ACK"));
    }

    #[test]
    fn test_limit_order_params() {
        let request = GridOrderRequest::limit(OrderSide::Sell, dec!(10.50000000), dec!(10.00000000));
        let params = order_params("ABCUSDT", &request, "abc");

        assert_eq!(value(&params, "side"), Some("SELL"));
        assert_eq!(value(&params, "type"), Some("LIMIT"));
        assert_eq!(value(&params, "timeInForce"), Some("GTC"));
        assert_eq!(value(&params, "price"), Some("10.50000000"));
        assert_eq!(value(&params, "quantity"), Some("10.00000000"));
        assert_eq!(value(&params, "newClientOrderId"), Some("abc"));
    }

    #[test]
    fn test_base_urls() {
        assert_eq!(BaseUrl::Mainnet.rest_url(), MAINNET_API_URL);
        assert_eq!(BaseUrl::Testnet.ws_url(), TESTNET_WS_URL);
    }

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let client = SpotClient::with_endpoints(
            "http://localhost:8080/",
            "ws://localhost:8081/",
            RequestSigner::new("k", "s"),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.rest_url(), "http://localhost:8080");
        assert_eq!(client.ws_url(), "ws://localhost:8081");
    }
}
