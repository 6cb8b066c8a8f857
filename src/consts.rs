use std::time::Duration;

pub static MAINNET_API_URL: &str = "https://api.binance.com";
pub static MAINNET_WS_URL: &str = "wss://stream.binance.com:9443";
pub static TESTNET_API_URL: &str = "https://testnet.binance.vision";
pub static TESTNET_WS_URL: &str = "wss://testnet.binance.vision";

/// Data-stream leases expire after 60 minutes without a keepalive.
pub const LEASE_RENEW_INTERVAL: Duration = Duration::from_secs(30 * 60);

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Scale used when rendering quantized prices and quantities
pub const ORDER_DECIMAL_SCALE: u32 = 8;
