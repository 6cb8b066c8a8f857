#![deny(unreachable_pub)]
pub mod config;
pub mod consts;
pub mod errors;
pub mod exchange;
pub mod grid;
pub mod runner;

pub use consts::{MAINNET_API_URL, MAINNET_WS_URL, TESTNET_API_URL, TESTNET_WS_URL};
pub use errors::Error;
pub use exchange::{BaseUrl, RequestSigner, SpotClient};
