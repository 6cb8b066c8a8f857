//! Spot exchange gateway: signed REST calls and the user-data stream

pub mod client;
pub mod events;
pub mod signer;
pub mod stream;
pub mod types;

pub use client::{BaseUrl, SpotClient};
pub use signer::RequestSigner;
pub use stream::{connect_user_stream, EventFeed};
