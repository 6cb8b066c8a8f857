//! HMAC-SHA256 request signing.
//!
//! Signed endpoints take the URL-encoded parameter string, append a
//! millisecond `timestamp`, and append a hex-encoded HMAC-SHA256 of the
//! result as `signature`. The API key travels separately in a header.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::Error;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the API key on every authenticated request
pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

#[derive(Clone)]
pub struct RequestSigner {
    api_key: String,
    api_secret: String,
}

impl RequestSigner {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex-encoded HMAC-SHA256 of `payload` keyed with the API secret
    pub fn signature(&self, payload: &str) -> Result<String, Error> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| Error::InvalidResponse(format!("invalid API secret: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Appends `timestamp` to `params` and returns the full signed query string.
    pub fn sign(&self, params: &mut Vec<(&'static str, String)>, timestamp_ms: i64) -> Result<String, Error> {
        params.push(("timestamp", timestamp_ms.to_string()));
        let query = serde_urlencoded::to_string(&*params)?;
        let signature = self.signature(&query)?;
        Ok(format!("{query}&signature={signature}"))
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
