//! User-data stream payloads.
//!
//! Frames are JSON objects discriminated by their `e` field. Only execution
//! reports and lease expiry are decoded further; every other kind is passed
//! through by name.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::Error;
use crate::grid::types::{ExecutionReport, StreamEvent};

pub const EXECUTION_REPORT: &str = "executionReport";
pub const LISTEN_KEY_EXPIRED: &str = "listenKeyExpired";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListenKeyExpired {
    #[serde(default)]
    listen_key: String,
}

/// Decode one text frame from the user-data stream
pub fn decode_event(text: &str) -> Result<StreamEvent, Error> {
    let value: Value = serde_json::from_str(text)?;
    let kind = value.get("e").and_then(Value::as_str).unwrap_or_default().to_string();

    match kind.as_str() {
        EXECUTION_REPORT => {
            let report: ExecutionReport = serde_json::from_value(value)?;
            Ok(StreamEvent::ExecutionReport(report))
        }
        LISTEN_KEY_EXPIRED => {
            let expired: ListenKeyExpired = serde_json::from_value(value)?;
            Ok(StreamEvent::LeaseExpired {
                lease_id: expired.listen_key,
            })
        }
        _ => Ok(StreamEvent::Other(kind)),
    }
}
