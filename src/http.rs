//! Blocking HTTP fetch handed to network-backed providers by the binary.
//!
//! The providers only ever see a [`JsonFetch`]; tests inject fakes instead.
//! Timeouts are enforced by the SWR cache, not here.

use std::sync::Arc;

use tracing::debug;

use crate::error::HopError;
use crate::providers::JsonFetch;

const USER_AGENT: &str = concat!("hop-launcher/", env!("CARGO_PKG_VERSION"));

/// GET `url` and decode the body as JSON.
pub fn get_json(url: &str) -> anyhow::Result<serde_json::Value> {
    debug!(url = url, "HTTP GET");
    let response = ureq::get(url)
        .header("User-Agent", USER_AGENT)
        .header("Accept", "application/json")
        .call()
        .map_err(|e| HopError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

    let body: serde_json::Value = response
        .into_body()
        .read_json()
        .map_err(|e| HopError::Fetch {
            url: url.to_string(),
            message: format!("invalid JSON: {}", e),
        })?;
    Ok(body)
}

pub fn ureq_json_fetch() -> JsonFetch {
    Arc::new(get_json)
}
