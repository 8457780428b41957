// src/fetch/mod.rs

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, instrument};
use url::Url;

use crate::error::FetchError;

pub mod raw;

pub use raw::{load_raw, save_raw};

/// GET `url` and parse the body as a JSON array of records.
///
/// Each failure class gets its own `FetchError` variant: connection,
/// timeout, non-2xx status (code and body) and malformed payload. No retries.
#[instrument(level = "info", skip(client, url), fields(url = %url))]
pub async fn fetch_records(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<Vec<Value>, FetchError> {
    info!("requesting source document");
    let resp = client
        .get(url.as_str())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify(url, timeout, e))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!(status = status.as_u16(), "source returned an error status");
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let bytes = resp.bytes().await.map_err(|e| classify(url, timeout, e))?;
    let records = parse_records(url.as_str(), &bytes)?;
    info!(records = records.len(), bytes = bytes.len(), "fetched source document");
    Ok(records)
}

fn classify(url: &Url, timeout: Duration, err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else if err.is_decode() || err.is_body() {
        FetchError::MalformedPayload {
            source_name: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        FetchError::Connection {
            url: url.to_string(),
            source: err,
        }
    }
}

/// The document must be a JSON array; its elements are handed to the core
/// as-is (non-object elements are the flattener's business).
pub fn parse_records(source_name: &str, bytes: &[u8]) -> Result<Vec<Value>, FetchError> {
    let malformed = |reason: String| FetchError::MalformedPayload {
        source_name: source_name.to_string(),
        reason,
    };
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Array(records)) => Ok(records),
        Ok(other) => Err(malformed(format!(
            "expected a JSON array of records, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
