//! Shared utilities for talking to Ethereum JSON-RPC endpoints.

use std::{future::Future, time::Duration};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

/// Default timeout for a single RPC request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or the node answered
/// with an error object. A `null` result deserializes fine into an `Option<T>`.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request to {}", method, url))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error from {}: {} (code {})",
            method,
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown"),
            error.get("code").and_then(|c| c.as_i64()).unwrap_or_default()
        );
    }

    let result_value = result
        .get("result")
        .with_context(|| format!("No result in {} response", method))?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// The wait of [`poll_until`] ran out.
#[derive(Debug)]
pub struct PollTimeout {
    /// Error of the most recent failed poll, if any poll failed.
    pub last_error: Option<anyhow::Error>,
}

/// Poll `check_fn` until it yields a value or `timeout` elapses.
///
/// `Ok(None)` means "not yet". Errors are logged and retried, so a flaky endpoint
/// does not end the wait early; the last one is handed back on timeout.
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, PollTimeout>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let deadline = Instant::now() + timeout;
    let mut last_error = None;

    loop {
        match tokio::time::timeout_at(deadline, check_fn()).await {
            Ok(Ok(Some(value))) => return Ok(value),
            Ok(Ok(None)) => {
                tracing::trace!(target_name = %name, "Not available yet, polling again...");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, target_name = %name, "Poll failed, retrying...");
                last_error = Some(e);
            }
            Err(_) => return Err(PollTimeout { last_error }),
        }

        let next = Instant::now() + interval;
        if next >= deadline {
            tokio::time::sleep_until(deadline).await;
            return Err(PollTimeout { last_error });
        }
        tokio::time::sleep_until(next).await;
    }
}
