//! Upstream client (§4.5, §6) — pure transport. One shared `reqwest::Client`
//! is built once at startup and threaded through via [`crate::AppState`];
//! the teacher's sampled `proxy_to_upstream` built a fresh client per
//! call, which this crate corrects (see DESIGN.md).

use crate::types::JsonRpcResponse;
use axum::http::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

pub enum ProxyOutcome {
    /// Upstream returned a well-formed JSON-RPC envelope (success or
    /// error) — forward it, along with the upstream's HTTP status (§4.1
    /// phase 5, §4.5).
    Forwarded(StatusCode, JsonRpcResponse),
    /// Transport error, timeout, or an undecodable body.
    Failed,
}

/// POST `body` to `url` and parse the response as a JSON-RPC envelope.
pub async fn post_upstream(client: &reqwest::Client, url: &str, body: &[u8], timeout: Duration) -> ProxyOutcome {
    let send = client
        .post(url)
        .header("Content-Type", "application/json")
        .body(body.to_vec())
        .timeout(timeout)
        .send();

    let resp = match tokio::time::timeout(timeout, send).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!(error = %e, "upstream transport error");
            return ProxyOutcome::Failed;
        }
        Err(_) => {
            warn!("upstream call timed out");
            return ProxyOutcome::Failed;
        }
    };

    let status = resp.status();
    match resp.json::<JsonRpcResponse>().await {
        Ok(envelope) => ProxyOutcome::Forwarded(status, envelope),
        Err(e) => {
            warn!(error = %e, "upstream body undecodable as JSON-RPC");
            ProxyOutcome::Failed
        }
    }
}

/// Query `url` for `sender`'s current nonce via `eth_getTransactionCount`.
/// Used only by the fail-bundle feedback loop (§4.7).
pub async fn fetch_nonce(
    client: &reqwest::Client,
    url: &str,
    sender: &str,
    timeout: Duration,
) -> Option<u64> {
    let request = serde_json::json!({
        "id": 1,
        "jsonrpc": "2.0",
        "method": "eth_getTransactionCount",
        "params": [sender, "latest"],
    });

    let send = client.post(url).json(&request).timeout(timeout).send();
    let resp = match tokio::time::timeout(timeout, send).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!(error = %e, sender, "nonce fetch transport error");
            return None;
        }
        Err(_) => {
            warn!(sender, "nonce fetch timed out");
            return None;
        }
    };

    let body: Value = match resp.json().await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, sender, "nonce fetch body undecodable");
            return None;
        }
    };

    let hex = body.get("result")?.as_str()?;
    u64::from_str_radix(hex.trim_start_matches("0x"), 16).ok()
}
