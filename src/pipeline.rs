//! The request pipeline (§4.1) — the state machine that parses the
//! envelope, applies interceptors, selects an upstream, proxies, and
//! writes the response. Control flow never fans out; every request is
//! handled to completion on its own path.

use crate::error::GatewayError;
use crate::policy;
use crate::state::AppState;
use crate::types::{JsonRpcRequest, JsonRpcResponse};
use crate::writer::ResponseWriter;
use crate::{blacklist, nonce_store, protection, tx, upstream};
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// The fixed message the tx-manager returns when a bundle has exhausted
/// its retries (§4.7).
const FAIL_BUNDLE_MESSAGE: &str = "Bundle submitted has already failed too many times";

/// The fixed error the gateway emits for a blacklisted raw tx (§4.2 step 2).
const BLACKLIST_MESSAGE: &str = "rawTx blocked because bundle failed too many times";

/// ABI-encoded `true`, the flash-RPC self-identification result (§4.4).
const FLASH_PROBE_RESULT: &str =
    "0x0000000000000000000000000000000000000000000000000000000000000001";

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// One per inbound call; created at accept, used for the life of the
/// request (§3).
struct RequestContext {
    uid: u64,
    started_at: Instant,
    client_ip: String,
    default_upstream: String,
    tx_manager_upstream: String,
}

/// A fully-formed success-path response: the pipeline always resolves to
/// either one of these or a [`GatewayError`] (§7).
struct Outcome {
    status: StatusCode,
    body: JsonRpcResponse,
}

/// Axum handler entry point.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let writer = ResponseWriter::new();
    match route(&state, peer, &headers, &query, &body).await {
        Ok(outcome) => writer.write_json(outcome.status, outcome.body),
        Err(e) => {
            let status = e.status();
            warn!(error = %e, %status, "request rejected");
            writer.write_empty(status)
        }
    }
}

async fn route(
    state: &Arc<AppState>,
    peer: SocketAddr,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
    body: &[u8],
) -> Result<Outcome, GatewayError> {
    // ── Phase 1: Entry ───────────────────────────────────────────
    let client_ip = policy::get_client_ip(headers, peer);
    if policy::is_ip_blocked(&state.config, &client_ip) {
        return Err(GatewayError::PolicyDenied("client IP is blacklisted"));
    }

    let mut ctx = RequestContext {
        uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
        started_at: Instant::now(),
        client_ip,
        default_upstream: state.config.default_upstream_url.clone(),
        tx_manager_upstream: state.config.tx_manager_url.clone(),
    };

    // ── Phase 2: Override ───────────────────────────────────────
    if let Some(url) = query.get(&state.config.override_query_param) {
        if url.len() > 1 {
            ctx.default_upstream = url.clone();
        }
    }

    // ── Phase 3: Parse ───────────────────────────────────────────
    let req: JsonRpcRequest = serde_json::from_slice(body)
        .map_err(|_| GatewayError::ClientFault("envelope decode failed"))?;

    info!(
        uid = ctx.uid,
        method = %req.method,
        client_ip = %ctx.client_ip,
        "request accepted"
    );

    // ── Phase 4: Dispatch ────────────────────────────────────────
    let outcome = match req.method.as_str() {
        "eth_sendRawTransaction" => handle_send_raw(state, &ctx, &req, body).await?,
        "eth_getTransactionCount" => match handle_nonce_retry(state, &req) {
            Some(body) => Outcome {
                status: StatusCode::OK,
                body,
            },
            None => proxy_fallthrough(state, &ctx.default_upstream, &req, body).await?,
        },
        "eth_call" => match handle_flash_probe(state, &req) {
            Some(body) => Outcome {
                status: StatusCode::OK,
                body,
            },
            None => proxy_fallthrough(state, &ctx.default_upstream, &req, body).await?,
        },
        "net_version" => Outcome {
            status: StatusCode::OK,
            body: JsonRpcResponse::success(req.id.clone(), Value::from("1")),
        },
        _ => proxy_fallthrough(state, &ctx.default_upstream, &req, body).await?,
    };

    info!(
        uid = ctx.uid,
        elapsed_ms = ctx.started_at.elapsed().as_millis() as u64,
        "request handled"
    );
    Ok(outcome)
}

/// §4.2 — send-raw handler.
async fn handle_send_raw(
    state: &Arc<AppState>,
    ctx: &RequestContext,
    req: &JsonRpcRequest,
    body: &[u8],
) -> Result<Outcome, GatewayError> {
    // Step 1: params[0] must be a non-empty hex string.
    let raw_tx_hex = match req.params.as_array().and_then(|p| p.first()) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => return Err(GatewayError::ClientFault("params[0] must be a non-empty hex string")),
    };

    // Step 2: blacklist check — HTTP 200, error carried in the envelope.
    if blacklist::is_blacklisted(&raw_tx_hex) {
        info!(uid = ctx.uid, "send-raw: raw tx is blacklisted, short-circuiting");
        return Ok(Outcome {
            status: StatusCode::OK,
            body: JsonRpcResponse::internal_error(req.id.clone(), BLACKLIST_MESSAGE),
        });
    }

    // Step 3: decode.
    let decoded = tx::decode_raw_tx(&raw_tx_hex).map_err(|e| {
        warn!(uid = ctx.uid, error = %e, "send-raw: decode failed");
        GatewayError::ClientFault("raw tx could not be decoded")
    })?;

    // Step 4: recover sender.
    let sender = tx::recover_sender(&decoded).map_err(|e| {
        warn!(uid = ctx.uid, error = %e, "send-raw: sender recovery failed");
        GatewayError::ClientFault("sender could not be recovered from signature")
    })?;

    // Step 5: OFAC check.
    if policy::is_ofac_listed(&state.config, &sender) {
        warn!(uid = ctx.uid, sender = %sender, "send-raw: OFAC-listed sender");
        return Err(GatewayError::PolicyDenied("sender is OFAC-listed"));
    }

    // Step 6: protection predicate and upstream selection.
    let upstream_url = if protection::needs_protection(&decoded, &state.config) {
        info!(uid = ctx.uid, sender = %sender, "send-raw: routing through tx-manager");
        &ctx.tx_manager_upstream
    } else {
        info!(uid = ctx.uid, sender = %sender, "send-raw: routing through default upstream");
        &ctx.default_upstream
    };

    // Step 7: proxy.
    let timeout = Duration::from_secs(state.config.upstream_timeout_secs);
    let (upstream_status, envelope) =
        match upstream::post_upstream(&state.client, upstream_url, body, timeout).await {
            upstream::ProxyOutcome::Failed => {
                return Err(GatewayError::UpstreamFailure("send-raw proxy call failed"))
            }
            upstream::ProxyOutcome::Forwarded(status, envelope) => (status, envelope),
        };

    if let Some(error) = &envelope.error {
        // Step 8: upstream JSON-RPC error — fail-bundle feedback runs as
        // a side effect, the envelope forwards verbatim.
        if error.message == FAIL_BUNDLE_MESSAGE {
            run_fail_bundle_feedback(state, ctx, &raw_tx_hex, &sender).await;
        }
        Ok(Outcome {
            status: upstream_status,
            body: envelope,
        })
    } else {
        // Step 9: success — the client sees the locally computed tx
        // hash, never the upstream's (possibly bundle) hash.
        let hash_hex = format!("{:#x}", decoded.hash);
        Ok(Outcome {
            status: StatusCode::OK,
            body: JsonRpcResponse::success(req.id.clone(), Value::String(hash_hex)),
        })
    }
}

/// §4.3 — nonce-retry interceptor. `None` means "not handled", i.e. the
/// pipeline should proxy normally.
fn handle_nonce_retry(state: &Arc<AppState>, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    let sender = req
        .params
        .as_array()
        .and_then(|p| p.first())
        .and_then(|v| v.as_str())?;

    match nonce_store::lookup_and_advance(sender, state.config.nonce_retry_max) {
        nonce_store::LookupOutcome::NotHandled => None,
        nonce_store::LookupOutcome::Synthetic(nonce) => Some(JsonRpcResponse::success(
            req.id.clone(),
            Value::String(format!("0x{:x}", nonce)),
        )),
    }
}

/// §4.4 — flash-RPC self-identification interceptor.
fn handle_flash_probe(state: &Arc<AppState>, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    let call = req.params.as_array().and_then(|p| p.first())?;
    let to = call.get("to").and_then(|v| v.as_str())?.to_lowercase();
    let data = call
        .get("data")
        .or_else(|| call.get("input"))
        .and_then(|v| v.as_str())?
        .to_lowercase();

    if to == state.config.flash_probe_to && data == state.config.flash_probe_data {
        Some(JsonRpcResponse::success(
            req.id.clone(),
            Value::String(FLASH_PROBE_RESULT.to_string()),
        ))
    } else {
        None
    }
}

/// §4.5 — proxy for every method not enumerated in dispatch, and for the
/// two interceptors' fallthrough path.
async fn proxy_fallthrough(
    state: &Arc<AppState>,
    upstream_url: &str,
    req: &JsonRpcRequest,
    body: &[u8],
) -> Result<Outcome, GatewayError> {
    let timeout = Duration::from_secs(state.config.upstream_timeout_secs);
    match upstream::post_upstream(&state.client, upstream_url, body, timeout).await {
        upstream::ProxyOutcome::Forwarded(status, mut envelope) => {
            envelope.id = req.id.clone();
            Ok(Outcome {
                status,
                body: envelope,
            })
        }
        upstream::ProxyOutcome::Failed => {
            Err(GatewayError::UpstreamFailure("proxy call failed"))
        }
    }
}

/// §4.7 — fail-bundle feedback.
async fn run_fail_bundle_feedback(
    state: &Arc<AppState>,
    ctx: &RequestContext,
    raw_tx_hex: &str,
    sender: &str,
) {
    blacklist::insert_and_sweep(raw_tx_hex, state.config.raw_tx_blacklist_ttl_secs);

    let timeout = Duration::from_secs(state.config.upstream_timeout_secs);
    match upstream::fetch_nonce(&state.client, &ctx.default_upstream, sender, timeout).await {
        Some(nonce) => {
            nonce_store::seed(sender, nonce);
            info!(uid = ctx.uid, sender, nonce, "fail-bundle: nonce-retry store seeded");
        }
        None => {
            warn!(uid = ctx.uid, sender, "fail-bundle: nonce fetch failed, retry store left empty");
        }
    }
}
