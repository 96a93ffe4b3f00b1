//! Configuration for the JSON-RPC gateway.

use anyhow::{Context, Result};
use std::collections::HashSet;

fn parse_csv_set(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Default public-node JSON-RPC URL.
    pub default_upstream_url: String,

    /// Private tx-manager URL used when a transaction needs protection.
    pub tx_manager_url: String,

    /// Host to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Gas below which a transaction never needs protection (§4.6).
    pub protection_gas_floor: u64,

    /// Function selectors (4-byte hex, `0x`-prefixed) exempt from protection.
    pub selector_whitelist: HashSet<String>,

    /// IPs denied at entry.
    pub ip_blacklist: HashSet<String>,

    /// Sanctioned addresses (lowercase hex), denied on send-raw.
    pub ofac_addresses: HashSet<String>,

    /// Raw-tx blacklist TTL in seconds (default: 4 hours).
    pub raw_tx_blacklist_ttl_secs: u64,

    /// Number of synthetic nonce responses before a retry-store entry
    /// retires and the client resynchronises with the chain (default: 4).
    pub nonce_retry_max: u32,

    /// Body-read timeout in seconds.
    pub body_read_timeout_secs: u64,

    /// Upstream call timeout in seconds (applies to both the main proxy
    /// call and the secondary nonce-fetch call in the fail-bundle path).
    pub upstream_timeout_secs: u64,

    /// Query-parameter name recognised as a default-upstream override.
    pub override_query_param: String,

    /// Compiled-in flash-RPC self-identification probe: `(to, calldata)`,
    /// both lowercase hex, `0x`-prefixed.
    pub flash_probe_to: String,
    pub flash_probe_data: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            default_upstream_url: std::env::var("GATEWAY_DEFAULT_UPSTREAM")
                .unwrap_or_else(|_| "https://eth-mainnet.g.alchemy.com/v2/demo".into()),
            tx_manager_url: std::env::var("GATEWAY_TX_MANAGER_UPSTREAM")
                .unwrap_or_else(|_| "https://protect.flashbots.net/v1/rpc".into()),
            host: std::env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: std::env::var("GATEWAY_PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .context("invalid GATEWAY_PORT")?,
            protection_gas_floor: std::env::var("GATEWAY_PROTECTION_GAS_FLOOR")
                .unwrap_or_else(|_| "42000".into())
                .parse()
                .context("invalid GATEWAY_PROTECTION_GAS_FLOOR")?,
            selector_whitelist: parse_csv_set(
                &std::env::var("GATEWAY_SELECTOR_WHITELIST").unwrap_or_default(),
            ),
            ip_blacklist: parse_csv_set(&std::env::var("GATEWAY_IP_BLACKLIST").unwrap_or_default()),
            ofac_addresses: parse_csv_set(
                &std::env::var("GATEWAY_OFAC_ADDRESSES").unwrap_or_default(),
            ),
            raw_tx_blacklist_ttl_secs: std::env::var("GATEWAY_BLACKLIST_TTL_SECS")
                .unwrap_or_else(|_| (4 * 3600).to_string())
                .parse()
                .context("invalid GATEWAY_BLACKLIST_TTL_SECS")?,
            nonce_retry_max: std::env::var("GATEWAY_NONCE_RETRY_MAX")
                .unwrap_or_else(|_| "4".into())
                .parse()
                .context("invalid GATEWAY_NONCE_RETRY_MAX")?,
            body_read_timeout_secs: std::env::var("GATEWAY_BODY_READ_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            upstream_timeout_secs: std::env::var("GATEWAY_UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()
                .unwrap_or(10),
            override_query_param: std::env::var("GATEWAY_OVERRIDE_QUERY_PARAM")
                .unwrap_or_else(|_| "url".into()),
            flash_probe_to: std::env::var("GATEWAY_FLASH_PROBE_TO")
                .unwrap_or_else(|_| "0x000000000000000000000000000000000000dead".into())
                .to_lowercase(),
            flash_probe_data: std::env::var("GATEWAY_FLASH_PROBE_DATA")
                .unwrap_or_else(|_| "0xf1a5eb00".into())
                .to_lowercase(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_set_trims_and_lowercases() {
        let set = parse_csv_set(" 0xABC, 0xdef ,, 0xGHI");
        assert!(set.contains("0xabc"));
        assert!(set.contains("0xdef"));
        assert!(set.contains("0xghi"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn csv_set_empty_input_is_empty_set() {
        assert!(parse_csv_set("").is_empty());
    }
}
