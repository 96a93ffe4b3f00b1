//! Policy oracles — boolean queries over request/transaction attributes.
//! Each is a total, side-effect-free function of the [`Config`]'s
//! env-loaded lists plus the value under test.

use crate::config::Config;
use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Extract the client IP: first hop of `X-Forwarded-For` if present,
/// else the TCP peer address.
pub fn get_client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(s) = xff.to_str() {
            if let Some(first) = s.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }
    peer.ip().to_string()
}

pub fn is_ip_blocked(config: &Config, ip: &str) -> bool {
    config.ip_blacklist.contains(ip)
}

pub fn is_ofac_listed(config: &Config, addr: &str) -> bool {
    config.ofac_addresses.contains(&addr.to_lowercase())
}

pub fn is_whitelisted_selector(config: &Config, selector_hex: &str) -> bool {
    config
        .selector_whitelist
        .contains(&selector_hex.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::collections::HashSet;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_config() -> Config {
        Config {
            default_upstream_url: String::new(),
            tx_manager_url: String::new(),
            host: String::new(),
            port: 0,
            protection_gas_floor: 42000,
            selector_whitelist: HashSet::from(["0xa9059cbb".to_string()]),
            ip_blacklist: HashSet::from(["1.2.3.4".to_string()]),
            ofac_addresses: HashSet::from(["0xdeaddeaddeaddeaddeaddeaddeaddeaddeaddead".to_string()]),
            raw_tx_blacklist_ttl_secs: 4 * 3600,
            nonce_retry_max: 4,
            body_read_timeout_secs: 10,
            upstream_timeout_secs: 10,
            override_query_param: "url".into(),
            flash_probe_to: "0x000000000000000000000000000000000000dead".into(),
            flash_probe_data: "0xf1a5eb00".into(),
        }
    }

    #[test]
    fn blocked_ip_matches_exactly() {
        let config = test_config();
        assert!(is_ip_blocked(&config, "1.2.3.4"));
        assert!(!is_ip_blocked(&config, "5.6.7.8"));
    }

    #[test]
    fn ofac_check_is_case_insensitive() {
        let config = test_config();
        assert!(is_ofac_listed(
            &config,
            "0xDEADDEADDEADDEADDEADDEADDEADDEADDEADDEAD"
        ));
    }

    #[test]
    fn selector_whitelist_is_case_insensitive() {
        let config = test_config();
        assert!(is_whitelisted_selector(&config, "0xA9059CBB"));
        assert!(!is_whitelisted_selector(&config, "0xdeadbeef"));
    }

    #[test]
    fn client_ip_prefers_forwarded_header_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("9.9.9.9, 10.0.0.1"),
        );
        let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1234);
        assert_eq!(get_client_ip(&headers, peer), "9.9.9.9");
    }

    #[test]
    fn client_ip_falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 1234);
        assert_eq!(get_client_ip(&headers, peer), "127.0.0.1");
    }
}
