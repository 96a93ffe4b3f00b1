//! Protection predicate (§4.6) — pure, total function of a decoded
//! transaction and configuration; no I/O.

use crate::config::Config;
use crate::policy::is_whitelisted_selector;
use crate::tx::Transaction;

/// `true` when the transaction should be routed through the tx-manager
/// rather than the public mempool.
pub fn needs_protection(tx: &Transaction, config: &Config) -> bool {
    if tx.gas < config.protection_gas_floor {
        return false;
    }
    if tx.data.is_empty() {
        return false;
    }
    if let Some(selector) = tx.selector_hex() {
        if is_whitelisted_selector(config, &selector) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::H256;
    use std::collections::HashSet;

    fn test_config() -> Config {
        Config {
            default_upstream_url: String::new(),
            tx_manager_url: String::new(),
            host: String::new(),
            port: 0,
            protection_gas_floor: 42000,
            selector_whitelist: HashSet::from(["0xa9059cbb".to_string()]),
            ip_blacklist: HashSet::new(),
            ofac_addresses: HashSet::new(),
            raw_tx_blacklist_ttl_secs: 4 * 3600,
            nonce_retry_max: 4,
            body_read_timeout_secs: 10,
            upstream_timeout_secs: 10,
            override_query_param: "url".into(),
            flash_probe_to: "0x000000000000000000000000000000000000dead".into(),
            flash_probe_data: "0xf1a5eb00".into(),
        }
    }

    fn tx_with(gas: u64, data: Vec<u8>) -> Transaction {
        Transaction::new_for_test(gas, data, H256::zero())
    }

    #[test]
    fn low_gas_needs_no_protection() {
        let config = test_config();
        let tx = tx_with(21000, vec![0xa9, 0x05, 0x9c, 0xbb, 0, 0]);
        assert!(!needs_protection(&tx, &config));
    }

    #[test]
    fn gas_exactly_at_floor_with_unlisted_selector_needs_protection() {
        let config = test_config();
        let tx = tx_with(42000, vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(needs_protection(&tx, &config));
    }

    #[test]
    fn empty_calldata_needs_no_protection() {
        let config = test_config();
        let tx = tx_with(21000, vec![]);
        assert!(!needs_protection(&tx, &config));

        let tx = tx_with(500_000, vec![]);
        assert!(!needs_protection(&tx, &config));
    }

    #[test]
    fn whitelisted_selector_with_high_gas_needs_no_protection() {
        let config = test_config();
        let tx = tx_with(100_000, vec![0xa9, 0x05, 0x9c, 0xbb, 0, 0]);
        assert!(!needs_protection(&tx, &config));
    }

    #[test]
    fn unlisted_selector_with_high_gas_needs_protection() {
        let config = test_config();
        let tx = tx_with(200_000, vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(needs_protection(&tx, &config));
    }
}
