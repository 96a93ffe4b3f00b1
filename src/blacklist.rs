//! Raw-tx blacklist — a process-wide map from raw-tx hex to the
//! timestamp it was first blacklisted. Entries older than the TTL are
//! eligible for eviction; eviction is opportunistic, run synchronously
//! inside every insert while the lock is held.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

lazy_static! {
    static ref RAW_TX_BLACKLIST: Mutex<HashMap<String, u64>> = Mutex::new(HashMap::new());
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Insert `raw_tx_hex` into the blacklist and sweep entries older than
/// `ttl_secs`, all under a single lock acquisition.
pub fn insert_and_sweep(raw_tx_hex: &str, ttl_secs: u64) {
    let now = now_secs();
    match RAW_TX_BLACKLIST.lock() {
        Ok(mut store) => {
            store.insert(raw_tx_hex.to_string(), now);
            let cutoff = now.saturating_sub(ttl_secs);
            store.retain(|_, inserted_at| *inserted_at >= cutoff);
        }
        Err(_) => warn!("raw-tx blacklist lock poisoned — insert skipped"),
    }
}

/// Exact-string membership lookup. Does not evict; eviction only happens
/// on insert, per the source contract.
pub fn is_blacklisted(raw_tx_hex: &str) -> bool {
    match RAW_TX_BLACKLIST.lock() {
        Ok(store) => store.contains_key(raw_tx_hex),
        Err(_) => {
            warn!("raw-tx blacklist lock poisoned — treating as not blacklisted");
            false
        }
    }
}

// Tests share the global store (it is process-wide by design, per §9),
// so each test uses its own unique keys rather than clearing it —
// concurrent `cargo test` threads must not step on each other.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_entry_is_found() {
        insert_and_sweep("0xabc-inserted-entry-is-found", 4 * 3600);
        assert!(is_blacklisted("0xabc-inserted-entry-is-found"));
        assert!(!is_blacklisted("0xdef-inserted-entry-is-found"));
    }

    #[test]
    fn sweep_evicts_entries_older_than_ttl() {
        {
            let mut store = RAW_TX_BLACKLIST.lock().unwrap();
            // backdate an entry well past any sane TTL
            store.insert("0xstale-sweep-evicts".to_string(), 0);
        }
        // a fresh insert triggers the sweep
        insert_and_sweep("0xfresh-sweep-evicts", 60);
        assert!(!is_blacklisted("0xstale-sweep-evicts"));
        assert!(is_blacklisted("0xfresh-sweep-evicts"));
    }

    #[test]
    fn membership_lookup_is_exact_string() {
        insert_and_sweep("0xAbC-exact-string", 3600);
        assert!(is_blacklisted("0xAbC-exact-string"));
        assert!(!is_blacklisted("0xabc-exact-string"));
    }
}
