//! Nonce-retry store — a process-wide map from lowercase sender hex to
//! `{nonce, num_tries}`. Populated only by the fail-bundle feedback loop
//! (§4.7); consumed and possibly retired by the `eth_getTransactionCount`
//! interceptor (§4.3).

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct NonceEntry {
    pub nonce: u64,
    pub num_tries: u32,
}

lazy_static! {
    static ref NONCE_RETRY_STORE: Mutex<HashMap<String, NonceEntry>> = Mutex::new(HashMap::new());
}

/// Seed (or overwrite) the retry entry for `sender` with `num_tries = 0`.
pub fn seed(sender: &str, nonce: u64) {
    match NONCE_RETRY_STORE.lock() {
        Ok(mut store) => {
            store.insert(
                sender.to_lowercase(),
                NonceEntry {
                    nonce,
                    num_tries: 0,
                },
            );
        }
        Err(_) => warn!("nonce-retry store lock poisoned — seed skipped"),
    }
}

/// What the `eth_getTransactionCount` interceptor should do for `sender`.
pub enum LookupOutcome {
    /// No entry — the pipeline should proxy to the real upstream.
    NotHandled,
    /// Synthesize a nonce response; the entry's `num_tries` was incremented.
    Synthetic(u64),
}

/// Look up `sender`. If present and under `max_tries`, synthesize the
/// nonce and bump `num_tries`. Once `max_tries` is reached, retire the
/// entry so the next call falls through to the real upstream.
pub fn lookup_and_advance(sender: &str, max_tries: u32) -> LookupOutcome {
    let key = sender.to_lowercase();
    match NONCE_RETRY_STORE.lock() {
        Ok(mut store) => match store.get_mut(&key) {
            None => LookupOutcome::NotHandled,
            Some(entry) => {
                let nonce = entry.nonce;
                entry.num_tries += 1;
                if entry.num_tries >= max_tries {
                    store.remove(&key);
                }
                LookupOutcome::Synthetic(nonce)
            }
        },
        Err(_) => {
            warn!("nonce-retry store lock poisoned — treating as not handled");
            LookupOutcome::NotHandled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_sender_is_not_handled() {
        assert!(matches!(
            lookup_and_advance("0xabsent-sender-not-handled", 4),
            LookupOutcome::NotHandled
        ));
    }

    #[test]
    fn seeded_sender_returns_stored_nonce_repeatedly_then_retires() {
        let sender = "0xSeededSender000000000000000000000000001";
        seed(sender, 42);
        for _ in 0..3 {
            match lookup_and_advance(sender, 4) {
                LookupOutcome::Synthetic(n) => assert_eq!(n, 42),
                LookupOutcome::NotHandled => panic!("expected a synthetic answer"),
            }
        }
        // the 4th call reaches max_tries and retires the entry
        match lookup_and_advance(sender, 4) {
            LookupOutcome::Synthetic(n) => assert_eq!(n, 42),
            LookupOutcome::NotHandled => panic!("expected a synthetic answer on the bound"),
        }
        assert!(matches!(
            lookup_and_advance(sender, 4),
            LookupOutcome::NotHandled
        ));
    }

    #[test]
    fn lookup_is_case_insensitive_on_sender() {
        let sender = "0xCaseSensitiveSender00000000000000000002";
        seed(sender, 7);
        match lookup_and_advance(&sender.to_lowercase(), 4) {
            LookupOutcome::Synthetic(n) => assert_eq!(n, 7),
            LookupOutcome::NotHandled => panic!("expected a synthetic answer"),
        }
    }
}
