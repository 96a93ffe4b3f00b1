//! Transaction inspector — decodes a raw tx hex, extracts gas and
//! calldata, recovers the sender, and computes the canonical tx hash.

use ethers::core::utils::keccak256;
use ethers::types::transaction::eip2718::{TypedTransaction, TypedTransactionError};
use ethers::types::{H256, U256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxDecodeError {
    #[error("raw tx hex too short")]
    TooShort,
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("rlp decode failed: {0}")]
    Rlp(#[from] rlp::DecoderError),
    #[error("typed transaction decode failed: {0}")]
    Typed(#[from] TypedTransactionError),
    #[error("sender recovery failed: {0}")]
    RecoveryFailed(#[from] ethers::types::SignatureError),
}

/// A decoded transaction. Immutable once built.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub gas: u64,
    pub data: Vec<u8>,
    pub hash: H256,
    inner: TypedTransaction,
    signature: ethers::types::Signature,
}

impl Transaction {
    #[cfg(test)]
    pub(crate) fn new_for_test(gas: u64, data: Vec<u8>, hash: H256) -> Self {
        Transaction {
            gas,
            data,
            hash,
            inner: TypedTransaction::Legacy(Default::default()),
            signature: ethers::types::Signature {
                r: U256::zero(),
                s: U256::zero(),
                v: 27,
            },
        }
    }

    pub fn selector(&self) -> Option<[u8; 4]> {
        if self.data.len() < 4 {
            return None;
        }
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&self.data[0..4]);
        Some(sel)
    }

    pub fn selector_hex(&self) -> Option<String> {
        self.selector().map(|s| format!("0x{}", hex::encode(s)))
    }
}

/// Decode a `0x`-prefixed raw transaction hex string into a [`Transaction`].
pub fn decode_raw_tx(raw_hex: &str) -> Result<Transaction, TxDecodeError> {
    let stripped = raw_hex.trim_start_matches("0x");
    if stripped.len() < 2 {
        return Err(TxDecodeError::TooShort);
    }
    let bytes = hex::decode(stripped)?;

    let rlp = rlp::Rlp::new(&bytes);
    let (inner, signature) = TypedTransaction::decode_signed(&rlp)?;

    let gas = inner
        .gas()
        .copied()
        .unwrap_or_default()
        .min(U256::from(u64::MAX))
        .as_u64();
    let data = inner
        .data()
        .map(|bytes| bytes.to_vec())
        .unwrap_or_default();
    let hash = keccak256(&bytes).into();

    Ok(Transaction {
        gas,
        data,
        hash,
        inner,
        signature,
    })
}

/// Recover the lowercase hex sender address from a decoded transaction.
pub fn recover_sender(tx: &Transaction) -> Result<String, TxDecodeError> {
    let sighash = tx.inner.sighash();
    let address = tx.signature.recover(sighash)?;
    Ok(format!("{:#x}", address).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hex_is_rejected() {
        let err = decode_raw_tx("0x").unwrap_err();
        assert!(matches!(err, TxDecodeError::TooShort));
    }

    #[test]
    fn garbage_hex_fails_to_decode() {
        // valid hex, not a valid RLP-encoded signed transaction
        let err = decode_raw_tx("0xdeadbeef");
        assert!(err.is_err());
    }

    #[test]
    fn selector_requires_at_least_four_bytes() {
        let tx = Transaction::new_for_test(21000, vec![0xaa, 0xbb, 0xcc], H256::zero());
        assert!(tx.selector().is_none());
    }

    #[test]
    fn selector_extracts_first_four_bytes() {
        let tx = Transaction::new_for_test(
            60000,
            vec![0xa9, 0x05, 0x9c, 0xbb, 0x01, 0x02],
            H256::zero(),
        );
        assert_eq!(tx.selector_hex().unwrap(), "0xa9059cbb");
    }
}
