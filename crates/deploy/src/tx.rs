//! Locally signed contract-creation transactions (legacy format, EIP-155).

use alloy_consensus::{SignableTransaction, TxLegacy, transaction::RlpEcdsaEncodableTx};
use alloy_core::primitives::{Bytes, Signature, TxKind, U256};

/// An unsigned legacy transaction creating a contract from `init_code`.
pub fn creation_tx(
    nonce: u64,
    gas_price: u128,
    gas_limit: u64,
    init_code: Bytes,
    chain_id: u64,
) -> TxLegacy {
    TxLegacy {
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_limit,
        to: TxKind::Create,
        value: U256::ZERO,
        input: init_code,
    }
}

/// Raw signed transaction, ready for `eth_sendRawTransaction`.
pub fn encode_signed(tx: &TxLegacy, signature: &Signature) -> Bytes {
    let mut out = Vec::with_capacity(tx.rlp_encoded_length_with_signature(signature));
    tx.rlp_encode_signed(signature, &mut out);
    Bytes::from(out)
}

#[cfg(test)]
mod tests {
    use alloy_core::{
        primitives::keccak256,
        rlp::Header,
    };
    use alloy_signer::SignerSync;
    use alloy_signer_local::PrivateKeySigner;

    use super::*;

    fn sample_tx() -> TxLegacy {
        creation_tx(
            7,
            1_000_000_000,
            1_500_000,
            Bytes::from_static(&[0x60, 0x80, 0x60, 0x40, 0x52]),
            1337,
        )
    }

    #[test]
    fn test_signing_hash_depends_on_chain_id() {
        let tx = sample_tx();
        let other_chain = TxLegacy {
            chain_id: Some(1),
            ..tx.clone()
        };

        assert_ne!(tx.signature_hash(), other_chain.signature_hash());
        assert_eq!(tx.signature_hash(), sample_tx().signature_hash());
    }

    #[test]
    fn test_encode_signed_is_rlp_list_and_recoverable() {
        let key = PrivateKeySigner::random();
        let tx = sample_tx();
        let hash = tx.signature_hash();
        let signature = key.sign_hash_sync(&hash).unwrap();

        let raw = encode_signed(&tx, &signature);

        let mut buf = &raw[..];
        let header = Header::decode(&mut buf).unwrap();
        assert!(header.list);
        assert_eq!(header.payload_length, buf.len());
        assert_eq!(keccak256(&raw), tx.tx_hash(&signature));

        let recovered = signature.recover_address_from_prehash(&hash).unwrap();
        assert_eq!(recovered, key.address());
    }

    #[test]
    fn test_eip155_v_value() {
        let key = PrivateKeySigner::random();
        let tx = sample_tx();
        let signature = key.sign_hash_sync(&tx.signature_hash()).unwrap();
        let raw = encode_signed(&tx, &signature);

        // v = 1337 * 2 + 35 + parity = 2709 or 2710, encoded as 0x82 0x0a 0x95/0x96.
        let expected_v = 2709 + u64::from(signature.v());
        let v_bytes = expected_v.to_be_bytes();
        let needle = [0x82, v_bytes[6], v_bytes[7]];
        assert!(raw.windows(3).any(|window| window == needle));
    }

    #[test]
    fn test_large_chain_id_does_not_overflow() {
        let key = PrivateKeySigner::random();
        let tx = TxLegacy {
            chain_id: Some(u64::MAX),
            ..sample_tx()
        };
        let signature = key.sign_hash_sync(&tx.signature_hash()).unwrap();

        let raw = encode_signed(&tx, &signature);

        let mut buf = &raw[..];
        let header = Header::decode(&mut buf).unwrap();
        assert_eq!(header.payload_length, buf.len());
    }
}
