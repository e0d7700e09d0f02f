//! Signature verification primitive (§6): `verify(address, signature,
//! message) -> bool`, may fail. Consumed as an interface — the core never
//! does signature math itself, just calls through this trait.

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::key::CompressedPublicKey;
use bitcoin::sign_message::{signed_msg_hash, MessageSignature};
use bitcoin::{secp256k1::Secp256k1, Address, Network, PublicKey};
use std::str::FromStr;

use crate::error::SignatureError;

#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    async fn verify(&self, address: &str, signature: &str, message: &str) -> Result<bool, SignatureError>;
}

/// Verifies Bitcoin-signed-message-style signatures (base64-encoded,
/// recoverable ECDSA) against a P2PKH/P2WPKH address, the same primitive
/// used throughout the UTXO-chain ecosystem for off-chain authorization.
pub struct EcdsaSignatureVerifier {
    network: Network,
}

impl EcdsaSignatureVerifier {
    pub fn new(network: Network) -> Self {
        Self { network }
    }
}

#[async_trait]
impl SignatureVerifier for EcdsaSignatureVerifier {
    async fn verify(&self, address: &str, signature: &str, message: &str) -> Result<bool, SignatureError> {
        let expected = match Address::from_str(address) {
            Ok(addr) => addr,
            Err(_) => return Ok(false),
        };
        let expected = match expected.require_network(self.network) {
            Ok(addr) => addr,
            Err(_) => return Ok(false),
        };

        let sig = match MessageSignature::from_base64(signature) {
            Ok(sig) => sig,
            Err(_) => return Ok(false),
        };

        let secp = Secp256k1::verification_only();
        let hash = signed_msg_hash(message);
        let recovered_pubkey = match sig.recover_pubkey(&secp, hash.to_byte_array()) {
            Ok(pk) => pk,
            Err(_) => return Ok(false),
        };

        let recovered_pubkey = PublicKey::new(recovered_pubkey);
        let mut candidates = vec![Address::p2pkh(recovered_pubkey, self.network)];
        if let Ok(compressed) = CompressedPublicKey::try_from(recovered_pubkey) {
            candidates.push(Address::p2wpkh(&compressed, self.network));
        }
        Ok(candidates.iter().any(|candidate| candidate == &expected))
    }
}
