//! External collaborators, consumed only through their trait interfaces
//! (§6): the on-chain node client, the signature verification primitive, and
//! the facilitator's own wallet. The core never reaches past these traits.

mod chain_client;
mod signature_verifier;
mod wallet;

pub use chain_client::{ChainClient, ChainOutput, EsploraChainClient, UtxoValidation};
pub use signature_verifier::{EcdsaSignatureVerifier, SignatureVerifier};
pub use wallet::{FacilitatorWallet, HttpFacilitatorWallet};

/// The full set of adapters a pipeline needs, grouped for dependency
/// injection (§9) rather than threaded individually through every call.
pub struct Adapters {
    pub store: std::sync::Arc<dyn crate::storage::LedgerStore>,
    pub chain_client: std::sync::Arc<dyn ChainClient>,
    pub signature_verifier: std::sync::Arc<dyn SignatureVerifier>,
    pub wallet: std::sync::Arc<dyn FacilitatorWallet>,
    pub locks: std::sync::Arc<crate::ledger::locks::KeyedLocks>,
}
