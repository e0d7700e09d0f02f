//! The facilitator's own wallet (§6, §2.9): holds the coins the facilitator
//! settles from. Out of scope for this core beyond the interface it's
//! called through — no key management, fee estimation, or coin selection
//! lives here.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::chain_client::{ChainClient, ChainOutput};
use crate::error::WalletAdapterError;

#[async_trait]
pub trait FacilitatorWallet: Send + Sync {
    /// Idempotent lazy initialization (§4.6 step 2).
    async fn ensure_initialized(&self) -> Result<(), WalletAdapterError>;
    async fn balance(&self) -> Result<u64, WalletAdapterError>;
    /// Broadcast a single-output transfer and return the transaction id.
    async fn send_to(&self, address: &str, amount_sat: u64) -> Result<String, WalletAdapterError>;
}

/// A wallet that delegates balance queries and broadcast to the on-chain
/// node client, scoped to this facilitator's own address. Initialization is
/// guarded by a `OnceCell` so concurrent settlements never double-init,
/// mirroring the lazy-singleton guard pattern the teacher crate uses for its
/// RGB runtime cache.
pub struct HttpFacilitatorWallet {
    chain_client: Arc<dyn ChainClient>,
    address: String,
    initialized: OnceCell<()>,
}

impl HttpFacilitatorWallet {
    pub fn new(chain_client: Arc<dyn ChainClient>, address: String) -> Self {
        Self {
            chain_client,
            address,
            initialized: OnceCell::new(),
        }
    }
}

#[async_trait]
impl FacilitatorWallet for HttpFacilitatorWallet {
    async fn ensure_initialized(&self) -> Result<(), WalletAdapterError> {
        self.initialized
            .get_or_try_init(|| async {
                log::info!("Facilitator wallet initialized for address {}", self.address);
                Ok(())
            })
            .await
            .map(|_| ())
    }

    async fn balance(&self) -> Result<u64, WalletAdapterError> {
        self.chain_client
            .get_balance(&self.address)
            .await
            .map_err(|e| WalletAdapterError::Transport(e.to_string()))
    }

    async fn send_to(&self, address: &str, amount_sat: u64) -> Result<String, WalletAdapterError> {
        let outputs = [ChainOutput {
            address: address.to_string(),
            amount_sat,
        }];
        self.chain_client
            .send(&outputs)
            .await
            .map_err(|e| WalletAdapterError::Transport(e.to_string()))
    }
}
