use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::LedgerEntry;

/// The Ledger Store contract (§6): `UtxoDb` keyed by `utxoId`, `AddressDb`
/// keyed by payer address holding a list of entries. Implementations MAY
/// serialize records in whatever self-describing format they like.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_utxo(&self, utxo_id: &str) -> Result<Option<LedgerEntry>, StoreError>;
    async fn put_utxo(&self, entry: &LedgerEntry) -> Result<(), StoreError>;
    async fn delete_utxo(&self, utxo_id: &str) -> Result<(), StoreError>;

    async fn get_address(&self, payer_address: &str) -> Result<Vec<LedgerEntry>, StoreError>;
    async fn put_address(
        &self,
        payer_address: &str,
        entries: Vec<LedgerEntry>,
    ) -> Result<(), StoreError>;
    async fn delete_address(&self, payer_address: &str) -> Result<(), StoreError>;

    /// List every entry in `UtxoDb`, for rebuilding `AddressDb` at start-up
    /// (§9: the secondary index is reconstructible).
    async fn list_utxos(&self) -> Result<Vec<LedgerEntry>, StoreError>;
}
