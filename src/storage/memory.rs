//! In-memory `LedgerStore`, used by tests and by deployments that accept
//! losing the ledger on restart. Mirrors the guarded-`HashMap` shape the
//! teacher crate uses for its runtime cache (`rgb::cache::RgbRuntimeCache`).

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use super::store::LedgerStore;
use crate::error::StoreError;
use crate::types::LedgerEntry;

#[derive(Default)]
pub struct InMemoryLedgerStore {
    utxos: RwLock<HashMap<String, LedgerEntry>>,
    addresses: RwLock<HashMap<String, Vec<LedgerEntry>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn get_utxo(&self, utxo_id: &str) -> Result<Option<LedgerEntry>, StoreError> {
        Ok(self.utxos.read().unwrap().get(utxo_id).cloned())
    }

    async fn put_utxo(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        self.utxos
            .write()
            .unwrap()
            .insert(entry.utxo_id.clone(), entry.clone());
        Ok(())
    }

    async fn delete_utxo(&self, utxo_id: &str) -> Result<(), StoreError> {
        self.utxos.write().unwrap().remove(utxo_id);
        Ok(())
    }

    async fn get_address(&self, payer_address: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .addresses
            .read()
            .unwrap()
            .get(payer_address)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_address(
        &self,
        payer_address: &str,
        entries: Vec<LedgerEntry>,
    ) -> Result<(), StoreError> {
        self.addresses
            .write()
            .unwrap()
            .insert(payer_address.to_string(), entries);
        Ok(())
    }

    async fn delete_address(&self, payer_address: &str) -> Result<(), StoreError> {
        self.addresses.write().unwrap().remove(payer_address);
        Ok(())
    }

    async fn list_utxos(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self.utxos.read().unwrap().values().cloned().collect())
    }
}
