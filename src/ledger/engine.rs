//! Ledger Engine (§4.4) — the critical operation. Finds or creates the
//! ledger entry for an authorization, debits it, and keeps `UtxoDb` and
//! `AddressDb` consistent under per-`utxoId` mutual exclusion (§5).

use std::sync::Arc;

use chrono::Utc;

use super::locks::KeyedLocks;
use crate::adapters::ChainClient;
use crate::error::FacilitatorError;
use crate::storage::LedgerStore;
use crate::types::{Authorization, AuthorizationRef, InvalidReason, LedgerEntry};

/// Outcome of a single `debit` call. `Invalid` is a normal business result,
/// not an error — only genuine infrastructure failures surface as `Err` from
/// [`LedgerEngine::debit`].
#[derive(Debug, Clone)]
pub enum DebitOutcome {
    Valid {
        remaining_balance_sat: u64,
        entry: LedgerEntry,
    },
    Invalid {
        reason: InvalidReason,
    },
}

pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    chain_client: Arc<dyn ChainClient>,
    locks: Arc<KeyedLocks>,
}

impl LedgerEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        chain_client: Arc<dyn ChainClient>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            store,
            chain_client,
            locks,
        }
    }

    /// Debit `cost` against the UTXO the authorization references (or the
    /// pre-selected entry, for check-my-tab calls).
    pub async fn debit(
        &self,
        authorization: &Authorization,
        cost: u64,
        selected_entry: Option<LedgerEntry>,
    ) -> Result<DebitOutcome, FacilitatorError> {
        if authorization.from.is_empty() {
            return Ok(DebitOutcome::Invalid {
                reason: InvalidReason::MissingAuthorization,
            });
        }

        let (txid, vout, is_check_my_tab) = match &authorization.reference {
            AuthorizationRef::Specific { txid, vout } => (txid.clone(), *vout, false),
            AuthorizationRef::AnyForAddress => match &selected_entry {
                Some(entry) => (entry.txid.clone(), entry.vout, true),
                None => {
                    return Ok(DebitOutcome::Invalid {
                        reason: InvalidReason::NoUtxoFoundForAddress,
                    })
                }
            },
        };
        let utxo_id = format!("{}:{}", txid, vout);

        // Held across every .await below: the rest of this call must observe
        // a consistent, serialized view of this utxoId.
        let _guard = self.locks.acquire(&utxo_id).await;

        match self.store.get_utxo(&utxo_id).await? {
            Some(current) => self.apply_debit(current, cost).await,
            None => {
                if is_check_my_tab {
                    // The selector already found this entry in AddressDb;
                    // UtxoDb just hasn't caught up. Treat it as authoritative
                    // and repair UtxoDb before proceeding as if found.
                    let entry = selected_entry.expect("checked above");
                    self.apply_debit(entry, cost).await
                } else {
                    self.create_from_chain(&txid, vout, authorization, cost).await
                }
            }
        }
    }

    /// Branch A (not found, not check-my-tab): validate against the chain
    /// and create a fresh ledger entry.
    async fn create_from_chain(
        &self,
        txid: &str,
        vout: u32,
        authorization: &Authorization,
        cost: u64,
    ) -> Result<DebitOutcome, FacilitatorError> {
        let validation = self.chain_client.validate_utxo(txid, vout).await?;
        if !validation.is_valid {
            return Ok(DebitOutcome::Invalid {
                reason: validation.invalid_reason.unwrap_or(InvalidReason::UtxoNotFound),
            });
        }
        let utxo_amount_sat = validation.utxo_amount_sat.unwrap_or(0);
        let receiver_address = validation
            .receiver_address
            .unwrap_or_else(|| authorization.to.clone());

        let Some(remaining) = utxo_amount_sat.checked_sub(cost) else {
            return Ok(DebitOutcome::Invalid {
                reason: InvalidReason::InsufficientUtxoBalance,
            });
        };

        let now = Utc::now();
        let entry = LedgerEntry {
            utxo_id: format!("{}:{}", txid, vout),
            txid: txid.to_string(),
            vout,
            payer_address: authorization.from.clone(),
            receiver_address,
            transaction_value_sat: utxo_amount_sat,
            remaining_balance_sat: remaining,
            remaining_balance_legacy: None,
            total_debited_sat: cost,
            first_seen: now,
            last_updated: now,
            last_checked: now,
        };

        self.store.put_utxo(&entry).await?;
        if remaining == 0 {
            self.store.delete_utxo(&entry.utxo_id).await?;
            self.remove_from_address_index(&entry).await;
        } else {
            self.upsert_address_index(&entry).await;
        }

        Ok(DebitOutcome::Valid {
            remaining_balance_sat: remaining,
            entry,
        })
    }

    /// Branch B (found, or a check-my-tab repair): debit the existing entry,
    /// destroying it if the debit exhausts the remaining balance.
    async fn apply_debit(
        &self,
        current: LedgerEntry,
        cost: u64,
    ) -> Result<DebitOutcome, FacilitatorError> {
        let current_remaining = current.remaining();
        let Some(new_remaining) = current_remaining.checked_sub(cost) else {
            return Ok(DebitOutcome::Invalid {
                reason: InvalidReason::InsufficientUtxoBalance,
            });
        };

        let now = Utc::now();
        let updated = LedgerEntry {
            remaining_balance_sat: new_remaining,
            remaining_balance_legacy: None,
            total_debited_sat: current.total_debited_sat + cost,
            last_updated: now,
            last_checked: now,
            ..current
        };

        self.store.put_utxo(&updated).await?;

        if new_remaining == 0 {
            self.store.delete_utxo(&updated.utxo_id).await?;
            self.remove_from_address_index(&updated).await;
        } else {
            self.upsert_address_index(&updated).await;
        }

        Ok(DebitOutcome::Valid {
            remaining_balance_sat: new_remaining,
            entry: updated,
        })
    }

    /// Insert or replace `entry` in its payer's address index. Failures are
    /// logged and swallowed (§4.4): `UtxoDb` is the source of truth and the
    /// index is reconstructible from it.
    async fn upsert_address_index(&self, entry: &LedgerEntry) {
        let read = self.store.get_address(&entry.payer_address).await;
        let mut entries = match read {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "address index read failed for {}: {}",
                    entry.payer_address,
                    e
                );
                return;
            }
        };

        match entries.iter_mut().find(|e| e.utxo_id == entry.utxo_id) {
            Some(existing) => *existing = entry.clone(),
            None => entries.push(entry.clone()),
        }

        if let Err(e) = self.store.put_address(&entry.payer_address, entries).await {
            log::warn!(
                "address index write failed for {}: {}",
                entry.payer_address,
                e
            );
        }
    }

    /// Remove `entry` from its payer's address index, deleting the address
    /// key entirely if the list becomes empty (§3: never leave an empty list).
    async fn remove_from_address_index(&self, entry: &LedgerEntry) {
        let read = self.store.get_address(&entry.payer_address).await;
        let mut entries = match read {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "address index read failed for {}: {}",
                    entry.payer_address,
                    e
                );
                return;
            }
        };

        entries.retain(|e| e.utxo_id != entry.utxo_id);

        let result = if entries.is_empty() {
            self.store.delete_address(&entry.payer_address).await
        } else {
            self.store.put_address(&entry.payer_address, entries).await
        };
        if let Err(e) = result {
            log::warn!(
                "address index update failed for {}: {}",
                entry.payer_address,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ChainOutput;
    use crate::storage::InMemoryLedgerStore;
    use crate::types::AuthorizationRef;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeChainClient {
        validations: Mutex<Vec<(String, u32)>>,
        amount_sat: u64,
        receiver: String,
        is_valid: bool,
        invalid_reason: Option<InvalidReason>,
    }

    impl FakeChainClient {
        fn valid(amount_sat: u64, receiver: &str) -> Self {
            Self {
                validations: Mutex::new(Vec::new()),
                amount_sat,
                receiver: receiver.to_string(),
                is_valid: true,
                invalid_reason: None,
            }
        }
    }

    #[async_trait]
    impl ChainClient for FakeChainClient {
        async fn validate_utxo(
            &self,
            txid: &str,
            vout: u32,
        ) -> Result<crate::adapters::UtxoValidation, crate::error::ChainClientError> {
            self.validations
                .lock()
                .unwrap()
                .push((txid.to_string(), vout));
            Ok(crate::adapters::UtxoValidation {
                is_valid: self.is_valid,
                invalid_reason: self.invalid_reason,
                utxo_amount_sat: Some(self.amount_sat),
                receiver_address: Some(self.receiver.clone()),
            })
        }

        async fn send(
            &self,
            _outputs: &[ChainOutput],
        ) -> Result<String, crate::error::ChainClientError> {
            unimplemented!("not exercised by ledger engine tests")
        }

        async fn get_balance(&self, _address: &str) -> Result<u64, crate::error::ChainClientError> {
            unimplemented!("not exercised by ledger engine tests")
        }
    }

    fn authorization(txid: &str, vout: u32, value: u64) -> Authorization {
        Authorization {
            from: "A".to_string(),
            to: "S".to_string(),
            value,
            reference: AuthorizationRef::Specific {
                txid: txid.to_string(),
                vout,
            },
            amount: None,
        }
    }

    #[tokio::test]
    async fn new_utxo_with_sufficient_funds_creates_entry() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let chain = Arc::new(FakeChainClient::valid(2000, "S"));
        let locks = Arc::new(KeyedLocks::new());
        let engine = LedgerEngine::new(store.clone(), chain, locks);

        let outcome = engine
            .debit(&authorization("tx1", 0, 1000), 1000, None)
            .await
            .unwrap();

        match outcome {
            DebitOutcome::Valid {
                remaining_balance_sat,
                entry,
            } => {
                assert_eq!(remaining_balance_sat, 1000);
                assert_eq!(entry.total_debited_sat, 1000);
            }
            DebitOutcome::Invalid { reason } => panic!("expected valid, got {:?}", reason),
        }

        let stored = store.get_utxo("tx1:0").await.unwrap().unwrap();
        assert_eq!(stored.total_debited_sat, 1000);
        let address_entries = store.get_address("A").await.unwrap();
        assert_eq!(address_entries.len(), 1);
    }

    #[tokio::test]
    async fn second_debit_exhausts_utxo_and_removes_it() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let chain = Arc::new(FakeChainClient::valid(2000, "S"));
        let locks = Arc::new(KeyedLocks::new());
        let engine = LedgerEngine::new(store.clone(), chain, locks);

        engine
            .debit(&authorization("tx1", 0, 1000), 1000, None)
            .await
            .unwrap();
        let outcome = engine
            .debit(&authorization("tx1", 0, 1000), 1000, None)
            .await
            .unwrap();

        match outcome {
            DebitOutcome::Valid {
                remaining_balance_sat,
                ..
            } => assert_eq!(remaining_balance_sat, 0),
            DebitOutcome::Invalid { reason } => panic!("expected valid, got {:?}", reason),
        }

        assert!(store.get_utxo("tx1:0").await.unwrap().is_none());
        assert!(store.get_address("A").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_debit_that_exactly_exhausts_a_new_utxo_is_not_persisted() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let chain = Arc::new(FakeChainClient::valid(1000, "S"));
        let locks = Arc::new(KeyedLocks::new());
        let engine = LedgerEngine::new(store.clone(), chain, locks);

        let outcome = engine
            .debit(&authorization("tx1", 0, 1000), 1000, None)
            .await
            .unwrap();

        match outcome {
            DebitOutcome::Valid {
                remaining_balance_sat,
                ..
            } => assert_eq!(remaining_balance_sat, 0),
            DebitOutcome::Invalid { reason } => panic!("expected valid, got {:?}", reason),
        }

        assert!(store.get_utxo("tx1:0").await.unwrap().is_none());
        assert!(store.get_address("A").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insufficient_balance_on_existing_entry_does_not_mutate() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let now = Utc::now();
        store
            .put_utxo(&LedgerEntry {
                utxo_id: "tx2:0".to_string(),
                txid: "tx2".to_string(),
                vout: 0,
                payer_address: "A".to_string(),
                receiver_address: "S".to_string(),
                transaction_value_sat: 1500,
                remaining_balance_sat: 1000,
                remaining_balance_legacy: None,
                total_debited_sat: 500,
                first_seen: now,
                last_updated: now,
                last_checked: now,
            })
            .await
            .unwrap();
        let chain = Arc::new(FakeChainClient::valid(2000, "S"));
        let locks = Arc::new(KeyedLocks::new());
        let engine = LedgerEngine::new(store.clone(), chain, locks);

        let outcome = engine
            .debit(&authorization("tx2", 0, 2000), 2000, None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            DebitOutcome::Invalid {
                reason: InvalidReason::InsufficientUtxoBalance
            }
        ));
        let unchanged = store.get_utxo("tx2:0").await.unwrap().unwrap();
        assert_eq!(unchanged.remaining_balance_sat, 1000);
    }

    #[tokio::test]
    async fn concurrent_debits_never_oversell_a_utxo() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let chain = Arc::new(FakeChainClient::valid(1000, "S"));
        let locks = Arc::new(KeyedLocks::new());
        let engine = Arc::new(LedgerEngine::new(store.clone(), chain, locks));

        // Seed the entry via a single debit, then fire many concurrent
        // 100-sat debits against it; exactly 10 should succeed.
        engine
            .debit(&authorization("tx3", 0, 0), 0, None)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..30 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .debit(&authorization("tx3", 0, 100), 100, None)
                    .await
                    .unwrap()
            }));
        }
        let mut successes = 0;
        for h in handles {
            if matches!(h.await.unwrap(), DebitOutcome::Valid { .. }) {
                successes += 1;
            }
        }
        assert_eq!(successes, 10);
        assert!(store.get_utxo("tx3:0").await.unwrap().is_none());
    }
}
