//! UTXO Selector (§4.3): "check-my-tab" resolution for authorizations that
//! don't pin a specific UTXO.

use chrono::{DateTime, Utc};

use crate::storage::LedgerStore;
use crate::types::LedgerEntry;

/// Pick the oldest usable ledger entry for `payer_address` that pays
/// `pay_to` and still has at least `required_value` remaining.
///
/// FIFO over the eligible set: the oldest usable coin drains first, bounding
/// the number of open tabs per payer. A store read failure is swallowed and
/// treated as "nothing found" — selection is advisory, never authoritative.
pub async fn select_utxo(
    store: &dyn LedgerStore,
    payer_address: &str,
    pay_to: &str,
    required_value: u64,
) -> Option<LedgerEntry> {
    let entries = match store.get_address(payer_address).await {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!(
                "check-my-tab: failed to read address index for {}: {}",
                payer_address,
                e
            );
            return None;
        }
    };

    entries
        .into_iter()
        .filter(|e| e.receiver_address == pay_to && e.remaining() >= required_value)
        .min_by_key(|e| first_seen_key(e))
}

fn first_seen_key(entry: &LedgerEntry) -> DateTime<Utc> {
    entry.first_seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryLedgerStore;
    use chrono::{Duration, Utc};

    fn entry(utxo_id: &str, remaining: u64, receiver: &str, age_secs: i64) -> LedgerEntry {
        let now = Utc::now() - Duration::seconds(age_secs);
        LedgerEntry {
            utxo_id: utxo_id.to_string(),
            txid: utxo_id.split(':').next().unwrap().to_string(),
            vout: 0,
            payer_address: "A".to_string(),
            receiver_address: receiver.to_string(),
            transaction_value_sat: remaining + 500,
            remaining_balance_sat: remaining,
            remaining_balance_legacy: None,
            total_debited_sat: 500,
            first_seen: now,
            last_updated: now,
            last_checked: now,
        }
    }

    #[tokio::test]
    async fn picks_oldest_eligible_entry() {
        let store = InMemoryLedgerStore::new();
        let young = entry("tx_new:0", 500, "S", 10);
        let old = entry("tx_old:0", 1500, "S", 1000);
        store
            .put_address("A", vec![young.clone(), old.clone()])
            .await
            .unwrap();

        let picked = select_utxo(&store, "A", "S", 1000).await.unwrap();
        assert_eq!(picked.utxo_id, "tx_old:0");
    }

    #[tokio::test]
    async fn ignores_entries_for_other_recipients_or_too_small() {
        let store = InMemoryLedgerStore::new();
        let wrong_recipient = entry("tx1:0", 5000, "other", 10);
        let too_small = entry("tx2:0", 100, "S", 10);
        store
            .put_address("A", vec![wrong_recipient, too_small])
            .await
            .unwrap();

        assert!(select_utxo(&store, "A", "S", 1000).await.is_none());
    }

    #[tokio::test]
    async fn missing_address_returns_none() {
        let store = InMemoryLedgerStore::new();
        assert!(select_utxo(&store, "nobody", "S", 1000).await.is_none());
    }
}
