//! Per-`utxoId` mutual exclusion.
//!
//! §5 requires strict linearizability of `debit` calls against the same
//! `utxoId` while letting different `utxoId`s run fully concurrently. We keep
//! a map from `utxoId` to a lock, guarded by an outer lock only for the
//! duration of inserting a new entry — the same double-checked pattern the
//! teacher crate uses for its runtime cache (`rgb::cache::RgbRuntimeCache`).
//! Held locks use `tokio::sync::Mutex` since a `debit` keeps the lock across
//! `.await` points (chain-client calls, store I/O).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyedLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `key`, creating it if this is the first caller to
    /// see it. The returned guard may be held across `.await` points; the
    /// entry is never removed, so short-lived growth of the map is expected
    /// and acceptable (§9: "entries may be garbage-collected after release"
    /// — we don't bother, since the key space is bounded by open UTXOs).
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let existing = self.locks.read().unwrap().get(key).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => {
                let mut locks = self.locks.write().unwrap();
                locks.entry(key.to_string()).or_default().clone()
            }
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_serializes_critical_sections() {
        let locks = Arc::new(KeyedLocks::new());
        let counter = Arc::new(AtomicU64::new(0));
        let mut handles = Vec::new();
        for _ in 0..20 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("tx1:0").await;
                let before = counter.load(Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(1)).await;
                counter.store(before + 1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let locks = Arc::new(KeyedLocks::new());
        let guard_a = locks.acquire("tx1:0").await;
        let acquired_b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("tx2:0"))
            .await
            .is_ok();
        assert!(acquired_b);
        drop(guard_a);
    }
}
