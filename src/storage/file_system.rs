//! JSON-file-backed `LedgerStore`, for a single-process deployment that
//! doesn't need a real embedded database. One file per key under
//! `<base_dir>/utxo/` and `<base_dir>/address/`, mirroring the teacher
//! crate's one-file-per-record convention.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::store::LedgerStore;
use crate::error::StoreError;
use crate::types::LedgerEntry;

#[derive(Clone)]
pub struct FileLedgerStore {
    base_path: PathBuf,
}

impl FileLedgerStore {
    /// Create a new store rooted at `base_dir` (created lazily on first write).
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn utxo_dir(&self) -> PathBuf {
        self.base_path.join("utxo")
    }

    fn address_dir(&self) -> PathBuf {
        self.base_path.join("address")
    }

    fn utxo_path(&self, utxo_id: &str) -> PathBuf {
        self.utxo_dir().join(format!("{}.json", sanitize(utxo_id)))
    }

    fn address_path(&self, payer_address: &str) -> PathBuf {
        self.address_dir()
            .join(format!("{}.json", sanitize(payer_address)))
    }
}

/// Keys here are UTXO ids (`txid:vout`) and chain addresses; neither should
/// ever contain a path separator, but we don't trust the network for that.
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: serde::Serialize + Sync>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(value)?;
    fs::write(path, json).await?;
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<(), StoreError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl LedgerStore for FileLedgerStore {
    async fn get_utxo(&self, utxo_id: &str) -> Result<Option<LedgerEntry>, StoreError> {
        read_json(&self.utxo_path(utxo_id)).await
    }

    async fn put_utxo(&self, entry: &LedgerEntry) -> Result<(), StoreError> {
        write_json(&self.utxo_path(&entry.utxo_id), entry).await
    }

    async fn delete_utxo(&self, utxo_id: &str) -> Result<(), StoreError> {
        remove_if_present(&self.utxo_path(utxo_id)).await
    }

    async fn get_address(&self, payer_address: &str) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(read_json(&self.address_path(payer_address))
            .await?
            .unwrap_or_default())
    }

    async fn put_address(
        &self,
        payer_address: &str,
        entries: Vec<LedgerEntry>,
    ) -> Result<(), StoreError> {
        write_json(&self.address_path(payer_address), &entries).await
    }

    async fn delete_address(&self, payer_address: &str) -> Result<(), StoreError> {
        remove_if_present(&self.address_path(payer_address)).await
    }

    async fn list_utxos(&self) -> Result<Vec<LedgerEntry>, StoreError> {
        let dir = self.utxo_dir();
        let mut entries = Vec::new();
        let mut read_dir = match fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(e) => return Err(e.into()),
        };
        while let Some(dir_entry) = read_dir.next_entry().await? {
            if dir_entry.path().extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = read_json(&dir_entry.path()).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
