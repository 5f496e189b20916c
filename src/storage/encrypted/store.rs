// src/storage/encrypted/store.rs
use rocksdb::{Direction, IteratorMode, Options, DB};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;

use super::cipher::StorageCipher;
use super::errors::{Result, StorageError};

/// RocksDB-backed key/value store. Values are serialized to JSON and sealed
/// with AES-256-GCM before they touch disk; keys stay in the clear so prefix
/// scans work.
pub struct EncryptedStore {
    db: DB,
    cipher: StorageCipher,
}

impl EncryptedStore {
    pub fn new<P: AsRef<Path>>(path: P, encryption_key: &str) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db =
            DB::open(&opts, path).map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        let cipher = StorageCipher::new(encryption_key.as_bytes())?;

        Ok(Self { db, cipher })
    }

    pub fn store<T: Serialize>(&self, key: &[u8], value: &T) -> Result<()> {
        let serialized =
            serde_json::to_vec(value).map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
        let encrypted = self.cipher.encrypt(&serialized)?;

        self.db
            .put(key, encrypted)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub fn retrieve<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        let encrypted = match self
            .db
            .get(key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
        {
            Some(data) => data,
            None => return Ok(None),
        };

        let decrypted = self.cipher.decrypt(&encrypted)?;
        let value = serde_json::from_slice(&decrypted)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;

        Ok(Some(value))
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// Decrypts every entry whose key starts with `prefix`, in key order.
    pub fn scan_prefix<T: DeserializeOwned>(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, T)>> {
        let mut entries = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, encrypted) =
                item.map_err(|e| StorageError::DatabaseError(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }

            let decrypted = self.cipher.decrypt(&encrypted)?;
            let value = serde_json::from_slice(&decrypted)
                .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
            entries.push((key.to_vec(), value));
        }

        Ok(entries)
    }
}
