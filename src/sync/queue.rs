// src/sync/queue.rs
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::storage::encrypted::{EncryptedStore, StorageError};

use super::types::{PendingAttendanceRecord, PendingEmbeddingUpdate, QueueSnapshot};

const ATTENDANCE_PREFIX: &[u8] = b"pending/att/";
const EMBEDDING_PREFIX: &[u8] = b"pending/emb/";

/// Durable holding area for records the remote store has not accepted yet.
/// Attendance entries are keyed by a device-local id so retries never collide;
/// embedding updates are keyed by user so only the newest capture survives.
pub struct PendingQueue {
    store: Arc<EncryptedStore>,
}

impl PendingQueue {
    pub fn new(store: Arc<EncryptedStore>) -> Self {
        Self { store }
    }

    fn attendance_key(local_id: &Uuid) -> Vec<u8> {
        let mut key = ATTENDANCE_PREFIX.to_vec();
        key.extend_from_slice(local_id.to_string().as_bytes());
        key
    }

    fn embedding_key(user_id: &Uuid) -> Vec<u8> {
        let mut key = EMBEDDING_PREFIX.to_vec();
        key.extend_from_slice(user_id.to_string().as_bytes());
        key
    }

    pub fn enqueue_attendance(
        &self,
        record: &PendingAttendanceRecord,
    ) -> Result<(), StorageError> {
        self.store
            .store(&Self::attendance_key(&record.local_id), record)?;
        debug!("Queued attendance record {}", record.local_id);
        Ok(())
    }

    pub fn remove_attendance(&self, local_id: &Uuid) -> Result<(), StorageError> {
        self.store.delete(&Self::attendance_key(local_id))
    }

    /// Oldest capture first, so a backlog drains in the order it was taken.
    pub fn list_attendance(&self) -> Result<Vec<PendingAttendanceRecord>, StorageError> {
        let entries: Vec<(Vec<u8>, PendingAttendanceRecord)> =
            self.store.scan_prefix(ATTENDANCE_PREFIX)?;
        let mut records: Vec<PendingAttendanceRecord> =
            entries.into_iter().map(|(_, record)| record).collect();
        records.sort_by_key(|record| record.timestamp);
        Ok(records)
    }

    /// Stores the update unless a newer capture for the same user is already
    /// queued. Returns whether the update was kept.
    pub fn put_embedding_update(
        &self,
        update: &PendingEmbeddingUpdate,
    ) -> Result<bool, StorageError> {
        let key = Self::embedding_key(&update.user_id);
        if let Some(existing) = self.store.retrieve::<PendingEmbeddingUpdate>(&key)? {
            if existing.captured_at > update.captured_at {
                debug!(
                    "Keeping newer queued embedding for user {} ({} > {})",
                    update.user_id, existing.captured_at, update.captured_at
                );
                return Ok(false);
            }
        }
        self.store.store(&key, update)?;
        debug!("Queued embedding update for user {}", update.user_id);
        Ok(true)
    }

    pub fn remove_embedding(&self, user_id: &Uuid) -> Result<(), StorageError> {
        self.store.delete(&Self::embedding_key(user_id))
    }

    pub fn list_embeddings(&self) -> Result<Vec<PendingEmbeddingUpdate>, StorageError> {
        let entries: Vec<(Vec<u8>, PendingEmbeddingUpdate)> =
            self.store.scan_prefix(EMBEDDING_PREFIX)?;
        Ok(entries.into_iter().map(|(_, update)| update).collect())
    }

    pub fn snapshot(&self) -> Result<QueueSnapshot, StorageError> {
        Ok(QueueSnapshot {
            attendance: self.list_attendance()?,
            embeddings: self.list_embeddings()?,
        })
    }
}
