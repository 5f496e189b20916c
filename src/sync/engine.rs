// src/sync/engine.rs
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info, warn};

use crate::remote::client::RemoteStore;
use crate::remote::error::RemoteError;
use crate::utils::config::SyncConfig;
use crate::utils::error::Result;

use super::queue::PendingQueue;
use super::types::SyncReport;

/// Drains the pending queue into the remote store. A pass runs on a fixed
/// interval, on the offline-to-online edge, and once shortly after startup.
/// Passes never overlap: a trigger that fires mid-pass is dropped, the next
/// scheduled pass picks up whatever is left.
pub struct SyncEngine {
    remote: Arc<dyn RemoteStore>,
    queue: Arc<PendingQueue>,
    sync_interval: Duration,
    startup_delay: Duration,
    online_rx: watch::Receiver<bool>,
    busy: AtomicBool,
    shutdown: Notify,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        queue: Arc<PendingQueue>,
        config: &SyncConfig,
        online_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            remote,
            queue,
            sync_interval: Duration::from_secs(config.interval),
            startup_delay: Duration::from_secs(config.startup_delay),
            online_rx,
            busy: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    pub async fn perform_full_sync(&self) -> Result<SyncReport> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync pass already running, skipping trigger");
            return Ok(SyncReport::default());
        }

        let result = self.flush_all().await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn flush_all(&self) -> Result<SyncReport> {
        let report = self
            .flush_attendance()
            .await?
            .merge(self.flush_embeddings().await?);

        if report.attempted > 0 {
            info!(
                "Sync pass finished: {}/{} delivered, {} kept for retry",
                report.synced, report.attempted, report.failed
            );
        }
        Ok(report)
    }

    async fn flush_attendance(&self) -> Result<SyncReport> {
        let pending = self.queue.list_attendance()?;
        let mut report = SyncReport {
            attempted: pending.len(),
            ..SyncReport::default()
        };

        for record in pending {
            match self.remote.insert_attendance_event(&record.to_insert()).await {
                Ok(event) => {
                    self.queue.remove_attendance(&record.local_id)?;
                    report.synced += 1;
                    debug!("Delivered queued attendance {} as {}", record.local_id, event.id);
                }
                // A conflict means the row landed on an earlier attempt or the
                // user clocked in on another device. Either way it is done.
                Err(RemoteError::Conflict) => {
                    self.queue.remove_attendance(&record.local_id)?;
                    report.synced += 1;
                    debug!("Queued attendance {} already present remotely", record.local_id);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!("Keeping attendance {} queued: {}", record.local_id, err);
                }
            }
        }

        Ok(report)
    }

    async fn flush_embeddings(&self) -> Result<SyncReport> {
        let pending = self.queue.list_embeddings()?;
        let mut report = SyncReport {
            attempted: pending.len(),
            ..SyncReport::default()
        };

        for update in pending {
            match self.remote.upsert_face_embedding(&update.to_insert()).await {
                Ok(()) | Err(RemoteError::Conflict) => {
                    self.queue.remove_embedding(&update.user_id)?;
                    report.synced += 1;
                    debug!("Delivered queued embedding for user {}", update.user_id);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "Keeping embedding for user {} queued: {}",
                        update.user_id, err
                    );
                }
            }
        }

        Ok(report)
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.startup_delay) => {}
            _ = self.shutdown.notified() => return,
        }

        let mut online_rx = self.online_rx.clone();
        if *online_rx.borrow_and_update() {
            self.try_sync().await;
        }

        let mut ticker = interval_at(Instant::now() + self.sync_interval, self.sync_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if *online_rx.borrow() {
                        self.try_sync().await;
                    }
                }
                changed = online_rx.changed() => {
                    match changed {
                        Ok(()) => {
                            if *online_rx.borrow_and_update() {
                                info!("Connectivity restored, draining pending queue");
                                self.try_sync().await;
                            }
                        }
                        Err(_) => break,
                    }
                }
                _ = self.shutdown.notified() => break,
            }
        }
    }

    async fn try_sync(&self) {
        if let Err(err) = self.perform_full_sync().await {
            error!("Sync pass aborted: {}", err);
        }
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attendance::types::AttendanceEvent;
    use crate::core::face::{FaceEmbedding, EMBEDDING_DIM};
    use crate::remote::client::MockRemoteStore;
    use crate::storage::encrypted::EncryptedStore;
    use crate::sync::types::{PendingAttendanceRecord, PendingEmbeddingUpdate};
    use chrono::Utc;
    use tempfile::{tempdir, TempDir};
    use uuid::Uuid;

    fn test_queue() -> (TempDir, Arc<PendingQueue>) {
        let dir = tempdir().unwrap();
        let store = Arc::new(EncryptedStore::new(dir.path(), "engine-test-key").unwrap());
        (dir, Arc::new(PendingQueue::new(store)))
    }

    fn test_engine(
        remote: MockRemoteStore,
        queue: Arc<PendingQueue>,
    ) -> (SyncEngine, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(true);
        let config = SyncConfig {
            interval: 60,
            startup_delay: 0,
            probe_interval: 30,
        };
        (SyncEngine::new(Arc::new(remote), queue, &config, rx), tx)
    }

    fn pending_record() -> PendingAttendanceRecord {
        PendingAttendanceRecord {
            local_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            device_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            confidence: 0.82,
            photo_url: None,
        }
    }

    fn pending_embedding() -> PendingEmbeddingUpdate {
        PendingEmbeddingUpdate {
            user_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            descriptor: FaceEmbedding::new(vec![0.2; EMBEDDING_DIM]).unwrap(),
            quality: 68.0,
            captured_at: Utc::now(),
            is_primary: false,
        }
    }

    fn echo_event(insert: &crate::remote::types::NewAttendanceEvent) -> AttendanceEvent {
        AttendanceEvent {
            id: Uuid::new_v4(),
            user_id: insert.user_id,
            device_id: insert.device_id,
            organization_id: insert.organization_id,
            branch_id: insert.branch_id,
            clock_in: insert.clock_in,
            clock_out: None,
            date: insert.date,
            status: insert.status,
            confidence_score: insert.confidence_score,
            verification_method: insert.verification_method,
            synced: insert.synced,
        }
    }

    #[tokio::test]
    async fn test_successful_pass_empties_queue() {
        let (_dir, queue) = test_queue();
        queue.enqueue_attendance(&pending_record()).unwrap();
        queue.put_embedding_update(&pending_embedding()).unwrap();

        let mut remote = MockRemoteStore::new();
        remote
            .expect_insert_attendance_event()
            .times(1)
            .returning(|insert| Ok(echo_event(insert)));
        remote
            .expect_upsert_face_embedding()
            .times(1)
            .returning(|_| Ok(()));

        let (engine, _tx) = test_engine(remote, queue.clone());
        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 0);
        assert!(queue.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_conflict_counts_as_delivered() {
        let (_dir, queue) = test_queue();
        queue.enqueue_attendance(&pending_record()).unwrap();

        let mut remote = MockRemoteStore::new();
        remote
            .expect_insert_attendance_event()
            .times(1)
            .returning(|_| Err(RemoteError::Conflict));

        let (engine, _tx) = test_engine(remote, queue.clone());
        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 0);
        assert!(queue.list_attendance().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_record_queued() {
        let (_dir, queue) = test_queue();
        let record = pending_record();
        queue.enqueue_attendance(&record).unwrap();

        let mut remote = MockRemoteStore::new();
        remote
            .expect_insert_attendance_event()
            .times(1)
            .returning(|_| Err(RemoteError::Transport("connection reset".into())));

        let (engine, _tx) = test_engine(remote, queue.clone());
        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(queue.list_attendance().unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_only_failed_entries() {
        let (_dir, queue) = test_queue();
        let first = pending_record();
        let mut second = pending_record();
        second.timestamp = first.timestamp + chrono::Duration::minutes(1);
        queue.enqueue_attendance(&first).unwrap();
        queue.enqueue_attendance(&second).unwrap();

        let mut remote = MockRemoteStore::new();
        let mut call = 0;
        remote
            .expect_insert_attendance_event()
            .times(2)
            .returning(move |insert| {
                call += 1;
                if call == 1 {
                    Ok(echo_event(insert))
                } else {
                    Err(RemoteError::Api {
                        status: 503,
                        message: "unavailable".into(),
                    })
                }
            });

        let (engine, _tx) = test_engine(remote, queue.clone());
        let report = engine.perform_full_sync().await.unwrap();

        assert_eq!(report.synced, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(queue.list_attendance().unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_empty_queue_is_a_quiet_pass() {
        let (_dir, queue) = test_queue();
        let remote = MockRemoteStore::new();

        let (engine, _tx) = test_engine(remote, queue);
        let report = engine.perform_full_sync().await.unwrap();
        assert_eq!(report, SyncReport::default());
    }
}
