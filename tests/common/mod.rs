// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use image::{DynamicImage, RgbImage};
use parking_lot::Mutex;
use tempfile::tempdir;
use tokio::sync::watch;
use uuid::Uuid;

use facemark::core::attendance::recorder::AttendanceRecorder;
use facemark::core::attendance::types::{AttendanceEvent, AttendanceStatus, VerificationMethod};
use facemark::core::enrollment::EnrollmentService;
use facemark::core::face::{
    BoundingBox, EmbeddingExtractor, FaceDetection, FaceDetector, FaceError,
};
use facemark::remote::client::RemoteStore;
use facemark::remote::error::RemoteError;
use facemark::remote::matcher::RemoteMatcher;
use facemark::remote::types::{DeviceRow, MatchCandidate, NewAttendanceEvent, NewFaceEmbedding};
use facemark::storage::encrypted::EncryptedStore;
use facemark::sync::engine::SyncEngine;
use facemark::sync::queue::PendingQueue;
use facemark::utils::config::{NodeConfig, RemoteConfig, SyncConfig};

/// In-memory remote store with a switchable online flag. Write calls observe
/// the same uniqueness rule as the hosted side: one attendance event per user
/// per branch per day.
pub struct FakeRemote {
    online: AtomicBool,
    fail_writes: AtomicBool,
    fail_user: Mutex<Option<Uuid>>,
    candidates: Mutex<Vec<MatchCandidate>>,
    events: Mutex<Vec<AttendanceEvent>>,
    embeddings: Mutex<Vec<NewFaceEmbedding>>,
    insert_delay: Mutex<Option<Duration>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            fail_user: Mutex::new(None),
            candidates: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            embeddings: Mutex::new(Vec::new()),
            insert_delay: Mutex::new(None),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Reads keep working but every write fails with a transport error, like
    /// a connection that drops mid-request.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Writes for this user fail with a transport error; everyone else's
    /// succeed.
    pub fn set_fail_user(&self, user_id: Option<Uuid>) {
        *self.fail_user.lock() = user_id;
    }

    pub fn set_candidates(&self, candidates: Vec<MatchCandidate>) {
        *self.candidates.lock() = candidates;
    }

    pub fn set_insert_delay(&self, delay: Duration) {
        *self.insert_delay.lock() = Some(delay);
    }

    pub fn events(&self) -> Vec<AttendanceEvent> {
        self.events.lock().clone()
    }

    pub fn embeddings(&self) -> Vec<NewFaceEmbedding> {
        self.embeddings.lock().clone()
    }

    pub fn seed_event(&self, user_id: Uuid, branch_id: Uuid, date: NaiveDate) {
        self.events.lock().push(AttendanceEvent {
            id: Uuid::new_v4(),
            user_id,
            device_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id,
            clock_in: Utc::now(),
            clock_out: None,
            date,
            status: AttendanceStatus::Present,
            confidence_score: 0.8,
            verification_method: VerificationMethod::Face,
            synced: true,
        });
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Transport("remote unreachable".into()))
        }
    }

    fn check_writable(&self, user_id: Uuid) -> Result<(), RemoteError> {
        self.check_online()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("connection reset during write".into()));
        }
        if *self.fail_user.lock() == Some(user_id) {
            return Err(RemoteError::Transport("connection reset during write".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn match_embedding(
        &self,
        _embedding: &facemark::core::face::FaceEmbedding,
        _organization_id: Uuid,
        _threshold: f32,
    ) -> Result<Vec<MatchCandidate>, RemoteError> {
        self.check_online()?;
        Ok(self.candidates.lock().clone())
    }

    async fn find_attendance_event(
        &self,
        user_id: Uuid,
        branch_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<AttendanceEvent>, RemoteError> {
        self.check_online()?;
        Ok(self
            .events
            .lock()
            .iter()
            .find(|event| {
                event.user_id == user_id && event.branch_id == branch_id && event.date == date
            })
            .cloned())
    }

    async fn insert_attendance_event(
        &self,
        event: &NewAttendanceEvent,
    ) -> Result<AttendanceEvent, RemoteError> {
        let delay = *self.insert_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_writable(event.user_id)?;

        let mut events = self.events.lock();
        let duplicate = events.iter().any(|existing| {
            existing.user_id == event.user_id
                && existing.branch_id == event.branch_id
                && existing.date == event.date
        });
        if duplicate {
            return Err(RemoteError::Conflict);
        }

        let row = AttendanceEvent {
            id: Uuid::new_v4(),
            user_id: event.user_id,
            device_id: event.device_id,
            organization_id: event.organization_id,
            branch_id: event.branch_id,
            clock_in: event.clock_in,
            clock_out: None,
            date: event.date,
            status: event.status,
            confidence_score: event.confidence_score,
            verification_method: event.verification_method,
            synced: event.synced,
        };
        events.push(row.clone());
        Ok(row)
    }

    async fn upsert_face_embedding(
        &self,
        embedding: &NewFaceEmbedding,
    ) -> Result<(), RemoteError> {
        self.check_writable(embedding.user_id)?;
        let mut embeddings = self.embeddings.lock();
        embeddings.retain(|existing| existing.user_id != embedding.user_id);
        embeddings.push(embedding.clone());
        Ok(())
    }

    async fn fetch_device(&self, device_id: Uuid) -> Result<Option<DeviceRow>, RemoteError> {
        self.check_online()?;
        Ok(Some(DeviceRow {
            id: device_id,
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
            name: "test kiosk".to_string(),
            active: true,
        }))
    }

    async fn health_check(&self) -> Result<(), RemoteError> {
        self.check_online()
    }
}

pub struct StubDetector {
    detections: Vec<FaceDetection>,
}

impl StubDetector {
    pub fn single_face() -> Self {
        Self {
            detections: vec![FaceDetection {
                bounding_box: BoundingBox {
                    x: 8,
                    y: 8,
                    width: 48,
                    height: 48,
                },
                confidence: 0.9,
            }],
        }
    }

    pub fn with(detections: Vec<FaceDetection>) -> Self {
        Self { detections }
    }
}

#[async_trait]
impl FaceDetector for StubDetector {
    async fn detect(&self, _image: &DynamicImage) -> Result<Vec<FaceDetection>, FaceError> {
        Ok(self.detections.clone())
    }
}

pub fn test_image_bytes() -> Vec<u8> {
    let mut image = RgbImage::new(64, 64);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let shade = ((x * 3 + y * 7) % 255) as u8;
        *pixel = image::Rgb([shade, 255 - shade, shade / 2]);
    }
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, image::ImageOutputFormat::Png)
        .unwrap();
    bytes.into_inner()
}

pub fn candidate(name: &str, similarity: f32) -> MatchCandidate {
    MatchCandidate {
        user_id: Uuid::new_v4(),
        name: name.to_string(),
        staff_id: None,
        similarity,
    }
}

pub struct TestContext {
    pub dir: tempfile::TempDir,
    pub node: NodeConfig,
    pub remote: Arc<FakeRemote>,
    pub queue: Arc<PendingQueue>,
    pub recorder: AttendanceRecorder,
    pub enrollment: EnrollmentService,
    pub engine: Arc<SyncEngine>,
    online_tx: watch::Sender<bool>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_detector(StubDetector::single_face())
    }

    pub fn with_detector(detector: StubDetector) -> Self {
        let dir = tempdir().unwrap();
        let store = Arc::new(EncryptedStore::new(dir.path(), "integration-key").unwrap());
        let queue = Arc::new(PendingQueue::new(store));

        let node = NodeConfig {
            host: "127.0.0.1".to_string(),
            port: 7421,
            log_level: "info".to_string(),
            device_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            branch_id: Uuid::new_v4(),
        };
        let remote_config = RemoteConfig {
            api_url: "https://store.example.com".to_string(),
            api_key: "service-key".to_string(),
            request_timeout: 5,
            similarity_threshold: 0.65,
        };
        let sync_config = SyncConfig {
            interval: 60,
            startup_delay: 0,
            probe_interval: 30,
        };

        let remote = Arc::new(FakeRemote::new());
        let remote_dyn: Arc<dyn RemoteStore> = remote.clone();

        let extractor = Arc::new(EmbeddingExtractor::new(Arc::new(detector), 0.0));
        let matcher = Arc::new(RemoteMatcher::new(remote_dyn.clone(), &node, &remote_config));
        let recorder = AttendanceRecorder::new(
            extractor.clone(),
            matcher,
            remote_dyn.clone(),
            queue.clone(),
            &node,
        );
        let enrollment =
            EnrollmentService::new(extractor, remote_dyn.clone(), queue.clone(), &node);

        let (online_tx, online_rx) = watch::channel(true);
        let engine = Arc::new(SyncEngine::new(
            remote_dyn,
            queue.clone(),
            &sync_config,
            online_rx,
        ));

        Self {
            dir,
            node,
            remote,
            queue,
            recorder,
            enrollment,
            engine,
            online_tx,
        }
    }

    pub fn set_connectivity(&self, online: bool) {
        self.remote.set_online(online);
        let _ = self.online_tx.send(online);
    }
}
