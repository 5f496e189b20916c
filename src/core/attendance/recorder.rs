// src/core/attendance/recorder.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::face::{EmbeddingExtractor, FaceError};
use crate::remote::client::RemoteStore;
use crate::remote::error::RemoteError;
use crate::remote::matcher::RemoteMatcher;
use crate::remote::types::{MatchCandidate, NewAttendanceEvent};
use crate::sync::queue::PendingQueue;
use crate::sync::types::PendingAttendanceRecord;
use crate::utils::config::NodeConfig;
use crate::utils::error::Result;

use super::types::{
    AttendanceOutcome, AttendanceStatus, RejectionReason, VerificationMethod,
};

pub struct CaptureRequest {
    pub image: Vec<u8>,
    pub photo_url: Option<String>,
}

/// Drives one attendance attempt end to end: extract, match, check for a
/// same-day duplicate, then commit. A commit that fails on transport is
/// queued locally instead of failing the attempt.
pub struct AttendanceRecorder {
    extractor: Arc<EmbeddingExtractor>,
    matcher: Arc<RemoteMatcher>,
    remote: Arc<dyn RemoteStore>,
    queue: Arc<PendingQueue>,
    device_id: Uuid,
    organization_id: Uuid,
    branch_id: Uuid,
}

impl AttendanceRecorder {
    pub fn new(
        extractor: Arc<EmbeddingExtractor>,
        matcher: Arc<RemoteMatcher>,
        remote: Arc<dyn RemoteStore>,
        queue: Arc<PendingQueue>,
        node: &NodeConfig,
    ) -> Self {
        Self {
            extractor,
            matcher,
            remote,
            queue,
            device_id: node.device_id,
            organization_id: node.organization_id,
            branch_id: node.branch_id,
        }
    }

    pub async fn mark_attendance(&self, request: CaptureRequest) -> Result<AttendanceOutcome> {
        let face = match self.extractor.extract(&request.image).await {
            Ok(face) => face,
            Err(FaceError::NoFaceDetected) => {
                return Ok(AttendanceOutcome::Rejected(RejectionReason::NoFaceDetected))
            }
            Err(FaceError::MultipleFacesDetected { count }) => {
                debug!("Rejecting capture with {} faces", count);
                return Ok(AttendanceOutcome::Rejected(
                    RejectionReason::MultipleFacesDetected,
                ));
            }
            Err(FaceError::LowQuality { score, minimum }) => {
                debug!("Rejecting capture, quality {:.1} below {:.1}", score, minimum);
                return Ok(AttendanceOutcome::Rejected(RejectionReason::LowQuality));
            }
            Err(err) => return Err(err.into()),
        };

        let candidates = self.matcher.find_candidates(&face.embedding).await?;
        let best = match RemoteMatcher::best_of(&candidates) {
            Some(candidate) => candidate,
            None => return Ok(AttendanceOutcome::Rejected(RejectionReason::NoMatchFound)),
        };
        info!(
            "Matched {} with similarity {:.2}",
            best.name, best.similarity
        );

        let now = Utc::now();
        let existing = self
            .remote
            .find_attendance_event(best.user_id, self.branch_id, now.date_naive())
            .await?;
        if let Some(event) = existing {
            debug!("Duplicate clock-in, existing event {}", event.id);
            return Ok(AttendanceOutcome::Rejected(self.already_marked(best)));
        }

        let insert = NewAttendanceEvent {
            user_id: best.user_id,
            device_id: self.device_id,
            organization_id: self.organization_id,
            branch_id: self.branch_id,
            clock_in: now,
            date: now.date_naive(),
            status: AttendanceStatus::Present,
            confidence_score: best.similarity,
            verification_method: VerificationMethod::Face,
            synced: true,
        };

        match self.remote.insert_attendance_event(&insert).await {
            Ok(event) => {
                info!("Recorded attendance {} for {}", event.id, best.name);
                Ok(AttendanceOutcome::Committed(event))
            }
            // Another device won the race between the duplicate check and the
            // insert. The unique index makes this equivalent to AlreadyMarked.
            Err(RemoteError::Conflict) => {
                Ok(AttendanceOutcome::Rejected(self.already_marked(best)))
            }
            Err(err) if err.is_retriable() => {
                warn!("Commit failed, holding record locally: {}", err);
                let record = PendingAttendanceRecord {
                    local_id: Uuid::new_v4(),
                    user_id: best.user_id,
                    device_id: self.device_id,
                    organization_id: self.organization_id,
                    branch_id: self.branch_id,
                    timestamp: now,
                    confidence: best.similarity,
                    photo_url: request.photo_url,
                };
                self.queue.enqueue_attendance(&record)?;
                Ok(AttendanceOutcome::Queued(record))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn already_marked(&self, candidate: &MatchCandidate) -> RejectionReason {
        RejectionReason::AlreadyMarked {
            user_id: candidate.user_id,
            name: candidate.name.clone(),
        }
    }
}
