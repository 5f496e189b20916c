// src/sync/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::attendance::types::{AttendanceStatus, VerificationMethod};
use crate::core::face::FaceEmbedding;
use crate::remote::types::{NewAttendanceEvent, NewFaceEmbedding};

/// Attendance attempt held locally until the remote store accepts it.
/// `local_id` is assigned at enqueue time and never leaves the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAttendanceRecord {
    pub local_id: Uuid,
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub photo_url: Option<String>,
}

impl PendingAttendanceRecord {
    /// Rebuilds the insert payload at flush time. The capture timestamp is
    /// preserved, so a record delivered hours late still lands on the day it
    /// was taken.
    pub fn to_insert(&self) -> NewAttendanceEvent {
        NewAttendanceEvent {
            user_id: self.user_id,
            device_id: self.device_id,
            organization_id: self.organization_id,
            branch_id: self.branch_id,
            clock_in: self.timestamp,
            date: self.timestamp.date_naive(),
            status: AttendanceStatus::Present,
            confidence_score: self.confidence,
            verification_method: VerificationMethod::Face,
            synced: true,
        }
    }
}

/// Latest enrollment descriptor captured while offline. One slot per user,
/// newer captures replace older ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEmbeddingUpdate {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub descriptor: FaceEmbedding,
    pub quality: f32,
    pub captured_at: DateTime<Utc>,
    pub is_primary: bool,
}

impl PendingEmbeddingUpdate {
    pub fn to_insert(&self) -> NewFaceEmbedding {
        NewFaceEmbedding {
            user_id: self.user_id,
            organization_id: self.organization_id,
            descriptor: self.descriptor.clone(),
            quality: self.quality,
            captured_at: self.captured_at,
            is_primary: self.is_primary,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
}

impl SyncReport {
    pub fn merge(self, other: SyncReport) -> SyncReport {
        SyncReport {
            attempted: self.attempted + other.attempted,
            synced: self.synced + other.synced,
            failed: self.failed + other.failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub attendance: Vec<PendingAttendanceRecord>,
    pub embeddings: Vec<PendingEmbeddingUpdate>,
}

impl QueueSnapshot {
    pub fn is_empty(&self) -> bool {
        self.attendance.is_empty() && self.embeddings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attendance.len() + self.embeddings.len()
    }
}
