// src/core/attendance/types.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sync::types::PendingAttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    OnLeave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    Face,
    Manual,
}

/// Authoritative attendance row as stored remotely. One event per user per
/// branch per calendar day for clock-in semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub clock_in: DateTime<Utc>,
    pub clock_out: Option<DateTime<Utc>>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub confidence_score: f32,
    pub verification_method: VerificationMethod,
    pub synced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectionReason {
    NoFaceDetected,
    MultipleFacesDetected,
    LowQuality,
    NoMatchFound,
    AlreadyMarked { user_id: Uuid, name: String },
}

impl RejectionReason {
    pub fn user_message(&self) -> String {
        match self {
            RejectionReason::NoFaceDetected => "No face detected, please retake the photo".into(),
            RejectionReason::MultipleFacesDetected => {
                "More than one face detected, please retake the photo".into()
            }
            RejectionReason::LowQuality => "Photo quality too low, please retake".into(),
            RejectionReason::NoMatchFound => "No enrolled face matched".into(),
            RejectionReason::AlreadyMarked { name, .. } => {
                format!("{} already clocked in today", name)
            }
        }
    }
}

/// Terminal result of one attendance-marking attempt. Queued counts as a
/// soft success: the event is durably held locally and will be delivered.
#[derive(Debug, Clone)]
pub enum AttendanceOutcome {
    Committed(AttendanceEvent),
    Queued(PendingAttendanceRecord),
    Rejected(RejectionReason),
}
