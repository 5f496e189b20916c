// src/api/types.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::attendance::types::{AttendanceOutcome, RejectionReason};

#[derive(Debug, Deserialize)]
pub struct MarkAttendanceRequest {
    pub image: Vec<u8>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceResponse {
    pub result: String,
    pub event_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub message: String,
}

impl From<&AttendanceOutcome> for AttendanceResponse {
    fn from(outcome: &AttendanceOutcome) -> Self {
        match outcome {
            AttendanceOutcome::Committed(event) => Self {
                result: "committed".to_string(),
                event_id: Some(event.id),
                user_id: Some(event.user_id),
                message: "Attendance recorded".to_string(),
            },
            AttendanceOutcome::Queued(record) => Self {
                result: "queued".to_string(),
                event_id: None,
                user_id: Some(record.user_id),
                message: "Attendance saved on device and will sync when the connection returns"
                    .to_string(),
            },
            AttendanceOutcome::Rejected(reason) => Self {
                result: "rejected".to_string(),
                event_id: None,
                user_id: match reason {
                    RejectionReason::AlreadyMarked { user_id, .. } => Some(*user_id),
                    _ => None,
                },
                message: reason.user_message(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub user_id: Uuid,
    pub image: Vec<u8>,
    pub is_primary: bool,
}

#[derive(Debug, Serialize)]
pub struct EnrollResponse {
    pub result: String,
    pub quality: f32,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub online: bool,
    pub pending_attendance: usize,
    pub pending_embeddings: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub online: bool,
    pub pending: usize,
}
