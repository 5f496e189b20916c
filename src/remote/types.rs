// src/remote/types.rs
//
// Wire types for the hosted relational store. Every remote payload is
// deserialized into one of these at the boundary; untyped JSON does not flow
// past this module.
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::attendance::types::{AttendanceStatus, VerificationMethod};
use crate::core::face::FaceEmbedding;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub user_id: Uuid,
    pub name: String,
    pub staff_id: Option<String>,
    pub similarity: f32,
}

/// Insert payload for a new attendance event. The remote store assigns `id`
/// and echoes the full row back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttendanceEvent {
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub clock_in: DateTime<Utc>,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub confidence_score: f32,
    pub verification_method: VerificationMethod,
    pub synced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFaceEmbedding {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub descriptor: FaceEmbedding,
    pub quality: f32,
    pub captured_at: DateTime<Utc>,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
    pub name: String,
    pub active: bool,
}
