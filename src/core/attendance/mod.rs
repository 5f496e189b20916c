// src/core/attendance/mod.rs
pub mod recorder;
pub mod types;

pub use recorder::{AttendanceRecorder, CaptureRequest};
pub use types::{
    AttendanceEvent, AttendanceOutcome, AttendanceStatus, RejectionReason, VerificationMethod,
};
