// src/api/handlers/attendance.rs
use actix_web::{
    web::{self, Data, Json},
    HttpResponse, Scope,
};
use tracing::info;

use crate::api::types::{AttendanceResponse, MarkAttendanceRequest};
use crate::core::attendance::recorder::{AttendanceRecorder, CaptureRequest};

use super::map_node_error;

pub fn scope() -> Scope {
    web::scope("/attendance")
        .service(web::resource("/mark").route(web::post().to(mark_attendance)))
}

async fn mark_attendance(
    recorder: Data<AttendanceRecorder>,
    request: Json<MarkAttendanceRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    info!("Received attendance capture ({} bytes)", request.image.len());

    let request = request.into_inner();
    let outcome = recorder
        .mark_attendance(CaptureRequest {
            image: request.image,
            photo_url: request.photo_url,
        })
        .await
        .map_err(map_node_error)?;

    Ok(HttpResponse::Ok().json(AttendanceResponse::from(&outcome)))
}
