// src/api/handlers/enrollment.rs
use actix_web::{
    web::{self, Data, Json},
    HttpResponse, Scope,
};
use tracing::info;

use crate::api::types::{EnrollRequest, EnrollResponse};
use crate::core::enrollment::{EnrollmentOutcome, EnrollmentRequest, EnrollmentService};

use super::map_node_error;

pub fn scope() -> Scope {
    web::scope("/enrollment").service(web::resource("").route(web::post().to(enroll)))
}

async fn enroll(
    service: Data<EnrollmentService>,
    request: Json<EnrollRequest>,
) -> Result<HttpResponse, actix_web::Error> {
    info!("Received enrollment capture for user {}", request.user_id);

    let request = request.into_inner();
    let outcome = service
        .enroll(EnrollmentRequest {
            user_id: request.user_id,
            image: request.image,
            is_primary: request.is_primary,
        })
        .await
        .map_err(map_node_error)?;

    let response = match outcome {
        EnrollmentOutcome::Stored { quality } => HttpResponse::Created().json(EnrollResponse {
            result: "stored".to_string(),
            quality,
        }),
        EnrollmentOutcome::Queued { quality } => HttpResponse::Accepted().json(EnrollResponse {
            result: "queued".to_string(),
            quality,
        }),
    };
    Ok(response)
}
