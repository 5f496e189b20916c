// src/api/handlers/mod.rs
pub mod attendance;
pub mod enrollment;
pub mod health;
pub mod sync;

use tracing::{error, warn};

use crate::core::face::FaceError;
use crate::utils::error::NodeError;

/// One mapping for every handler: capture problems are the caller's fault,
/// remote problems are the upstream's, everything else is ours.
pub(crate) fn map_node_error(error: NodeError) -> actix_web::Error {
    match &error {
        NodeError::Face(FaceError::Decode(_)) => {
            warn!("Rejecting undecodable image: {}", error);
            actix_web::error::ErrorBadRequest(error)
        }
        NodeError::Face(_) => {
            warn!("Rejecting capture: {}", error);
            actix_web::error::ErrorUnprocessableEntity(error)
        }
        NodeError::Remote(_) => {
            error!("Remote store failure: {}", error);
            actix_web::error::ErrorBadGateway(error)
        }
        _ => {
            error!("Request failed: {}", error);
            actix_web::error::ErrorInternalServerError(error)
        }
    }
}
