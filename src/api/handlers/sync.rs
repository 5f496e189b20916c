// src/api/handlers/sync.rs
use actix_web::{
    web::{self, Data},
    HttpResponse, Scope,
};
use tracing::info;

use crate::api::types::SyncStatusResponse;
use crate::sync::connectivity::ConnectivityMonitor;
use crate::sync::engine::SyncEngine;
use crate::sync::queue::PendingQueue;

use super::map_node_error;

pub fn scope() -> Scope {
    web::scope("/sync")
        .service(web::resource("/run").route(web::post().to(run_sync)))
        .service(web::resource("/status").route(web::get().to(sync_status)))
}

async fn run_sync(engine: Data<SyncEngine>) -> Result<HttpResponse, actix_web::Error> {
    info!("Manual sync requested");
    let report = engine.perform_full_sync().await.map_err(map_node_error)?;
    Ok(HttpResponse::Ok().json(report))
}

async fn sync_status(
    queue: Data<PendingQueue>,
    monitor: Data<ConnectivityMonitor>,
) -> Result<HttpResponse, actix_web::Error> {
    let snapshot = queue.snapshot().map_err(|e| map_node_error(e.into()))?;
    Ok(HttpResponse::Ok().json(SyncStatusResponse {
        online: monitor.is_online(),
        pending_attendance: snapshot.attendance.len(),
        pending_embeddings: snapshot.embeddings.len(),
    }))
}
