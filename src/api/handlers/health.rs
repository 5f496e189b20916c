// src/api/handlers/health.rs
use actix_web::{
    web::{self, Data},
    HttpResponse, Scope,
};

use crate::api::types::HealthResponse;
use crate::sync::connectivity::ConnectivityMonitor;
use crate::sync::queue::PendingQueue;

use super::map_node_error;

pub fn scope() -> Scope {
    web::scope("/health").service(web::resource("").route(web::get().to(health)))
}

async fn health(
    monitor: Data<ConnectivityMonitor>,
    queue: Data<PendingQueue>,
) -> Result<HttpResponse, actix_web::Error> {
    let snapshot = queue.snapshot().map_err(|e| map_node_error(e.into()))?;
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        online: monitor.is_online(),
        pending: snapshot.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::client::MockRemoteStore;
    use crate::storage::encrypted::EncryptedStore;
    use actix_web::{test, App};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[actix_web::test]
    async fn test_health_reports_offline_before_first_probe() {
        let dir = tempdir().unwrap().into_path();
        let store = Arc::new(EncryptedStore::new(dir, "health-test-key").unwrap());
        let queue = Arc::new(PendingQueue::new(store));
        let monitor = Arc::new(ConnectivityMonitor::new(
            Arc::new(MockRemoteStore::new()),
            Duration::from_secs(30),
        ));

        let app = test::init_service(
            App::new()
                .app_data(Data::from(queue))
                .app_data(Data::from(monitor))
                .service(scope()),
        )
        .await;

        let request = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, request).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["online"], false);
        assert_eq!(body["pending"], 0);
    }
}
