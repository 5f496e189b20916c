pub mod api;
pub mod core;
pub mod remote;
pub mod storage;
pub mod sync;
pub mod utils;

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{
    core::attendance::recorder::AttendanceRecorder,
    core::enrollment::EnrollmentService,
    core::face::{EmbeddingExtractor, FaceDetector, ModelFaceDetector},
    remote::client::{HostedStoreClient, RemoteStore},
    remote::matcher::RemoteMatcher,
    remote::types::DeviceRow,
    storage::encrypted::EncryptedStore,
    sync::connectivity::ConnectivityMonitor,
    sync::engine::SyncEngine,
    sync::queue::PendingQueue,
    utils::{
        config::Config,
        error::{NodeError, Result},
    },
};

const DEVICE_PROFILE_KEY: &[u8] = b"profile/device";

pub struct Application {
    config: Arc<Config>,
    storage: Arc<EncryptedStore>,
    queue: Arc<PendingQueue>,
    remote: Arc<dyn RemoteStore>,
    recorder: Arc<AttendanceRecorder>,
    enrollment: Arc<EnrollmentService>,
    connectivity: Arc<ConnectivityMonitor>,
    sync_engine: Arc<SyncEngine>,
    server_handle: Mutex<Option<actix_web::dev::ServerHandle>>,
}

impl Application {
    pub async fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        info!("Opening local store...");
        let storage = Arc::new(EncryptedStore::new(
            &config.storage.path,
            &config.storage.encryption_key,
        )?);
        let queue = Arc::new(PendingQueue::new(storage.clone()));

        info!("Loading face detection model...");
        let detector = Arc::new(ModelFaceDetector::new(&config.face.model_dir));
        detector.initialize().await?;
        let detector: Arc<dyn FaceDetector> = detector;
        let extractor = Arc::new(EmbeddingExtractor::new(detector, config.face.min_quality));

        info!("Initializing remote store client...");
        let remote: Arc<dyn RemoteStore> = Arc::new(HostedStoreClient::new(&config.remote)?);

        let matcher = Arc::new(RemoteMatcher::new(
            remote.clone(),
            &config.node,
            &config.remote,
        ));
        let recorder = Arc::new(AttendanceRecorder::new(
            extractor.clone(),
            matcher,
            remote.clone(),
            queue.clone(),
            &config.node,
        ));
        let enrollment = Arc::new(EnrollmentService::new(
            extractor,
            remote.clone(),
            queue.clone(),
            &config.node,
        ));

        let connectivity = Arc::new(ConnectivityMonitor::new(
            remote.clone(),
            config.get_probe_interval(),
        ));
        let sync_engine = Arc::new(SyncEngine::new(
            remote.clone(),
            queue.clone(),
            &config.sync,
            connectivity.subscribe(),
        ));

        Ok(Self {
            config,
            storage,
            queue,
            remote,
            recorder,
            enrollment,
            connectivity,
            sync_engine,
            server_handle: Mutex::new(None),
        })
    }

    pub async fn start(&self) -> Result<()> {
        self.verify_device().await?;

        info!("Starting connectivity monitor...");
        self.connectivity.clone().start();

        info!("Starting sync engine...");
        self.sync_engine.clone().start();

        info!("Starting API server...");
        self.start_api_server()?;

        info!("Node successfully started");
        Ok(())
    }

    /// Confirms this device is registered and active before serving traffic.
    /// The profile is cached locally so an offline restart still comes up, as
    /// long as the device was valid the last time the remote answered.
    async fn verify_device(&self) -> Result<()> {
        match self.remote.fetch_device(self.config.node.device_id).await {
            Ok(Some(device)) => {
                if !device.active {
                    return Err(NodeError::Init(format!(
                        "Device {} is deactivated",
                        device.id
                    )));
                }
                if device.organization_id != self.config.node.organization_id
                    || device.branch_id != self.config.node.branch_id
                {
                    return Err(NodeError::Init(
                        "Device registration does not match configured organization and branch"
                            .into(),
                    ));
                }
                info!("Device verified as '{}'", device.name);
                self.storage.store(DEVICE_PROFILE_KEY, &device)?;
                Ok(())
            }
            Ok(None) => Err(NodeError::Init(format!(
                "Device {} is not registered",
                self.config.node.device_id
            ))),
            Err(err) => {
                let cached: Option<DeviceRow> = self.storage.retrieve(DEVICE_PROFILE_KEY)?;
                match cached {
                    Some(device) if device.active => {
                        warn!(
                            "Remote unreachable ({}), starting with cached profile for '{}'",
                            err, device.name
                        );
                        Ok(())
                    }
                    _ => Err(NodeError::Init(format!(
                        "Cannot verify device while offline: {}",
                        err
                    ))),
                }
            }
        }
    }

    fn start_api_server(&self) -> Result<()> {
        use crate::api::handlers;
        use actix_cors::Cors;
        use actix_web::{web, App, HttpServer};

        let recorder = self.recorder.clone();
        let enrollment = self.enrollment.clone();
        let sync_engine = self.sync_engine.clone();
        let connectivity = self.connectivity.clone();
        let queue = self.queue.clone();

        let server = HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::from(recorder.clone()))
                .app_data(web::Data::from(enrollment.clone()))
                .app_data(web::Data::from(sync_engine.clone()))
                .app_data(web::Data::from(connectivity.clone()))
                .app_data(web::Data::from(queue.clone()))
                .service(handlers::attendance::scope())
                .service(handlers::enrollment::scope())
                .service(handlers::sync::scope())
                .service(handlers::health::scope())
        })
        .bind((self.config.node.host.as_str(), self.config.node.port))
        .map_err(|e| NodeError::Init(format!("Failed to bind API server: {}", e)))?
        .run();

        *self.server_handle.lock() = Some(server.handle());
        tokio::spawn(server);

        Ok(())
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down node...");

        let handle = self.server_handle.lock().take();
        if let Some(handle) = handle {
            handle.stop(true).await;
        }

        self.sync_engine.shutdown();
        self.connectivity.shutdown();

        if self.connectivity.is_online() {
            info!("Final sync pass before exit");
            if let Err(err) = self.sync_engine.perform_full_sync().await {
                warn!("Final sync pass failed: {}", err);
            }
        }

        info!("Node shutdown complete");
        Ok(())
    }
}
