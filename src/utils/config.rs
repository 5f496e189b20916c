use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::utils::error::{NodeError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub remote: RemoteConfig,
    pub face: FaceConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub device_id: Uuid,
    pub organization_id: Uuid,
    pub branch_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub api_url: String,
    pub api_key: String,
    pub request_timeout: u64,
    pub similarity_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FaceConfig {
    pub model_dir: String,
    pub min_quality: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub interval: u64,
    pub startup_delay: u64,
    pub probe_interval: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: String,
    pub encryption_key: String,
}

impl Config {
    pub fn new() -> Result<Self> {
        let config = ConfigLib::builder()
            // Start with default values
            .set_default("node.host", "127.0.0.1")?
            .set_default("node.port", 7421)?
            .set_default("node.log_level", "info")?
            .set_default("remote.request_timeout", 15)?
            .set_default("remote.similarity_threshold", 0.65)?
            .set_default("face.model_dir", "models")?
            .set_default("face.min_quality", 50.0)?
            .set_default("sync.interval", 60)?
            .set_default("sync.startup_delay", 5)?
            .set_default("sync.probe_interval", 30)?
            // Load from config file
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (e.g., APP_REMOTE_API_URL)
            .add_source(Environment::with_prefix("APP").separator("_"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.port == 0 {
            return Err(NodeError::Config("Invalid port number".into()));
        }

        if self.remote.api_url.is_empty() {
            return Err(NodeError::Config("remote.api_url must be set".into()));
        }
        if self.remote.api_key.is_empty() {
            return Err(NodeError::Config("remote.api_key must be set".into()));
        }
        if !(0.0..=1.0).contains(&self.remote.similarity_threshold) {
            return Err(NodeError::Config(
                "remote.similarity_threshold must be within [0, 1]".into(),
            ));
        }

        if !(0.0..=100.0).contains(&self.face.min_quality) {
            return Err(NodeError::Config(
                "face.min_quality must be within [0, 100]".into(),
            ));
        }

        if self.sync.interval == 0 {
            return Err(NodeError::Config("sync.interval must be greater than 0".into()));
        }

        if self.storage.path.is_empty() {
            return Err(NodeError::Config("storage.path must be set".into()));
        }
        if self.storage.encryption_key.is_empty() {
            return Err(NodeError::Config("storage.encryption_key must be set".into()));
        }

        Ok(())
    }

    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.request_timeout)
    }

    pub fn get_sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval)
    }

    pub fn get_startup_delay(&self) -> Duration {
        Duration::from_secs(self.sync.startup_delay)
    }

    pub fn get_probe_interval(&self) -> Duration {
        Duration::from_secs(self.sync.probe_interval)
    }
}

impl From<ConfigError> for NodeError {
    fn from(error: ConfigError) -> Self {
        NodeError::Config(error.to_string())
    }
}
