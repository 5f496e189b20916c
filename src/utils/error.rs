// src/utils/error.rs
use thiserror::Error;

use crate::core::face::error::FaceError;
use crate::remote::error::RemoteError;
use crate::storage::encrypted::StorageError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Face processing error: {0}")]
    Face(#[from] FaceError),

    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Initialization error: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, NodeError>;
