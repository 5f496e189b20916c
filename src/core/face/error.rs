// src/core/face/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaceError {
    #[error("No face detected in the captured image")]
    NoFaceDetected,

    #[error("Multiple faces detected in the captured image: {count}")]
    MultipleFacesDetected { count: usize },

    #[error("Capture quality {score:.1} below minimum {minimum:.1}")]
    LowQuality { score: f32, minimum: f32 },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Detection model error: {0}")]
    Model(String),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },
}
