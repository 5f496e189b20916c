// src/core/face/mod.rs
pub mod detector;
pub mod error;
pub mod extractor;
pub mod quality;
pub mod types;

pub use detector::{FaceDetector, ModelFaceDetector};
pub use error::FaceError;
pub use extractor::EmbeddingExtractor;
pub use types::{BoundingBox, ExtractedFace, FaceDetection, FaceEmbedding, EMBEDDING_DIM};
