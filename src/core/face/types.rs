// src/core/face/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::FaceError;

/// Dimension of every face embedding in the system. Enrollment, matching and
/// the remote similarity search all assume this length.
pub const EMBEDDING_DIM: usize = 128;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceEmbedding(Vec<f32>);

impl FaceEmbedding {
    pub fn new(values: Vec<f32>) -> Result<Self, FaceError> {
        if values.len() != EMBEDDING_DIM {
            return Err(FaceError::InvalidDimension {
                expected: EMBEDDING_DIM,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn cosine_similarity(&self, other: &FaceEmbedding) -> f32 {
        let dot: f32 = self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum();
        let norm_a: f32 = self.0.iter().map(|a| a * a).sum::<f32>().sqrt();
        let norm_b: f32 = other.0.iter().map(|b| b * b).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }

    pub fn overlap(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) as f32 * (y2 - y1) as f32;
        let union = self.area() as f32 + other.area() as f32 - intersection;
        intersection / union
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bounding_box: BoundingBox,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct ExtractedFace {
    pub embedding: FaceEmbedding,
    pub quality: f32,
    pub bounding_box: BoundingBox,
    pub captured_at: DateTime<Utc>,
}

impl ExtractedFace {
    pub fn meets_quality(&self, minimum: f32) -> bool {
        self.quality >= minimum
    }
}
