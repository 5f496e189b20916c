// src/core/face/extractor.rs
use std::sync::Arc;

use chrono::Utc;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

use super::detector::FaceDetector;
use super::error::FaceError;
use super::quality;
use super::types::{BoundingBox, ExtractedFace, FaceEmbedding, EMBEDDING_DIM};

const GRID_WIDTH: u32 = 16;
const GRID_HEIGHT: u32 = 8;

/// Turns one captured photo into an embedding plus a quality estimate.
///
/// Pure over its input aside from the detector's one-time model load: the
/// same image always produces the same embedding.
pub struct EmbeddingExtractor {
    detector: Arc<dyn FaceDetector>,
    min_quality: f32,
}

impl EmbeddingExtractor {
    pub fn new(detector: Arc<dyn FaceDetector>, min_quality: f32) -> Self {
        Self { detector, min_quality }
    }

    pub async fn extract(&self, image_bytes: &[u8]) -> Result<ExtractedFace, FaceError> {
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| FaceError::Decode(e.to_string()))?;

        let detections = self.detector.detect(&image).await?;
        let face = match detections.len() {
            0 => return Err(FaceError::NoFaceDetected),
            1 => &detections[0],
            count => return Err(FaceError::MultipleFacesDetected { count }),
        };

        let bounding_box = clamp_to_image(&face.bounding_box, image.width(), image.height());
        let crop = image
            .crop_imm(bounding_box.x, bounding_box.y, bounding_box.width, bounding_box.height)
            .to_luma8();

        let quality = quality::score(image.width(), image.height(), &bounding_box, &crop);
        if quality < self.min_quality {
            return Err(FaceError::LowQuality { score: quality, minimum: self.min_quality });
        }

        let embedding = embed(&crop)?;
        debug!(
            "Extracted embedding (quality {:.1}, box {}x{})",
            quality, bounding_box.width, bounding_box.height
        );

        Ok(ExtractedFace {
            embedding,
            quality,
            bounding_box,
            captured_at: Utc::now(),
        })
    }
}

fn clamp_to_image(face: &BoundingBox, width: u32, height: u32) -> BoundingBox {
    let x = face.x.min(width.saturating_sub(1));
    let y = face.y.min(height.saturating_sub(1));
    BoundingBox {
        x,
        y,
        width: face.width.min(width - x).max(1),
        height: face.height.min(height - y).max(1),
    }
}

// Grid luminance embedding: resample the crop onto a fixed 16x8 grid, then
// mean-centre and L2-normalise the cell values into the 128-dim vector.
fn embed(crop: &image::GrayImage) -> Result<FaceEmbedding, FaceError> {
    let grid = DynamicImage::ImageLuma8(crop.clone())
        .resize_exact(GRID_WIDTH, GRID_HEIGHT, FilterType::Triangle)
        .to_luma8();

    let mut values: Vec<f32> = grid.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
    debug_assert_eq!(values.len(), EMBEDDING_DIM);

    let mean = values.iter().sum::<f32>() / values.len() as f32;
    for v in values.iter_mut() {
        *v -= mean;
    }

    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }

    FaceEmbedding::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::face::types::FaceDetection;
    use async_trait::async_trait;
    use std::io::Cursor;

    struct FixedDetector {
        detections: Vec<FaceDetection>,
    }

    #[async_trait]
    impl FaceDetector for FixedDetector {
        async fn detect(&self, _image: &DynamicImage) -> Result<Vec<FaceDetection>, FaceError> {
            Ok(self.detections.clone())
        }
    }

    fn face_at(x: u32, y: u32, width: u32, height: u32) -> FaceDetection {
        FaceDetection {
            bounding_box: BoundingBox { x, y, width, height },
            confidence: 0.9,
        }
    }

    fn test_image_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn extractor_with(detections: Vec<FaceDetection>, min_quality: f32) -> EmbeddingExtractor {
        EmbeddingExtractor::new(Arc::new(FixedDetector { detections }), min_quality)
    }

    #[tokio::test]
    async fn test_single_face_produces_fixed_length_embedding() {
        let extractor = extractor_with(vec![face_at(160, 90, 240, 300)], 0.0);
        let face = extractor.extract(&test_image_bytes(640, 480)).await.unwrap();
        assert_eq!(face.embedding.len(), EMBEDDING_DIM);
        assert!((0.0..=100.0).contains(&face.quality));
    }

    #[tokio::test]
    async fn test_embedding_is_deterministic() {
        let bytes = test_image_bytes(640, 480);
        let extractor = extractor_with(vec![face_at(160, 90, 240, 300)], 0.0);
        let a = extractor.extract(&bytes).await.unwrap();
        let b = extractor.extract(&bytes).await.unwrap();
        assert_eq!(a.embedding, b.embedding);
    }

    #[tokio::test]
    async fn test_zero_faces_rejected() {
        let extractor = extractor_with(vec![], 0.0);
        let result = extractor.extract(&test_image_bytes(640, 480)).await;
        assert!(matches!(result, Err(FaceError::NoFaceDetected)));
    }

    #[tokio::test]
    async fn test_two_faces_rejected() {
        let extractor = extractor_with(
            vec![face_at(40, 90, 120, 160), face_at(400, 90, 120, 160)],
            0.0,
        );
        let result = extractor.extract(&test_image_bytes(640, 480)).await;
        assert!(matches!(result, Err(FaceError::MultipleFacesDetected { count: 2 })));
    }

    #[tokio::test]
    async fn test_low_quality_capture_rejected() {
        // Tiny off-centre face cannot clear a high minimum.
        let extractor = extractor_with(vec![face_at(0, 0, 12, 16)], 95.0);
        let result = extractor.extract(&test_image_bytes(640, 480)).await;
        assert!(matches!(result, Err(FaceError::LowQuality { .. })));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_rejected() {
        let extractor = extractor_with(vec![face_at(0, 0, 10, 10)], 0.0);
        let result = extractor.extract(b"not an image").await;
        assert!(matches!(result, Err(FaceError::Decode(_))));
    }
}
