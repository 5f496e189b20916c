// src/core/face/detector.rs
use std::path::PathBuf;

use async_trait::async_trait;
use image::{imageops::FilterType, DynamicImage};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::error::FaceError;
use super::types::{BoundingBox, FaceDetection};

#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceDetection>, FaceError>;
}

#[derive(Debug, Deserialize)]
struct ModelManifest {
    version: String,
    input_size: u32,
    window: u32,
    stride: u32,
    score_threshold: f32,
    nms_overlap: f32,
    weights_file: String,
}

#[derive(Debug, Deserialize)]
struct WindowWeights {
    bias: f32,
    coefficients: Vec<f32>,
}

struct ModelBundle {
    manifest: ModelManifest,
    weights: WindowWeights,
}

impl ModelBundle {
    async fn load(model_dir: &PathBuf) -> Result<Self, FaceError> {
        let manifest_path = model_dir.join("manifest.json");
        let manifest_raw = tokio::fs::read(&manifest_path)
            .await
            .map_err(|e| FaceError::Model(format!("Failed to read {}: {}", manifest_path.display(), e)))?;
        let manifest: ModelManifest = serde_json::from_slice(&manifest_raw)
            .map_err(|e| FaceError::Model(format!("Invalid model manifest: {}", e)))?;

        let weights_path = model_dir.join(&manifest.weights_file);
        let weights_raw = tokio::fs::read(&weights_path)
            .await
            .map_err(|e| FaceError::Model(format!("Failed to read {}: {}", weights_path.display(), e)))?;
        let weights: WindowWeights = serde_json::from_slice(&weights_raw)
            .map_err(|e| FaceError::Model(format!("Invalid model weights: {}", e)))?;

        let expected = (manifest.window * manifest.window) as usize;
        if weights.coefficients.len() != expected {
            return Err(FaceError::Model(format!(
                "Weight count {} does not match window {}x{}",
                weights.coefficients.len(),
                manifest.window,
                manifest.window
            )));
        }
        if manifest.window == 0 || manifest.stride == 0 || manifest.input_size < manifest.window {
            return Err(FaceError::Model("Degenerate window geometry in manifest".into()));
        }

        info!(
            "Loaded detection model v{} ({} window, {} input)",
            manifest.version, manifest.window, manifest.input_size
        );
        Ok(Self { manifest, weights })
    }
}

/// Sliding-window face detector driven by model assets on disk.
///
/// The model files are read once on first use and cached for the process
/// lifetime; `initialize` forces the load up front so startup fails fast on a
/// missing or corrupt model directory.
pub struct ModelFaceDetector {
    model_dir: PathBuf,
    bundle: OnceCell<ModelBundle>,
}

impl ModelFaceDetector {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            bundle: OnceCell::new(),
        }
    }

    pub async fn initialize(&self) -> Result<(), FaceError> {
        self.bundle().await.map(|_| ())
    }

    async fn bundle(&self) -> Result<&ModelBundle, FaceError> {
        self.bundle
            .get_or_try_init(|| ModelBundle::load(&self.model_dir))
            .await
    }

    fn scan(&self, bundle: &ModelBundle, image: &DynamicImage) -> Vec<FaceDetection> {
        let manifest = &bundle.manifest;
        let (orig_width, orig_height) = (image.width(), image.height());

        let gray = image
            .resize_exact(manifest.input_size, manifest.input_size, FilterType::Triangle)
            .to_luma8();

        let window = manifest.window;
        let stride = manifest.stride;
        let mut candidates = Vec::new();

        let mut y = 0;
        while y + window <= manifest.input_size {
            let mut x = 0;
            while x + window <= manifest.input_size {
                if let Some(confidence) = self.score_window(bundle, &gray, x, y) {
                    if confidence >= manifest.score_threshold {
                        candidates.push(FaceDetection {
                            bounding_box: BoundingBox { x, y, width: window, height: window },
                            confidence,
                        });
                    }
                }
                x += stride;
            }
            y += stride;
        }

        let kept = non_max_suppression(candidates, manifest.nms_overlap);

        // Map boxes from model space back onto the original frame.
        let scale_x = orig_width as f32 / manifest.input_size as f32;
        let scale_y = orig_height as f32 / manifest.input_size as f32;
        kept.into_iter()
            .map(|d| FaceDetection {
                bounding_box: BoundingBox {
                    x: (d.bounding_box.x as f32 * scale_x) as u32,
                    y: (d.bounding_box.y as f32 * scale_y) as u32,
                    width: ((d.bounding_box.width as f32 * scale_x) as u32).max(1),
                    height: ((d.bounding_box.height as f32 * scale_y) as u32).max(1),
                },
                confidence: d.confidence,
            })
            .collect()
    }

    fn score_window(
        &self,
        bundle: &ModelBundle,
        gray: &image::GrayImage,
        x0: u32,
        y0: u32,
    ) -> Option<f32> {
        let window = bundle.manifest.window;
        let count = (window * window) as f32;

        let mut sum = 0.0f32;
        let mut sum_sq = 0.0f32;
        for y in 0..window {
            for x in 0..window {
                let v = gray.get_pixel(x0 + x, y0 + y).0[0] as f32 / 255.0;
                sum += v;
                sum_sq += v * v;
            }
        }
        let mean = sum / count;
        let variance = (sum_sq / count - mean * mean).max(0.0);
        let std_dev = variance.sqrt();
        if std_dev < 1e-4 {
            // Flat patch, nothing to classify.
            return None;
        }

        let mut activation = bundle.weights.bias;
        let mut i = 0;
        for y in 0..window {
            for x in 0..window {
                let v = gray.get_pixel(x0 + x, y0 + y).0[0] as f32 / 255.0;
                activation += bundle.weights.coefficients[i] * ((v - mean) / std_dev);
                i += 1;
            }
        }

        Some(1.0 / (1.0 + (-activation).exp()))
    }
}

fn non_max_suppression(mut candidates: Vec<FaceDetection>, max_overlap: f32) -> Vec<FaceDetection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<FaceDetection> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.bounding_box.overlap(&candidate.bounding_box) > max_overlap);
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

#[async_trait]
impl FaceDetector for ModelFaceDetector {
    async fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceDetection>, FaceError> {
        let bundle = self.bundle().await?;
        let detections = self.scan(bundle, image);
        debug!("Detector found {} candidate face(s)", detections.len());
        Ok(detections)
    }
}
