// src/core/face/quality.rs
//
// Heuristic capture-quality estimate. This is a proxy for "usable for
// enrollment/matching", not a calibrated biometric quality metric.
use image::GrayImage;

use super::types::BoundingBox;

const AREA_WEIGHT: f32 = 0.3;
const CENTER_WEIGHT: f32 = 0.2;
const ASPECT_WEIGHT: f32 = 0.2;
const SYMMETRY_WEIGHT: f32 = 0.3;

// A frontal face bounding box is taller than wide.
const IDEAL_ASPECT: f32 = 0.75;

// A face filling a quarter of the frame or more gets the full area score.
const FULL_AREA_RATIO: f32 = 0.25;

pub fn score(image_width: u32, image_height: u32, face: &BoundingBox, crop: &GrayImage) -> f32 {
    let area = area_score(image_width, image_height, face);
    let center = centeredness_score(image_width, image_height, face);
    let aspect = aspect_score(face);
    let symmetry = symmetry_score(crop);

    let combined = AREA_WEIGHT * area
        + CENTER_WEIGHT * center
        + ASPECT_WEIGHT * aspect
        + SYMMETRY_WEIGHT * symmetry;

    (combined * 100.0).clamp(0.0, 100.0)
}

fn area_score(image_width: u32, image_height: u32, face: &BoundingBox) -> f32 {
    let image_area = image_width as f32 * image_height as f32;
    if image_area == 0.0 {
        return 0.0;
    }
    let ratio = face.area() as f32 / image_area;
    (ratio / FULL_AREA_RATIO).min(1.0)
}

fn centeredness_score(image_width: u32, image_height: u32, face: &BoundingBox) -> f32 {
    let (cx, cy) = face.center();
    let dx = cx - image_width as f32 / 2.0;
    let dy = cy - image_height as f32 / 2.0;
    let distance = (dx * dx + dy * dy).sqrt();

    let half_diagonal = ((image_width as f32).powi(2) + (image_height as f32).powi(2)).sqrt() / 2.0;
    if half_diagonal == 0.0 {
        return 0.0;
    }
    (1.0 - distance / half_diagonal).max(0.0)
}

fn aspect_score(face: &BoundingBox) -> f32 {
    let deviation = (face.aspect_ratio() - IDEAL_ASPECT).abs() / IDEAL_ASPECT;
    (1.0 - deviation).max(0.0)
}

// Left/right luminance symmetry of the crop, 1.0 for a perfect mirror.
fn symmetry_score(crop: &GrayImage) -> f32 {
    let (width, height) = crop.dimensions();
    if width < 2 || height == 0 {
        return 0.0;
    }

    let half = width / 2;
    let mut total_diff = 0.0f32;
    let mut samples = 0u32;

    for y in 0..height {
        for x in 0..half {
            let left = crop.get_pixel(x, y).0[0] as f32;
            let right = crop.get_pixel(width - 1 - x, y).0[0] as f32;
            total_diff += (left - right).abs();
            samples += 1;
        }
    }

    if samples == 0 {
        return 0.0;
    }
    1.0 - (total_diff / samples as f32) / 255.0
}
