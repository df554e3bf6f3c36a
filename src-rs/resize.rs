//! Box Resize stage: scales a cropped region for generation and records
//! the transform so reinsert can undo it.

use tracing::info;

use crate::error::{Error, Result};
use crate::metadata::ResizeRecord;
use crate::tensor::ImageTensor;

/// Requested output size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeTarget {
    Exact { width: u32, height: u32 },
    Scale(f64),
}

impl ResizeTarget {
    /// Output dimensions for a `width`x`height` source.
    pub fn dimensions(self, width: usize, height: usize) -> Result<(usize, usize)> {
        match self {
            Self::Exact { width: 0, .. } | Self::Exact { height: 0, .. } => {
                Err(Error::InvalidParameter {
                    name: "size".to_string(),
                    reason: "target width and height must be positive".to_string(),
                })
            }
            Self::Exact { width, height } => Ok((width as usize, height as usize)),
            Self::Scale(scale) if !scale.is_finite() || scale <= 0.0 => {
                Err(Error::InvalidParameter {
                    name: "scale".to_string(),
                    reason: format!("expected a positive factor, got {scale}"),
                })
            }
            Self::Scale(scale) => Ok((scaled_extent(width, scale), scaled_extent(height, scale))),
        }
    }
}

fn scaled_extent(extent: usize, scale: f64) -> usize {
    ((extent as f64 * scale).round() as usize).max(1)
}

/// Resamples batch 0 of `image` to `target` and describes the change.
pub fn resize(image: &ImageTensor, target: ResizeTarget) -> Result<(ImageTensor, ResizeRecord)> {
    let (source_w, source_h) = (image.width(), image.height());
    let (width, height) = target.dimensions(source_w, source_h)?;
    let resized = image.resize_exact(width, height)?;

    let record = ResizeRecord {
        scale_x: Some(width as f64 / source_w as f64),
        scale_y: Some(height as f64 / source_h as f64),
        original_width: Some(source_w as u32),
        original_height: Some(source_h as u32),
        width: Some(width as u32),
        height: Some(height as u32),
        ..ResizeRecord::default()
    };
    info!("resized region {source_w}x{source_h} -> {width}x{height}");
    Ok((resized, record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::{crop, FallbackMode};
    use crate::reinsert::reinsert;
    use ndarray::Array4;

    fn solid(height: usize, width: usize, value: f32) -> ImageTensor {
        ImageTensor::new(Array4::from_elem((1, height, width, 3), value)).unwrap()
    }

    #[test]
    fn exact_target_records_scales() {
        let (out, record) = resize(
            &solid(100, 100, 0.2),
            ResizeTarget::Exact {
                width: 64,
                height: 64,
            },
        )
        .unwrap();
        assert_eq!(out.shape(), [1, 64, 64, 3]);
        assert_eq!(record.scale_x, Some(0.64));
        assert_eq!(record.scale_y, Some(0.64));
        assert_eq!(record.original_width, Some(100));
        assert_eq!(record.height, Some(64));
    }

    #[test]
    fn scale_target_rounds_and_keeps_one_pixel() {
        assert_eq!(ResizeTarget::Scale(2.0).dimensions(30, 11).unwrap(), (60, 22));
        assert_eq!(ResizeTarget::Scale(0.5).dimensions(5, 3).unwrap(), (3, 2));
        assert_eq!(ResizeTarget::Scale(0.001).dimensions(5, 3).unwrap(), (1, 1));
    }

    #[test]
    fn rejects_degenerate_targets() {
        assert!(ResizeTarget::Scale(0.0).dimensions(5, 5).is_err());
        assert!(ResizeTarget::Scale(f64::NAN).dimensions(5, 5).is_err());
        assert!(ResizeTarget::Exact {
            width: 0,
            height: 4
        }
        .dimensions(5, 5)
        .is_err());
    }

    #[test]
    fn record_drives_reinsert_back_to_crop_size() {
        let original = solid(50, 50, 0.0);
        let region = r#"{"x1":10,"y1":10,"x2":30,"y2":40}"#;
        let cropped = crop(&original, region, FallbackMode::Error).unwrap();
        let (resized, record) = resize(&cropped, ResizeTarget::Scale(3.0)).unwrap();
        assert_eq!(resized.shape(), [1, 90, 60, 3]);

        let generated = solid(resized.height(), resized.width(), 1.0);
        let out = reinsert(
            &original,
            &generated,
            region,
            &record.to_json_string().unwrap(),
        )
        .unwrap();
        let painted = out
            .as_array()
            .iter()
            .filter(|&&v| (v - 1.0).abs() < 1e-3)
            .count();
        assert_eq!(painted, 20 * 30 * 3);
    }
}
