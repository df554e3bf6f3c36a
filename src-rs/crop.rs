//! Region Crop stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::metadata::RegionMetadata;
use crate::tensor::ImageTensor;

/// What to return when no valid region is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Pass the input image through unchanged.
    #[default]
    UseFullImage,
    /// Return an all-zero image with the input's shape.
    ReturnZero,
    /// Fail with [`Error::MissingRegion`] or [`Error::EmptyRegion`].
    Error,
}

impl FallbackMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UseFullImage => "use_full_image",
            Self::ReturnZero => "return_zero",
            Self::Error => "error",
        }
    }

    fn apply(self, image: &ImageTensor, err: Error) -> Result<ImageTensor> {
        match self {
            Self::UseFullImage => {
                info!("{err}, using full image");
                Ok(image.clone())
            }
            Self::ReturnZero => {
                info!("{err}, returning zero image");
                Ok(image.zeros_like())
            }
            Self::Error => Err(err),
        }
    }
}

impl fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FallbackMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "use_full_image" => Ok(Self::UseFullImage),
            "return_zero" => Ok(Self::ReturnZero),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidParameter {
                name: "fallback_mode".to_string(),
                reason: format!("unknown mode {other:?}"),
            }),
        }
    }
}

/// Crops `image` to the rectangle described by `region_metadata`.
///
/// Unparseable metadata counts as "no region". Missing corners, and a window
/// that cannot be placed inside the image, are resolved through `fallback`.
/// Every batch entry is cropped with the same window.
pub fn crop(image: &ImageTensor, region_metadata: &str, fallback: FallbackMode) -> Result<ImageTensor> {
    let meta = RegionMetadata::parse(region_metadata).unwrap_or_else(|err| {
        debug!("region metadata unreadable, treating as empty: {err}");
        RegionMetadata::default()
    });

    let Some(corners) = meta.corners() else {
        return fallback.apply(image, Error::MissingRegion);
    };

    let rect = corners.compensate(meta.display_scale_factor()).normalize();
    let Some(window) = rect.clamp_to(image.width(), image.height()) else {
        warn!(?rect, "region has no overlap with image");
        return fallback.apply(
            image,
            Error::EmptyRegion {
                width: image.width(),
                height: image.height(),
            },
        );
    };

    debug!(?rect, ?window, "cropping region");
    Ok(image.slice_rect(&window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array4};

    fn gradient(batch: usize, height: usize, width: usize) -> ImageTensor {
        let data = Array4::from_shape_fn((batch, height, width, 3), |(b, y, x, c)| {
            (b * 1000 + y * 100 + x * 3 + c) as f32 / 10_000.0
        });
        ImageTensor::new(data).unwrap()
    }

    #[test]
    fn crops_requested_window() {
        let image = gradient(1, 40, 60);
        let out = crop(&image, r#"{"x1":10,"y1":5,"x2":30,"y2":25}"#, FallbackMode::Error).unwrap();
        assert_eq!(out.shape(), [1, 20, 20, 3]);
        let expected = image.as_array().slice(s![.., 5..25, 10..30, ..]);
        assert_eq!(out.as_array().view(), expected);
    }

    #[test]
    fn full_bounds_region_is_identity() {
        let image = gradient(2, 12, 17);
        let out = crop(&image, r#"{"x1":0,"y1":0,"x2":17,"y2":12}"#, FallbackMode::Error).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn reversed_corners_crop_same_window() {
        let image = gradient(1, 30, 30);
        let a = crop(&image, r#"{"x1":5,"y1":6,"x2":20,"y2":22}"#, FallbackMode::Error).unwrap();
        let b = crop(&image, r#"{"x1":20,"y1":22,"x2":5,"y2":6}"#, FallbackMode::Error).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn display_scale_factor_is_compensated() {
        let image = gradient(1, 200, 200);
        let meta = r#"{"x1":100,"y1":100,"x2":300,"y2":300,"displayScaleFactor":2.0}"#;
        let out = crop(&image, meta, FallbackMode::Error).unwrap();
        assert_eq!(out.shape(), [1, 100, 100, 3]);
        let expected = image.as_array().slice(s![.., 50..150, 50..150, ..]);
        assert_eq!(out.as_array().view(), expected);
    }

    #[test]
    fn malformed_metadata_uses_full_image_by_default() {
        let image = gradient(1, 8, 8);
        let out = crop(&image, "{not json", FallbackMode::default()).unwrap();
        assert_eq!(out, image);
    }

    #[test]
    fn missing_corner_applies_each_fallback() {
        let image = gradient(1, 8, 8);
        let meta = r#"{"x1":1,"y1":1,"x2":4}"#;

        assert_eq!(crop(&image, meta, FallbackMode::UseFullImage).unwrap(), image);

        let zero = crop(&image, meta, FallbackMode::ReturnZero).unwrap();
        assert_eq!(zero.shape(), image.shape());
        assert!(zero.as_array().iter().all(|&v| v == 0.0));

        let err = crop(&image, meta, FallbackMode::Error).unwrap_err();
        assert!(matches!(err, Error::MissingRegion));
    }

    #[test]
    fn empty_object_is_missing_region() {
        let image = gradient(1, 4, 4);
        assert!(matches!(
            crop(&image, "{}", FallbackMode::Error),
            Err(Error::MissingRegion)
        ));
    }

    #[test]
    fn region_outside_image_yields_one_pixel() {
        let image = gradient(1, 10, 10);
        let out = crop(&image, r#"{"x1":50,"y1":50,"x2":80,"y2":90}"#, FallbackMode::Error).unwrap();
        assert_eq!(out.shape(), [1, 1, 1, 3]);
        assert_eq!(out.as_array()[[0, 0, 0, 0]], image.as_array()[[0, 9, 9, 0]]);
    }

    #[test]
    fn negative_and_zero_area_regions_do_not_fail() {
        let image = gradient(1, 10, 10);
        let out = crop(&image, r#"{"x1":-5,"y1":-5,"x2":-1,"y2":-1}"#, FallbackMode::Error).unwrap();
        assert_eq!(out.shape(), [1, 1, 1, 3]);

        let out = crop(&image, r#"{"x1":3,"y1":3,"x2":3,"y2":3}"#, FallbackMode::Error).unwrap();
        assert_eq!(out.shape(), [1, 1, 1, 3]);
    }

    #[test]
    fn empty_image_applies_fallback() {
        let image = ImageTensor::new(Array4::zeros((1, 0, 5, 3))).unwrap();
        let meta = r#"{"x1":0,"y1":0,"x2":2,"y2":2}"#;
        assert!(matches!(
            crop(&image, meta, FallbackMode::Error),
            Err(Error::EmptyRegion { width: 5, height: 0 })
        ));
        assert_eq!(crop(&image, meta, FallbackMode::UseFullImage).unwrap(), image);
        let zero = crop(&image, meta, FallbackMode::ReturnZero).unwrap();
        assert_eq!(zero.shape(), [1, 0, 5, 3]);
    }

    #[test]
    fn fallback_mode_parses_names() {
        assert_eq!("return_zero".parse::<FallbackMode>().unwrap(), FallbackMode::ReturnZero);
        assert_eq!(FallbackMode::UseFullImage.to_string(), "use_full_image");
        assert!("nope".parse::<FallbackMode>().is_err());
    }
}
