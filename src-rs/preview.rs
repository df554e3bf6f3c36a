//! Preview downscaling for the interactive selector.
//!
//! Large sources are shrunk to a bounded preview; the selector then reports
//! coordinates together with `displayScaleFactor` and the crop/reinsert
//! stages map them back to source pixels.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::GenericImageView;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::io::ensure_parent_dir;

/// Longest preview side used when nothing else is configured.
pub const DEFAULT_PREVIEW_MAX: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewScale {
    pub scaled: bool,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

/// Writes a downscaled copy of `source` into `temp_dir` when either side
/// exceeds `max_size`; otherwise points back at `source`.
pub fn scale_for_preview(source: &Path, max_size: u32, temp_dir: &Path) -> Result<PreviewScale> {
    if max_size == 0 {
        return Err(Error::InvalidParameter {
            name: "max_size".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if !source.exists() {
        return Err(Error::SourceNotFound(source.to_path_buf()));
    }

    let img = image::open(source).map_err(|source_err| Error::ImageLoad {
        path: source.to_path_buf(),
        source: source_err,
    })?;
    let (w, h) = img.dimensions();
    if w <= max_size && h <= max_size {
        return Ok(PreviewScale {
            scaled: false,
            path: source.to_path_buf(),
            scale: None,
        });
    }

    let scale = (f64::from(max_size) / f64::from(w)).min(f64::from(max_size) / f64::from(h));
    let new_w = ((f64::from(w) * scale) as u32).max(1);
    let new_h = ((f64::from(h) * scale) as u32).max(1);
    let resized = img.resize_exact(new_w, new_h, FilterType::Lanczos3);

    let out = temp_dir.join(format!("scaled_{}", preview_file_name(source)));
    ensure_parent_dir(&out)?;
    resized.save(&out).map_err(|source_err| Error::ImageSave {
        path: out.clone(),
        source: source_err,
    })?;
    info!("preview scaled {w}x{h} -> {new_w}x{new_h}");

    Ok(PreviewScale {
        scaled: true,
        path: out,
        scale: Some(scale),
    })
}

fn preview_file_name(source: &Path) -> String {
    let raw = source
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("preview.png");
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};
    use tempfile::tempdir;

    fn write_png(path: &Path, w: u32, h: u32) {
        DynamicImage::ImageRgb8(RgbImage::new(w, h)).save(path).unwrap();
    }

    #[test]
    fn small_image_is_not_scaled() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("small.png");
        write_png(&src, 40, 30);

        let out = scale_for_preview(&src, 64, &dir.path().join("tmp")).unwrap();
        assert!(!out.scaled);
        assert_eq!(out.path, src);
        assert_eq!(out.scale, None);
    }

    #[test]
    fn large_image_is_bounded() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("wide shot.png");
        write_png(&src, 200, 50);

        let out = scale_for_preview(&src, 100, &dir.path().join("tmp")).unwrap();
        assert!(out.scaled);
        assert_eq!(out.scale, Some(0.5));
        assert_eq!(
            out.path.file_name().and_then(|s| s.to_str()),
            Some("scaled_wide_shot.png")
        );
        assert_eq!(image::image_dimensions(&out.path).unwrap(), (100, 25));
    }

    #[test]
    fn missing_source_is_reported() {
        let dir = tempdir().unwrap();
        let err = scale_for_preview(&dir.path().join("nope.png"), 64, dir.path()).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
    }

    #[test]
    fn serializes_without_scale_when_unscaled() {
        let payload = serde_json::to_value(PreviewScale {
            scaled: false,
            path: PathBuf::from("a.png"),
            scale: None,
        })
        .unwrap();
        assert_eq!(payload, serde_json::json!({"scaled": false, "path": "a.png"}));
    }
}
