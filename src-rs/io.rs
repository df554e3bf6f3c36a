//! File plumbing: image files to tensors and back, metadata arguments and
//! JSON sidecars.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::tensor::{ChannelLayout, ImageTensor};

/// Loads an image file as a `(1, H, W, C)` tensor in `[0, 1]`.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ImageTensor> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    ImageTensor::from_dynamic(&img)
}

/// Saves batch 0 of `tensor` as 8-bit, format inferred from the extension.
///
/// JPEG has no alpha channel, so RGBA tensors lose alpha there.
pub fn save_image<P: AsRef<Path>>(tensor: &ImageTensor, path: P) -> Result<()> {
    let path = path.as_ref();
    ensure_parent_dir(path)?;

    let float = tensor.to_dynamic()?;
    let is_jpeg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "jpg" | "jpeg"))
        .unwrap_or(false);
    let out = match tensor.layout() {
        ChannelLayout::Rgba if !is_jpeg => DynamicImage::ImageRgba8(float.to_rgba8()),
        _ => DynamicImage::ImageRgb8(float.to_rgb8()),
    };

    out.save(path).map_err(|source| Error::ImageSave {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves a metadata argument.
///
/// `-` reads stdin; an empty string, or anything that looks like inline
/// JSON, is used as-is; otherwise the argument names a file.
pub fn read_document(arg: &str) -> Result<String> {
    let trimmed = arg.trim();
    if trimmed == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    if trimmed.is_empty() || trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(arg.to_string());
    }

    let path = Path::new(trimmed);
    if !path.exists() {
        return Err(Error::SourceNotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

pub fn write_json_pretty(path: &Path, value: &Value) -> Result<()> {
    ensure_parent_dir(path)?;
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw)?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// `<dir>/<stem>.json` next to `path`.
pub fn default_sidecar_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.json"))
}
