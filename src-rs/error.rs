//! Error types for region-box.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the region pipeline stages.
///
/// Metadata parse failures are not represented here: every stage recovers
/// from them locally and logs instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The region document carries no usable `x1/x2/y1/y2` corners.
    #[error("no region coordinates provided in metadata")]
    MissingRegion,

    /// The clamped region has no overlap with the image.
    #[error("invalid region coordinates: no overlap with {width}x{height} image")]
    EmptyRegion { width: usize, height: usize },

    /// Only RGB and RGBA tensors are supported.
    #[error("unsupported channel count {0}, expected 3 or 4")]
    UnsupportedChannels(usize),

    /// Tensor shape does not describe a `(batch, height, width, channel)` image.
    #[error("invalid image shape {shape:?}: {reason}")]
    InvalidShape { shape: Vec<usize>, reason: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A referenced source file does not exist.
    #[error("file not found: {0}")]
    SourceNotFound(PathBuf),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for region-box operations.
pub type Result<T> = std::result::Result<T, Error>;
