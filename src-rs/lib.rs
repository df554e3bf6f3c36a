//! Region select / crop / reinsert stages for generation workflows.
//!
//! A region is picked on a (possibly downscaled) preview, cropped out of the
//! source image, optionally resized for generation, and the generated result
//! is pasted back at the original location:
//!
//! ```text
//! RegionSelector -> crop -> resize -> [generation] -> reinsert
//! ```
//!
//! Stages exchange images as [`ImageTensor`]s and regions as JSON documents.

pub mod config;
pub mod crop;
pub mod error;
pub mod geometry;
pub mod io;
pub mod metadata;
pub mod preview;
pub mod reinsert;
pub mod resize;
pub mod selector;
pub mod tensor;

pub use config::Config;
pub use crop::{crop, FallbackMode};
pub use error::{Error, Result};
pub use geometry::{Corners, PixelRect};
pub use metadata::{RegionMetadata, ResizeRecord};
pub use preview::{scale_for_preview, PreviewScale};
pub use reinsert::reinsert;
pub use resize::{resize, ResizeTarget};
pub use selector::RegionSelector;
pub use tensor::{ChannelLayout, ImageTensor};
