//! Dense `(batch, height, width, channel)` image tensors.
//!
//! Values are `f32` normalized to `[0, 1]`. Only batch index 0 is ever
//! composited; stages that produce a new frame return a batch of one.

use image::imageops::FilterType;
use image::{DynamicImage, Rgb32FImage, Rgba32FImage};
use ndarray::{s, Array3, Array4, ArrayView3, Axis};

use crate::error::{Error, Result};
use crate::geometry::PixelRect;

/// Channel depth of an image tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn from_channels(channels: usize) -> Result<Self> {
        match channels {
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            other => Err(Error::UnsupportedChannels(other)),
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

/// Converts a `(height, width, channel)` frame to `target`.
///
/// RGB gains a fully opaque alpha channel, RGBA loses its alpha channel.
pub fn reconcile_channels(frame: Array3<f32>, target: ChannelLayout) -> Result<Array3<f32>> {
    let (height, width, channels) = frame.dim();
    let source = ChannelLayout::from_channels(channels)?;

    let out = match (source, target) {
        (ChannelLayout::Rgb, ChannelLayout::Rgba) => {
            let mut out = Array3::<f32>::ones((height, width, 4));
            out.slice_mut(s![.., .., 0..3]).assign(&frame);
            out
        }
        (ChannelLayout::Rgba, ChannelLayout::Rgb) => frame.slice(s![.., .., 0..3]).to_owned(),
        _ => frame,
    };
    Ok(out)
}

/// Image tensor of shape `(batch, height, width, channel)` with 3 or 4 channels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Array4<f32>,
}

impl ImageTensor {
    pub fn new(data: Array4<f32>) -> Result<Self> {
        let shape = data.shape().to_vec();
        if shape[0] == 0 {
            return Err(Error::InvalidShape {
                shape,
                reason: "batch dimension must hold at least one image".to_string(),
            });
        }
        ChannelLayout::from_channels(shape[3])?;
        Ok(Self { data })
    }

    /// Wraps a single `(height, width, channel)` frame as a batch of one.
    pub fn from_frame(frame: Array3<f32>) -> Result<Self> {
        Self::new(frame.insert_axis(Axis(0)))
    }

    /// All-zero tensor with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self {
            data: Array4::zeros(self.data.raw_dim()),
        }
    }

    pub fn batch(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn height(&self) -> usize {
        self.data.shape()[1]
    }

    pub fn width(&self) -> usize {
        self.data.shape()[2]
    }

    pub fn channels(&self) -> usize {
        self.data.shape()[3]
    }

    pub fn layout(&self) -> ChannelLayout {
        // Channel count is validated at construction.
        if self.channels() == 4 {
            ChannelLayout::Rgba
        } else {
            ChannelLayout::Rgb
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        [self.batch(), self.height(), self.width(), self.channels()]
    }

    pub fn as_array(&self) -> &Array4<f32> {
        &self.data
    }

    /// Batch index 0 as a `(height, width, channel)` view.
    pub fn frame(&self) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), 0)
    }

    /// Sub-tensor `[:, y_start..y_end, x_start..x_end, :]`, every batch kept.
    ///
    /// `rect` must already be clamped to the tensor's bounds.
    pub fn slice_rect(&self, rect: &PixelRect) -> Self {
        let (x0, x1) = (rect.x_start as usize, rect.x_end as usize);
        let (y0, y1) = (rect.y_start as usize, rect.y_end as usize);
        Self {
            data: self.data.slice(s![.., y0..y1, x0..x1, ..]).to_owned(),
        }
    }

    /// Loads a decoded image, keeping alpha only when the source has it.
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        let (width, height) = (img.width() as usize, img.height() as usize);
        let (raw, channels) = if img.color().has_alpha() {
            (img.to_rgba32f().into_raw(), 4)
        } else {
            (img.to_rgb32f().into_raw(), 3)
        };
        let frame = Array3::from_shape_vec((height, width, channels), raw).map_err(|err| {
            Error::InvalidShape {
                shape: vec![height, width, channels],
                reason: err.to_string(),
            }
        })?;
        Self::from_frame(frame)
    }

    /// Batch index 0 as a float image.
    pub fn to_dynamic(&self) -> Result<DynamicImage> {
        frame_to_dynamic(self.frame())
    }

    /// Resamples batch index 0 to exactly `width`x`height` with a Lanczos3
    /// filter. Values are clamped back into `[0, 1]`.
    pub fn resize_exact(&self, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidParameter {
                name: "size".to_string(),
                reason: format!("cannot resample to {width}x{height}"),
            });
        }
        if self.width() == 0 || self.height() == 0 {
            return Err(Error::InvalidParameter {
                name: "image".to_string(),
                reason: format!("cannot resample empty {}x{} image", self.width(), self.height()),
            });
        }

        let layout = self.layout();
        let resized = self
            .to_dynamic()?
            .resize_exact(width as u32, height as u32, FilterType::Lanczos3);
        let raw: Vec<f32> = match layout {
            ChannelLayout::Rgba => resized.into_rgba32f().into_raw(),
            ChannelLayout::Rgb => resized.into_rgb32f().into_raw(),
        };
        let frame = Array3::from_shape_vec((height, width, layout.channels()), raw)
            .map_err(|err| Error::InvalidShape {
                shape: vec![height, width, layout.channels()],
                reason: err.to_string(),
            })?
            .mapv(|v| v.clamp(0.0, 1.0));
        Self::from_frame(frame)
    }
}

fn frame_to_dynamic(frame: ArrayView3<'_, f32>) -> Result<DynamicImage> {
    let (height, width, channels) = frame.dim();
    let raw: Vec<f32> = frame.iter().copied().collect();
    let invalid = || Error::InvalidShape {
        shape: vec![height, width, channels],
        reason: "frame does not fit an image buffer".to_string(),
    };

    match ChannelLayout::from_channels(channels)? {
        ChannelLayout::Rgba => Rgba32FImage::from_raw(width as u32, height as u32, raw)
            .map(DynamicImage::ImageRgba32F)
            .ok_or_else(invalid),
        ChannelLayout::Rgb => Rgb32FImage::from_raw(width as u32, height as u32, raw)
            .map(DynamicImage::ImageRgb32F)
            .ok_or_else(invalid),
    }
}
