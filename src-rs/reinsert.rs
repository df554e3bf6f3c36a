//! Box Reinsert stage: puts a generated image back into the original at
//! the rectangle it was cropped from, undoing an intermediate resize.

use ndarray::{s, Array3, ArrayView3};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::geometry::PixelRect;
use crate::metadata::{RegionMetadata, ResizeRecord};
use crate::tensor::{reconcile_channels, ImageTensor};

/// Composites `generated` into a copy of `original` (batch 0).
///
/// A malformed `box_metadata` returns `original` unchanged. A malformed
/// `resize_metadata` is treated as "no resize happened". Without a resize
/// record the generated image is pasted at its own size; anything falling
/// outside the original is clipped. The result always has a batch of one and
/// the original's channel layout.
pub fn reinsert(
    original: &ImageTensor,
    generated: &ImageTensor,
    box_metadata: &str,
    resize_metadata: &str,
) -> Result<ImageTensor> {
    let meta = match RegionMetadata::parse(box_metadata) {
        Ok(meta) => meta,
        Err(err) => {
            warn!("invalid box metadata, returning original: {err}");
            return Ok(original.clone());
        }
    };

    let resize = ResizeRecord::parse(resize_metadata).unwrap_or_else(|err| {
        warn!("invalid resize metadata, bypassing resize: {err}");
        None
    });

    let rect = meta
        .corners_or_zero()
        .compensate(meta.display_scale_factor())
        .normalize();
    let (crop_width, crop_height) = (rect.width(), rect.height());
    debug!(
        generated_width = generated.width(),
        generated_height = generated.height(),
        crop_width,
        crop_height,
        use_resize = resize.is_some(),
        "reinserting generated image"
    );

    let mut canvas = original.frame().to_owned();

    let patch = match resize {
        Some(record) => {
            if crop_width <= 0 || crop_height <= 0 {
                warn!(?rect, "region has zero area, nothing to reinsert");
                return ImageTensor::from_frame(canvas);
            }
            if generated.width() == 0 || generated.height() == 0 {
                warn!("generated image is empty, nothing to reinsert");
                return ImageTensor::from_frame(canvas);
            }
            if crop_width > i64::from(u32::MAX) || crop_height > i64::from(u32::MAX) {
                warn!(?rect, "region is too large to resample into, nothing to reinsert");
                return ImageTensor::from_frame(canvas);
            }
            debug!(?record, "undoing resize");
            let resized = generated.resize_exact(crop_width as usize, crop_height as usize)?;
            info!(
                "resized generated image from {}x{} to {}x{}",
                generated.width(),
                generated.height(),
                resized.width(),
                resized.height()
            );
            resized
        }
        None => {
            if generated.width() as i64 != crop_width || generated.height() as i64 != crop_height {
                warn!(
                    "generated image is {}x{} but region is {}x{}, pasting at generated size",
                    generated.width(),
                    generated.height(),
                    crop_width,
                    crop_height
                );
            }
            generated.clone()
        }
    };

    let patch = reconcile_channels(patch.frame().to_owned(), original.layout())?;
    match paste(&mut canvas, patch.view(), rect.x_start, rect.y_start) {
        Some(area) => info!(
            "reinserted generated image at ({}, {}), {}x{} pixels written",
            rect.x_start,
            rect.y_start,
            area.width(),
            area.height()
        ),
        None => warn!(?rect, "generated image lies entirely outside the original"),
    }

    ImageTensor::from_frame(canvas)
}

/// Overwrites `canvas` with `patch` placed at `(x, y)`, clipping to the
/// canvas bounds. Returns the written area in canvas coordinates, or `None`
/// when nothing overlaps.
fn paste(canvas: &mut Array3<f32>, patch: ArrayView3<'_, f32>, x: i64, y: i64) -> Option<PixelRect> {
    let (canvas_h, canvas_w, _) = canvas.dim();
    let (patch_h, patch_w, _) = patch.dim();

    let area = PixelRect {
        x_start: x.max(0),
        y_start: y.max(0),
        x_end: x.saturating_add(patch_w as i64).min(canvas_w as i64),
        y_end: y.saturating_add(patch_h as i64).min(canvas_h as i64),
    };
    if area.is_empty() {
        return None;
    }

    let (dx0, dx1) = (area.x_start as usize, area.x_end as usize);
    let (dy0, dy1) = (area.y_start as usize, area.y_end as usize);
    let (sx0, sy0) = ((area.x_start - x) as usize, (area.y_start - y) as usize);
    let (sx1, sy1) = (sx0 + (dx1 - dx0), sy0 + (dy1 - dy0));

    canvas
        .slice_mut(s![dy0..dy1, dx0..dx1, ..])
        .assign(&patch.slice(s![sy0..sy1, sx0..sx1, ..]));
    Some(area)
}
