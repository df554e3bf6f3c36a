//! Region Selector stage.
//!
//! Holds the last confirmed region document for one node instance and
//! replays it whenever an invocation arrives without a new selection.

use image::{Rgba, RgbaImage};
use tracing::{debug, info};

use crate::error::Result;
use crate::metadata::{is_blank_document, BorderPosition, RegionMetadata};
use crate::tensor::ImageTensor;

/// Outline color used by [`RegionSelector::render_overlay`].
pub const OVERLAY_COLOR: Rgba<u8> = Rgba([255, 59, 48, 255]);

#[derive(Debug, Clone)]
pub struct RegionSelector {
    last_metadata: String,
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionSelector {
    pub fn new() -> Self {
        Self {
            last_metadata: RegionMetadata::unselected().to_json_string(),
        }
    }

    /// Adopts `incoming` unless it is blank or the `{}` sentinel, then
    /// returns the image untouched together with the stored document.
    ///
    /// The document is stored verbatim; coordinate sanity is left to the
    /// consuming stages.
    pub fn update(&mut self, image: ImageTensor, incoming: &str) -> (ImageTensor, String) {
        if is_blank_document(incoming) {
            debug!("no new selection, replaying stored region");
        } else {
            info!("stored new region selection");
            self.last_metadata = incoming.to_string();
        }
        (image, self.last_metadata.clone())
    }

    pub fn last_metadata(&self) -> &str {
        &self.last_metadata
    }

    /// Draws the stored region onto an RGBA copy of `image` (batch 0).
    ///
    /// Returns `None` when the stored document is unselected or has no
    /// drawable region.
    pub fn render_overlay(&self, image: &ImageTensor) -> Result<Option<RgbaImage>> {
        let meta = match RegionMetadata::parse(&self.last_metadata) {
            Ok(meta) => meta,
            Err(err) => {
                debug!("stored region is not a JSON object: {err}");
                return Ok(None);
            }
        };
        if !meta.is_selected() {
            return Ok(None);
        }
        let rect = match meta.corners() {
            Some(corners) => corners
                .compensate(meta.display_scale_factor())
                .normalize()
                .clamp_to(image.width(), image.height()),
            None => None,
        };
        let Some(rect) = rect else {
            return Ok(None);
        };

        let mut canvas = image.to_dynamic()?.to_rgba8();
        let extent = canvas.width().max(canvas.height());
        let thickness = meta.border_width().clamp(1, extent.max(1));
        draw_rect_outline(
            &mut canvas,
            rect.x_start as u32,
            rect.y_start as u32,
            rect.width() as u32,
            rect.height() as u32,
            OVERLAY_COLOR,
            thickness,
            meta.border_position(),
        );
        Ok(Some(canvas))
    }
}

/// Outlines `w`x`h` at `(x, y)`; `Inside` grows the border inward from the
/// rectangle edge, `Outside` grows it outward. Clipped to the canvas.
#[allow(clippy::too_many_arguments)]
fn draw_rect_outline(
    img: &mut RgbaImage,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    color: Rgba<u8>,
    thickness: u32,
    position: BorderPosition,
) {
    if w == 0 || h == 0 || img.width() == 0 || img.height() == 0 {
        return;
    }
    let max_x = img.width() - 1;
    let max_y = img.height() - 1;

    let x0 = x.min(max_x);
    let y0 = y.min(max_y);
    let x1 = (x + w - 1).min(max_x);
    let y1 = (y + h - 1).min(max_y);

    for t in 0..thickness {
        let (tx0, ty0, tx1, ty1) = match position {
            BorderPosition::Outside => (
                x0.saturating_sub(t),
                y0.saturating_sub(t),
                (x1 + t).min(max_x),
                (y1 + t).min(max_y),
            ),
            BorderPosition::Inside => {
                if x0 + t > x1.saturating_sub(t) || y0 + t > y1.saturating_sub(t) {
                    break;
                }
                (x0 + t, y0 + t, x1 - t, y1 - t)
            }
        };

        for xx in tx0..=tx1 {
            img.put_pixel(xx, ty0, color);
            img.put_pixel(xx, ty1, color);
        }
        for yy in ty0..=ty1 {
            img.put_pixel(tx0, yy, color);
            img.put_pixel(tx1, yy, color);
        }
    }
}
