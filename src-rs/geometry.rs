//! Region coordinate pipeline: scale compensation, rounding, normalization
//! and clamping of a rectangle given by two unordered corners.

use tracing::debug;

/// Two unordered corner points in (possibly preview-space) pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Corners {
    /// Maps preview-space coordinates back to source pixels.
    ///
    /// A factor that is absent, zero, non-finite or exactly 1.0 leaves the
    /// corners untouched.
    pub fn compensate(self, display_scale_factor: Option<f64>) -> Self {
        match display_scale_factor {
            Some(factor) if factor != 0.0 && factor != 1.0 && factor.is_finite() => {
                debug!(factor, "display scale factor detected, adjusting coordinates");
                Self {
                    x1: self.x1 / factor,
                    y1: self.y1 / factor,
                    x2: self.x2 / factor,
                    y2: self.y2 / factor,
                }
            }
            _ => self,
        }
    }

    /// Rounds every coordinate and orders each axis so that start <= end.
    pub fn normalize(self) -> PixelRect {
        let (x1, x2) = (round_coord(self.x1), round_coord(self.x2));
        let (y1, y2) = (round_coord(self.y1), round_coord(self.y2));
        PixelRect {
            x_start: x1.min(x2),
            y_start: y1.min(y2),
            x_end: x1.max(x2),
            y_end: y1.max(y2),
        }
    }
}

/// Nearest integer, ties to even.
pub fn round_coord(value: f64) -> i64 {
    value.round_ties_even() as i64
}

/// Half-open integer rectangle `[x_start, x_end) x [y_start, y_end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x_start: i64,
    pub y_start: i64,
    pub x_end: i64,
    pub y_end: i64,
}

impl PixelRect {
    /// Saturates at `i64::MAX` for corners far outside any image.
    pub fn width(&self) -> i64 {
        self.x_end.saturating_sub(self.x_start)
    }

    pub fn height(&self) -> i64 {
        self.y_end.saturating_sub(self.y_start)
    }

    pub fn is_empty(&self) -> bool {
        self.x_end <= self.x_start || self.y_end <= self.y_start
    }

    /// Clamps the rectangle into a `width`x`height` image, keeping at least
    /// one pixel per axis.
    ///
    /// Returns `None` when no non-empty window fits, which only happens for
    /// an image with a zero-length axis.
    pub fn clamp_to(self, width: usize, height: usize) -> Option<PixelRect> {
        let (x_start, x_end) = clamp_axis(self.x_start, self.x_end, width as i64);
        let (y_start, y_end) = clamp_axis(self.y_start, self.y_end, height as i64);
        let clamped = PixelRect {
            x_start,
            y_start,
            x_end,
            y_end,
        };

        let fits = clamped.x_end <= width as i64 && clamped.y_end <= height as i64;
        if clamped.is_empty() || !fits {
            return None;
        }
        Some(clamped)
    }
}

fn clamp_axis(start: i64, end: i64, extent: i64) -> (i64, i64) {
    let start = start.min(extent - 1).max(0);
    let end = end.min(extent).max(start + 1);
    (start, end)
}
