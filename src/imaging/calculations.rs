//! Pure calculation functions for output geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use super::backend::Dimensions;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidImage { width: u32, height: u32 },
}

/// Requested geometry change. `max_*` of 0 means unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResizeRequest {
    pub scale: Option<f64>,
    pub max_width: u32,
    pub max_height: u32,
}

/// Decide the output dimensions for an image.
///
/// Rules, first match wins:
/// 1. `0 < scale < 1` scales both axes, flooring.
/// 2. A non-zero cap treats `(max_width, max_height)` as a bounding box.
///    A missing cap is derived from the source aspect ratio. The box only
///    applies when the source exceeds it, and then the output is exactly the
///    box. Two caps with a different aspect than the source stretch the image.
/// 3. Otherwise the original dimensions are kept.
///
/// Computed axes never drop below one pixel.
///
/// # Examples
/// ```
/// # use picpress::imaging::{plan_resize, Dimensions, ResizeRequest};
/// let original = Dimensions { width: 800, height: 600 };
/// let request = ResizeRequest { max_width: 400, ..Default::default() };
/// assert_eq!(
///     plan_resize(original, &request).unwrap(),
///     Dimensions { width: 400, height: 300 }
/// );
/// ```
pub fn plan_resize(original: Dimensions, request: &ResizeRequest) -> Result<Dimensions, PlanError> {
    let Dimensions { width, height } = original;
    if width == 0 || height == 0 {
        return Err(PlanError::InvalidImage { width, height });
    }

    if let Some(scale) = request.scale.filter(|s| *s > 0.0 && *s < 1.0) {
        return Ok(Dimensions {
            width: scale_axis(width, scale),
            height: scale_axis(height, scale),
        });
    }

    if request.max_width > 0 || request.max_height > 0 {
        let mut max_w = request.max_width;
        let mut max_h = request.max_height;

        // Derive the missing cap from the source aspect ratio
        if max_w == 0 {
            max_w = floor_at_least_one(proportional(max_h, width, height));
        } else if max_h == 0 {
            max_h = floor_at_least_one(proportional(max_w, height, width));
        }

        if width > max_w || height > max_h {
            return Ok(Dimensions {
                width: max_w,
                height: max_h,
            });
        }
    }

    Ok(original)
}

/// Shrink to fit inside a bounding box, keeping the aspect ratio.
///
/// A cap of 0 leaves that axis unconstrained. Images already inside the box
/// are returned unchanged; nothing is ever enlarged. Axes are rounded and
/// never drop below one pixel.
pub fn fit_within(
    original: Dimensions,
    max_width: u32,
    max_height: u32,
) -> Result<Dimensions, PlanError> {
    let Dimensions { width, height } = original;
    if width == 0 || height == 0 {
        return Err(PlanError::InvalidImage { width, height });
    }

    let factor = |cap: u32, len: u32| (cap > 0).then(|| cap as f64 / len as f64);
    let factor = match (factor(max_width, width), factor(max_height, height)) {
        (Some(w), Some(h)) => w.min(h),
        (Some(f), None) | (None, Some(f)) => f,
        (None, None) => return Ok(original),
    };
    if factor >= 1.0 {
        return Ok(original);
    }

    let fit = |len: u32| ((len as f64 * factor).round() as u32).max(1);
    Ok(Dimensions {
        width: fit(width),
        height: fit(height),
    })
}

/// `value * num / den` in floating point, as the cap derivation needs.
fn proportional(value: u32, num: u32, den: u32) -> f64 {
    value as f64 * num as f64 / den as f64
}

fn scale_axis(len: u32, scale: f64) -> u32 {
    floor_at_least_one(len as f64 * scale)
}

fn floor_at_least_one(v: f64) -> u32 {
    (v.floor() as u32).max(1)
}

/// Percentage size reduction: `100 × (1 − compressed/original)`.
///
/// Negative when the output grew. An empty original yields 0.
pub fn compression_ratio(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    100.0 - (compressed_size as f64 / original_size as f64 * 100.0)
}
