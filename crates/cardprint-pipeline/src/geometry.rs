//! Geometric normalization: decoding, artwork cropping, and letterboxing.
//!
//! Every other stage depends on these functions. The crop rectangle is a
//! pure function of the source dimensions, and letterboxing preserves the
//! aspect ratio of the content while padding the rest of a square canvas
//! with [`PAD_COLOR`].
//!
//! Rounding matches the deployed matching client exactly: crop edges and
//! scaled sizes are rounded half-to-even on `f64` products, and padding
//! offsets use integer floor division of the remaining space.

use image::imageops::{self, FilterType};

use crate::types::{ArtworkRegion, Dimensions, PAD_COLOR, PipelineError, RgbImage};

/// Decode raw image bytes into an 8-bit RGB image.
///
/// Supports PNG, JPEG, BMP, and WebP (whatever the `image` crate can
/// decode). Alpha is discarded.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty,
/// [`PipelineError::ImageDecode`] if the data cannot be decoded, and
/// [`PipelineError::ZeroArea`] if the decoded image has no pixels.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let image = image::load_from_memory(bytes)?.to_rgb8();
    ensure_nonempty(Dimensions::of(&image))?;
    Ok(image)
}

/// Pixel rectangle of a crop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBounds {
    /// Left edge (inclusive).
    pub left: u32,
    /// Top edge (inclusive).
    pub top: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Compute the pixel rectangle of `region` within an image of `source`
/// dimensions.
///
/// Each edge is rounded to the nearest pixel independently (ties to
/// even) and clamped to the image.
#[must_use]
pub fn crop_bounds(source: Dimensions, region: ArtworkRegion) -> CropBounds {
    let w = f64::from(source.width);
    let h = f64::from(source.height);
    let left = edge(w * region.left, source.width);
    let right = edge(w * region.right, source.width);
    let top = edge(h * region.top, source.height);
    let bottom = edge(h * region.bottom, source.height);
    CropBounds {
        left,
        top,
        width: right.saturating_sub(left),
        height: bottom.saturating_sub(top),
    }
}

/// Round a fractional edge position to a pixel index within `0..=extent`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn edge(position: f64, extent: u32) -> u32 {
    let rounded = position.round_ties_even().clamp(0.0, f64::from(extent));
    rounded as u32
}

/// Crop the artwork region out of a full card image.
///
/// # Errors
///
/// Returns [`PipelineError::ZeroArea`] if the source or the resulting crop
/// has no pixels.
pub fn crop_artwork(image: &RgbImage, region: ArtworkRegion) -> Result<RgbImage, PipelineError> {
    let source = Dimensions::of(image);
    ensure_nonempty(source)?;

    let bounds = crop_bounds(source, region);
    ensure_nonempty(Dimensions {
        width: bounds.width,
        height: bounds.height,
    })?;

    Ok(imageops::crop_imm(image, bounds.left, bounds.top, bounds.width, bounds.height).to_image())
}

/// Placement of scaled content on a letterbox canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LetterboxLayout {
    /// Size of the content after aspect-preserving scaling.
    pub scaled: Dimensions,
    /// Horizontal padding before the content.
    pub offset_x: u32,
    /// Vertical padding before the content.
    pub offset_y: u32,
}

/// Compute where content of `source` dimensions lands on a `size`×`size`
/// canvas.
///
/// `scale = min(size / width, size / height)`; scaled sides are rounded
/// (ties to even) and never smaller than one pixel.
///
/// # Errors
///
/// Returns [`PipelineError::ZeroArea`] if `source` has no pixels.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn letterbox_layout(source: Dimensions, size: u32) -> Result<LetterboxLayout, PipelineError> {
    ensure_nonempty(source)?;

    let w = f64::from(source.width);
    let h = f64::from(source.height);
    let target = f64::from(size);
    let scale = (target / w).min(target / h);

    let scaled_side = |side: f64| -> u32 {
        let rounded = (side * scale).round_ties_even().clamp(1.0, target.max(1.0));
        rounded as u32
    };
    let scaled = Dimensions {
        width: scaled_side(w),
        height: scaled_side(h),
    };

    Ok(LetterboxLayout {
        scaled,
        offset_x: size.saturating_sub(scaled.width) / 2,
        offset_y: size.saturating_sub(scaled.height) / 2,
    })
}

/// Resize `image` to fit a `size`×`size` square, preserving its aspect
/// ratio, and pad the remainder with [`PAD_COLOR`].
///
/// Uses the Lanczos3 filter, which widens its support when downscaling and
/// therefore behaves as an anti-aliasing filter.
///
/// # Errors
///
/// Returns [`PipelineError::ZeroArea`] if `image` has no pixels.
pub fn letterbox(image: &RgbImage, size: u32) -> Result<RgbImage, PipelineError> {
    let source = Dimensions::of(image);
    let layout = letterbox_layout(source, size)?;

    let mut canvas = RgbImage::from_pixel(size, size, PAD_COLOR);
    if layout.scaled == source {
        imageops::replace(
            &mut canvas,
            image,
            i64::from(layout.offset_x),
            i64::from(layout.offset_y),
        );
    } else {
        let resized = imageops::resize(
            image,
            layout.scaled.width,
            layout.scaled.height,
            FilterType::Lanczos3,
        );
        imageops::replace(
            &mut canvas,
            &resized,
            i64::from(layout.offset_x),
            i64::from(layout.offset_y),
        );
    }
    Ok(canvas)
}

/// Fail fast on images without pixels.
const fn ensure_nonempty(dims: Dimensions) -> Result<(), PipelineError> {
    if dims.is_empty() {
        return Err(PipelineError::ZeroArea {
            width: dims.width,
            height: dims.height,
        });
    }
    Ok(())
}
