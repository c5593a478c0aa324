//! HSV color histogram.
//!
//! A model-free fingerprint of the artwork's color distribution: a
//! 16×8×8 grid over (hue, saturation, value), normalized to sum to 1.
//!
//! Dark pixels (`V < 0.1`) and bright desaturated pixels (`S < 0.1` and
//! `V > 0.6`) are excluded so card backgrounds cannot dominate the
//! histogram. All arithmetic is single precision to match the matching
//! client bit for bit.
//!
//! The pipeline computes this on the *letterboxed* artwork, so the gray
//! padding takes part in the histogram.

use crate::types::RgbImage;

/// Number of hue bins.
pub const H_BINS: usize = 16;

/// Number of saturation bins.
pub const S_BINS: usize = 8;

/// Number of value bins.
pub const V_BINS: usize = 8;

/// Total histogram length.
pub const HISTOGRAM_LEN: usize = H_BINS * S_BINS * V_BINS;

/// A color in HSV space: hue in degrees `[0, 360)`, saturation and value
/// in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    /// Hue in degrees.
    pub h: f32,
    /// Saturation.
    pub s: f32,
    /// Value (brightness).
    pub v: f32,
}

impl Hsv {
    /// Convert an 8-bit RGB triple.
    ///
    /// When several channels share the maximum, blue takes precedence over
    /// green, and green over red. Grays (`max == min`) have hue 0.
    #[must_use]
    pub fn from_rgb([r, g, b]: [u8; 3]) -> Self {
        let r = f32::from(r) / 255.0;
        let g = f32::from(g) / 255.0;
        let b = f32::from(b) / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let s = if max == 0.0 { 0.0 } else { delta / max };

        #[allow(clippy::float_cmp)]
        let mut h = if delta <= 0.0 {
            0.0
        } else if max == b {
            60.0 * ((r - g) / delta + 4.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        };
        if h < 0.0 {
            h += 360.0;
        }

        Self { h, s, v: max }
    }

    /// Whether the pixel is excluded from the histogram.
    #[must_use]
    pub fn is_background(self) -> bool {
        self.v < 0.1 || (self.s < 0.1 && self.v > 0.6)
    }

    /// Flattened histogram bin: `h * S_BINS * V_BINS + s * V_BINS + v`.
    #[must_use]
    pub fn bin(self) -> usize {
        let h = quantize(self.h / 360.0, H_BINS);
        let s = quantize(self.s, S_BINS);
        let v = quantize(self.v, V_BINS);
        h * S_BINS * V_BINS + s * V_BINS + v
    }
}

/// `floor(value * bins)` clamped to `[0, bins - 1]`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn quantize(value: f32, bins: usize) -> usize {
    let scaled = (value * bins as f32).trunc().max(0.0) as usize;
    scaled.min(bins - 1)
}

/// Compute the normalized HSV histogram of an image.
///
/// Returns [`HISTOGRAM_LEN`] values that sum to 1 when at least one pixel
/// survives the background mask, and all zeros otherwise.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn hsv_histogram(image: &RgbImage) -> Vec<f32> {
    let mut counts = vec![0_u32; HISTOGRAM_LEN];
    let mut counted: u32 = 0;

    for pixel in image.pixels() {
        let hsv = Hsv::from_rgb(pixel.0);
        if hsv.is_background() {
            continue;
        }
        counts[hsv.bin()] += 1;
        counted += 1;
    }

    if counted == 0 {
        return vec![0.0; HISTOGRAM_LEN];
    }

    let total = counted as f32;
    counts.into_iter().map(|c| c as f32 / total).collect()
}
