//! Single-image photometric and geometric adjustments.
//!
//! These are the building blocks of the augmentation recipes. Each takes
//! an image by reference and returns a new one.
//!
//! Two arithmetic conventions coexist because the reference views were
//! rendered by two different libraries:
//!
//! - [`brightness`] and [`saturation`] are blends between the image and a
//!   degenerate image (black, or the image's integer luma). The blend is
//!   computed in `f32`, clamped to `[0, 255]`, and truncated.
//! - [`contrast`] and [`desaturate`] are plain `f32` per-channel formulas,
//!   clamped and truncated.

use image::imageops;
use imageproc::geometric_transformations::{self, Interpolation};

use crate::types::{PAD_COLOR, RgbImage};

/// Scale brightness by `factor` (1.0 = unchanged, 0.0 = black).
#[must_use = "returns the adjusted image"]
pub fn brightness(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in &mut pixel.0 {
            *channel = blend(0, *channel, factor);
        }
    }
    out
}

/// Scale color saturation by `factor` (1.0 = unchanged, 0.0 = grayscale).
#[must_use = "returns the adjusted image"]
pub fn saturation(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let gray = luma_u8(pixel.0);
        for channel in &mut pixel.0 {
            *channel = blend(gray, *channel, factor);
        }
    }
    out
}

/// Scale contrast around the midpoint 128.
#[allow(clippy::suboptimal_flops)]
#[must_use = "returns the adjusted image"]
pub fn contrast(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        for channel in &mut pixel.0 {
            *channel = clamp_truncate((f32::from(*channel) - 128.0) * factor + 128.0);
        }
    }
    out
}

/// Blend toward grayscale by `amount` (0.0 = unchanged, 1.0 = grayscale).
///
/// Both blend weights are derived in `f64` and rounded to `f32` once, so
/// `amount = 0.6` keeps exactly `0.4f32` of the color.
#[allow(clippy::suboptimal_flops)]
#[must_use = "returns the adjusted image"]
pub fn desaturate(image: &RgbImage, amount: f64) -> RgbImage {
    let (keep, toward) = desaturate_weights(amount);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b] = pixel.0.map(f32::from);
        let gray = 0.299 * r + 0.587 * g + 0.114 * b;
        for channel in &mut pixel.0 {
            *channel = clamp_truncate(f32::from(*channel) * keep + gray * toward);
        }
    }
    out
}

/// Add zero-mean Gaussian noise with standard deviation `sigma`
/// (in 8-bit intensity units), drawn from a generator seeded with `seed`.
#[must_use = "returns the noisy image"]
pub fn gaussian_noise(image: &RgbImage, sigma: f32, seed: u64) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::noise::gaussian_noise(image, 0.0, f64::from(sigma), seed)
}

/// Mirror the image left to right.
#[must_use = "returns the flipped image"]
pub fn flip_horizontal(image: &RgbImage) -> RgbImage {
    imageops::flip_horizontal(image)
}

/// Rotate about the image center by `degrees`, counter-clockwise positive.
///
/// The center is `((w - 1) / 2, (h - 1) / 2)` in pixel-index coordinates,
/// where pixel centers sit on whole numbers. The output keeps the input
/// dimensions; corners exposed by the rotation are filled with
/// [`PAD_COLOR`]. Sampling is nearest-neighbour.
#[allow(clippy::cast_precision_loss)]
#[must_use = "returns the rotated image"]
pub fn rotate(image: &RgbImage, degrees: f32) -> RgbImage {
    if degrees == 0.0 {
        return image.clone();
    }
    let (w, h) = image.dimensions();
    let center = ((w as f32 - 1.0) / 2.0, (h as f32 - 1.0) / 2.0);
    // imageproc rotates clockwise for positive angles.
    let theta = (-degrees).to_radians();
    geometric_transformations::rotate(image, center, theta, Interpolation::Nearest, PAD_COLOR)
}

/// `(1 - amount, amount)`, each rounded from `f64` to `f32`.
#[allow(clippy::cast_possible_truncation)]
fn desaturate_weights(amount: f64) -> (f32, f32) {
    ((1.0 - amount) as f32, amount as f32)
}

/// Integer ITU-R 601 luma, rounded: `(19595 R + 38470 G + 7471 B + 2^15) >> 16`.
#[allow(clippy::cast_possible_truncation)]
fn luma_u8([r, g, b]: [u8; 3]) -> u8 {
    let l = u32::from(r) * 19595 + u32::from(g) * 38470 + u32::from(b) * 7471 + 0x8000;
    (l >> 16) as u8
}

/// `from + alpha * (to - from)`, clamped and truncated. Not fused.
#[allow(clippy::suboptimal_flops)]
fn blend(from: u8, to: u8, alpha: f32) -> u8 {
    let from = f32::from(from);
    clamp_truncate(from + alpha * (f32::from(to) - from))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_truncate(value: f32) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(8, 8, image::Rgb(rgb))
    }

    fn gradient() -> RgbImage {
        RgbImage::from_fn(32, 24, |x, y| {
            image::Rgb([
                u8::try_from(x * 8).unwrap_or(255),
                u8::try_from(y * 10).unwrap_or(255),
                u8::try_from((x + y) * 4).unwrap_or(255),
            ])
        })
    }

    #[test]
    fn brightness_truncates() {
        let out = brightness(&solid([100, 51, 3]), 0.7);
        // 70.0 -> 70, 35.7 -> 35, 2.1 -> 2
        assert_eq!(out.get_pixel(0, 0).0, [70, 35, 2]);
    }

    #[test]
    fn brightness_clamps() {
        let out = brightness(&solid([200, 100, 0]), 1.5);
        assert_eq!(out.get_pixel(0, 0).0, [255, 150, 0]);
    }

    #[test]
    fn brightness_identity() {
        let img = gradient();
        assert_eq!(brightness(&img, 1.0), img);
    }

    #[test]
    fn saturation_zero_is_luma() {
        let out = saturation(&solid([255, 0, 0]), 0.0);
        // (255 * 19595 + 32768) >> 16 = 76
        assert_eq!(out.get_pixel(0, 0).0, [76, 76, 76]);
    }

    #[test]
    fn saturation_leaves_grays_alone() {
        let img = solid([90, 90, 90]);
        assert_eq!(saturation(&img, 1.4), img);
        assert_eq!(saturation(&img, 0.5), img);
    }

    #[test]
    fn saturation_boost_spreads_channels() {
        let out = saturation(&solid([200, 100, 50]), 1.4);
        let [r, g, b] = out.get_pixel(0, 0).0;
        assert!(r > 200);
        assert!(b < 50);
        assert!(g <= 100);
    }

    #[test]
    fn contrast_around_midpoint() {
        let out = contrast(&solid([128, 228, 28]), 1.4);
        // 128 stays, 228 -> 268 clamps to 255, 28 -> -12 clamps to 0.
        assert_eq!(out.get_pixel(0, 0).0, [128, 255, 0]);
        let out = contrast(&solid([228, 28, 129]), 0.7);
        // 198.0, 58.0, 128.7 -> 128
        assert_eq!(out.get_pixel(0, 0).0, [198, 58, 128]);
    }

    #[test]
    fn desaturate_full_is_float_luma() {
        let out = desaturate(&solid([255, 0, 0]), 1.0);
        // 0.299 * 255 = 76.245 -> 76
        assert_eq!(out.get_pixel(0, 0).0, [76, 76, 76]);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn desaturate_weights_round_once() {
        // 1.0 - 0.6f32 is 0.39999998, one ulp below 0.4f32.
        assert_eq!(desaturate_weights(0.6), (0.4, 0.6));
        assert_ne!(desaturate_weights(0.6).0, 1.0 - 0.6_f32);
        assert_eq!(desaturate_weights(0.2), (0.8, 0.2));
        assert_eq!(desaturate_weights(0.3), (0.7, 0.3));
    }

    #[test]
    fn desaturate_partial() {
        let out = desaturate(&solid([0, 0, 200]), 0.5);
        // gray = 22.8; r = g = 11.4 -> 11, b = 100 + 11.4 = 111.4 -> 111
        assert_eq!(out.get_pixel(0, 0).0, [11, 11, 111]);
    }

    #[test]
    fn noise_is_seeded() {
        let img = solid([128, 128, 128]);
        let a = gaussian_noise(&img, 15.0, 42);
        let b = gaussian_noise(&img, 15.0, 42);
        let c = gaussian_noise(&img, 15.0, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, img);
    }

    #[test]
    fn zero_noise_is_identity() {
        let img = gradient();
        assert_eq!(gaussian_noise(&img, 0.0, 1), img);
    }

    #[test]
    fn flip_mirrors_columns() {
        let img = gradient();
        let flipped = flip_horizontal(&img);
        assert_eq!(flipped.get_pixel(0, 3), img.get_pixel(31, 3));
        assert_eq!(flip_horizontal(&flipped), img);
    }

    #[test]
    fn rotate_keeps_dimensions_and_fills_corners() {
        let img = RgbImage::from_pixel(40, 40, image::Rgb([10, 200, 10]));
        for degrees in [20.0, -20.0] {
            let rotated = rotate(&img, degrees);
            assert_eq!(rotated.dimensions(), (40, 40));
            assert_eq!(*rotated.get_pixel(0, 0), PAD_COLOR);
            assert_eq!(*rotated.get_pixel(39, 39), PAD_COLOR);
            assert_eq!(rotated.get_pixel(20, 20).0, [10, 200, 10]);
        }
    }

    #[test]
    fn rotate_zero_is_identity() {
        let img = gradient();
        assert_eq!(rotate(&img, 0.0), img);
    }

    #[test]
    fn rotate_half_turn_is_double_flip() {
        for (w, h) in [(8, 6), (7, 5), (40, 30)] {
            let img = RgbImage::from_fn(w, h, |x, y| {
                image::Rgb([
                    u8::try_from(x * 6 + 1).unwrap_or(255),
                    u8::try_from(y * 9 + 2).unwrap_or(255),
                    u8::try_from((x * 3 + y * 5) % 251).unwrap_or(255),
                ])
            });
            let expected = imageops::flip_vertical(&imageops::flip_horizontal(&img));
            assert_eq!(rotate(&img, 180.0), expected, "{w}x{h}");
            assert_eq!(rotate(&img, -180.0), expected, "{w}x{h}");
        }
    }

    #[test]
    fn rotate_commutes_with_mirror() {
        let img = RgbImage::from_fn(40, 30, |x, y| {
            image::Rgb([
                u8::try_from(x * 6).unwrap_or(255),
                u8::try_from(y * 8).unwrap_or(255),
                u8::try_from((x * 7 + y * 3) % 256).unwrap_or(255),
            ])
        });
        for degrees in [10.0, -10.0] {
            assert_eq!(
                rotate(&flip_horizontal(&img), degrees),
                flip_horizontal(&rotate(&img, -degrees)),
                "{degrees} degrees"
            );
        }
    }

    #[test]
    fn rotate_direction_is_counter_clockwise() {
        // A marker right of center moves up under a counter-clockwise turn.
        let mut img = RgbImage::from_pixel(41, 41, image::Rgb([0, 0, 0]));
        img.put_pixel(35, 20, image::Rgb([255, 255, 255]));
        let rotated = rotate(&img, 90.0);
        let (mut mx, mut my) = (0, 0);
        for (x, y, p) in rotated.enumerate_pixels() {
            if p.0 == [255, 255, 255] {
                mx = x;
                my = y;
            }
        }
        assert!(my < 10, "marker should move up, found at ({mx}, {my})");
        assert!((19..=21).contains(&mx), "marker should be centered, found at ({mx}, {my})");
    }
}
