//! Gaussian blur for the defocus augmentation views.
//!
//! Thin wrapper over [`imageproc::filter::gaussian_blur_f32`], which blurs
//! every channel of an RGB image independently.

use crate::types::RgbImage;

/// Apply Gaussian blur to an RGB image.
///
/// Higher `sigma` values produce more smoothing. Non-positive sigma values
/// return the image unchanged; `imageproc` rejects them.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_rgb(image: &RgbImage, sigma: f32) -> RgbImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageproc::filter::gaussian_blur_f32(image, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = RgbImage::from_fn(4, 4, |x, _| image::Rgb([u8::from(x > 1) * 200, 150, 20]));
        assert_eq!(gaussian_blur_rgb(&img, 0.0), img);
    }

    #[test]
    fn negative_sigma_returns_identical_image() {
        let img = RgbImage::from_pixel(4, 4, image::Rgb([100, 150, 200]));
        assert_eq!(gaussian_blur_rgb(&img, -1.0), img);
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = RgbImage::new(17, 31);
        let blurred = gaussian_blur_rgb(&img, 1.5);
        assert_eq!(blurred.dimensions(), (17, 31));
    }

    #[test]
    fn blur_smooths_sharp_color_edge() {
        let img = RgbImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let blurred = gaussian_blur_rgb(&img, 2.0);

        let left = blurred.get_pixel(4, 5).0[0];
        let right = blurred.get_pixel(5, 5).0[0];
        assert!(left < 255, "expected red to decrease near boundary, got {left}");
        assert!(right > 0, "expected red to increase near boundary, got {right}");
    }

    #[test]
    fn channels_blur_independently() {
        let img = RgbImage::from_fn(12, 9, |x, y| {
            image::Rgb([
                u8::from(x > 5) * 240,
                u8::try_from(y * 25).unwrap_or(255),
                u8::from((x + y) % 3 == 0) * 180,
            ])
        });
        let blurred = gaussian_blur_rgb(&img, 1.5);
        for c in 0..3 {
            let plane = image::GrayImage::from_fn(12, 9, |x, y| {
                image::Luma([img.get_pixel(x, y).0[c]])
            });
            let expected = imageproc::filter::gaussian_blur_f32(&plane, 1.5);
            for (x, y, p) in expected.enumerate_pixels() {
                assert_eq!(blurred.get_pixel(x, y).0[c], p.0[0], "channel {c} at ({x}, {y})");
            }
        }
    }

    #[test]
    fn uniform_unchanged_by_blur() {
        let img = RgbImage::from_pixel(10, 10, image::Rgb([100, 150, 200]));
        let blurred = gaussian_blur_rgb(&img, 2.0);
        let expected: [u8; 3] = [100, 150, 200];
        for pixel in blurred.pixels() {
            for (c, &exp) in expected.iter().enumerate() {
                let diff = i16::from(pixel.0[c]) - i16::from(exp);
                assert!(diff.abs() <= 1, "channel {c}: expected ~{exp}, got {}", pixel.0[c]);
            }
        }
    }
}
