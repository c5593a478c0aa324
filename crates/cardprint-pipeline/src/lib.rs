//! cardprint-pipeline: deterministic visual fingerprints of card artwork
//! (sans-IO).
//!
//! Turns one card image into a [`FingerprintRecord`] through:
//! decode -> artwork crop -> color descriptors -> 30 augmented views ->
//! batched embedding -> centroid.
//!
//! The classical stages (cropping, letterboxing, HSV histogram, spatial
//! descriptor, augmentation) are pure functions with fixed numeric
//! conventions, so an independent implementation of the matching client
//! reproduces them bit for bit. The embedding model sits behind the
//! [`FeatureExtractor`] trait.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! byte slices and images. Acquiring images, running inference runtimes
//! and writing output live in the `cardprint` binary.

pub mod adjust;
pub mod aggregate;
pub mod augment;
pub mod blur;
pub mod diagnostics;
pub mod extractor;
pub mod geometry;
pub mod histogram;
pub mod pipeline;
pub mod spatial;
pub mod tensor;
pub mod types;

pub use ndarray;

pub use augment::{RECIPES, Recipe, Transform, VIEW_COUNT, ViewBatch, augment, render_view};
pub use extractor::{ExtractError, FeatureExtractor, ProjectionExtractor};
pub use histogram::HISTOGRAM_LEN;
pub use pipeline::Pipeline;
pub use spatial::SPATIAL_LEN;
pub use types::{
    ArtworkRegion, Dimensions, EMBEDDING_DIM, ErrorKind, FingerprintConfig, FingerprintRecord,
    INPUT_SIZE, PipelineError, RgbImage,
};

/// Fingerprint one card.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), crops the artwork,
/// computes the HSV histogram and spatial descriptor, renders the 30
/// augmented views, embeds them with `extractor` in a single batch, and
/// returns the record tagged with the extractor's identifier.
///
/// # Pipeline steps
///
/// 1. Decode to 8-bit RGB
/// 2. Crop the artwork region
/// 3. Letterbox; HSV histogram of the tile, spatial descriptor of the crop
/// 4. Render the augmented views
/// 5. Embed all views, then average in double precision
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`], [`PipelineError::ImageDecode`]
/// or [`PipelineError::ZeroArea`] for unusable images, and
/// [`PipelineError::Extraction`] if the extractor fails. No partial
/// record is produced.
pub fn fingerprint<E: FeatureExtractor + ?Sized>(
    image_bytes: Vec<u8>,
    card_id: &str,
    group: Option<String>,
    config: &FingerprintConfig,
    extractor: &E,
) -> Result<FingerprintRecord, PipelineError> {
    Ok(Pipeline::new(image_bytes, config.clone())
        .decode()?
        .crop()?
        .describe()?
        .augment()?
        .embed(extractor)?
        .into_record(card_id, group))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// A synthetic card: bright frame, saturated artwork window, text-ish
    /// stripes below.
    fn card_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let fx = f64::from(x) / f64::from(width);
            let fy = f64::from(y) / f64::from(height);
            if (0.08..0.92).contains(&fx) && (0.18..0.62).contains(&fy) {
                image::Rgb([
                    u8::try_from((x * 3) % 256).unwrap(),
                    u8::try_from((y * 5) % 256).unwrap(),
                    180,
                ])
            } else if fy > 0.7 && y % 6 < 2 {
                image::Rgb([20, 20, 20])
            } else {
                image::Rgb([245, 240, 230])
            }
        });
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    fn small_config() -> FingerprintConfig {
        FingerprintConfig {
            input_size: 48,
            ..FingerprintConfig::default()
        }
    }

    #[test]
    fn fingerprint_empty_input() {
        let extractor = ProjectionExtractor::new(1, 8);
        let result = fingerprint(vec![], "a", None, &small_config(), &extractor);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn fingerprint_corrupt_input() {
        let extractor = ProjectionExtractor::new(1, 8);
        let result = fingerprint(vec![0xFF, 0x00], "a", None, &small_config(), &extractor);
        let err = result.unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidImage);
    }

    #[test]
    fn record_has_fixed_lengths() {
        let extractor = ProjectionExtractor::new(3, 64);
        let record =
            fingerprint(card_png(90, 126), "KS-1", None, &small_config(), &extractor).unwrap();
        assert_eq!(record.embedding.len(), 64);
        assert_eq!(record.histogram.len(), HISTOGRAM_LEN);
        assert_eq!(record.spatial.len(), SPATIAL_LEN);
        assert_eq!(record.extractor, extractor.identifier());
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let extractor = ProjectionExtractor::new(5, 32);
        let png = card_png(100, 140);
        let a = fingerprint(png.clone(), "KS-2", None, &small_config(), &extractor).unwrap();
        let b = fingerprint(png, "KS-2", None, &small_config(), &extractor).unwrap();

        let bits = |v: &[f32]| v.iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a.histogram), bits(&b.histogram));
        assert_eq!(bits(&a.spatial), bits(&b.spatial));
        for (x, y) in a.embedding.iter().zip(&b.embedding) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn descriptors_are_normalized() {
        let extractor = ProjectionExtractor::new(5, 8);
        let record =
            fingerprint(card_png(80, 112), "KS-3", None, &small_config(), &extractor).unwrap();
        let mass: f32 = record.histogram.iter().sum();
        assert!((mass - 1.0).abs() < 1e-4);
        let norm: f64 = record
            .spatial
            .iter()
            .map(|&v| f64::from(v) * f64::from(v))
            .sum::<f64>()
            .sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn different_artwork_gives_different_fingerprint() {
        let extractor = ProjectionExtractor::new(5, 16);
        let a = fingerprint(card_png(90, 126), "a", None, &small_config(), &extractor).unwrap();
        let flat = {
            let img = RgbImage::from_pixel(90, 126, image::Rgb([30, 160, 60]));
            let mut buf = Vec::new();
            img.write_to(
                &mut std::io::Cursor::new(&mut buf),
                image::ImageFormat::Png,
            )
            .unwrap();
            buf
        };
        let b = fingerprint(flat, "b", None, &small_config(), &extractor).unwrap();
        assert_ne!(a.histogram, b.histogram);
        assert_ne!(a.embedding, b.embedding);
        // Flat artwork has a zero spatial descriptor.
        assert!(b.spatial.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn extractor_failure_is_extraction_kind() {
        struct Broken;
        impl FeatureExtractor for Broken {
            fn identifier(&self) -> &str {
                "broken"
            }
            fn embedding_dim(&self) -> usize {
                EMBEDDING_DIM
            }
            fn extract(
                &self,
                _batch: ndarray::ArrayView4<'_, f32>,
            ) -> Result<ndarray::Array2<f32>, ExtractError> {
                Err(ExtractError::Backend("model not loaded".to_owned()))
            }
        }

        let err = fingerprint(card_png(60, 84), "a", None, &small_config(), &Broken).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExtractionFailure);
    }

    #[test]
    fn boxed_dyn_extractor_works() {
        let extractor: Box<dyn FeatureExtractor> = Box::new(ProjectionExtractor::new(5, 8));
        let record =
            fingerprint(card_png(60, 84), "a", None, &small_config(), &extractor).unwrap();
        assert_eq!(record.embedding.len(), 8);
    }
}
