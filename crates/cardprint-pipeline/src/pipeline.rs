//! Incremental pipeline: advance one card stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use cardprint_pipeline::{FingerprintConfig, Pipeline, PipelineError, ProjectionExtractor};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let extractor = ProjectionExtractor::new(7, 1280);
//! let record = Pipeline::new(png, FingerprintConfig::default())
//!     .decode()?
//!     .crop()?
//!     .describe()?
//!     .augment()?
//!     .embed(&extractor)?
//!     .into_record("KS-001", None);
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! forward only what later stages still need. Stages cannot be skipped,
//! reordered or interleaved; within one card the order is always
//! decode, crop, describe, augment, embed.
//!
//! # Memory
//!
//! [`Augmented`] holds all 30 rendered views (about 4.5 MB at 224×224).
//! [`Augmented::embed`] drops them once the centroid is computed.

use crate::aggregate::embed;
use crate::augment::{ViewBatch, augment};
use crate::diagnostics::StageMetrics;
use crate::extractor::FeatureExtractor;
use crate::geometry::{CropBounds, crop_artwork, crop_bounds, decode, letterbox};
use crate::histogram::hsv_histogram;
use crate::spatial::spatial_descriptor;
use crate::types::{Dimensions, FingerprintConfig, FingerprintRecord, PipelineError, RgbImage};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
///
/// Call [`decode`](Self::decode) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .decode() to continue"]
pub struct Pending {
    config: FingerprintConfig,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// Decode the source image and advance to [`Decoded`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty, [`PipelineError::ImageDecode`] if they are not a supported
    /// image, and [`PipelineError::ZeroArea`] if the image has no pixels.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let source_len = self.source.len();
        let image = decode(&self.source)?;
        Ok(Decoded {
            config: self.config,
            image,
            source_len,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding: the full card image as 8-bit RGB.
///
/// Call [`crop`](Self::crop) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .crop() to continue"]
pub struct Decoded {
    config: FingerprintConfig,
    image: RgbImage,
    source_len: usize,
}

impl Decoded {
    /// The decoded card image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Metrics describing the decode.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let dims = Dimensions::of(&self.image);
        StageMetrics::Decode {
            input_bytes: self.source_len,
            width: dims.width,
            height: dims.height,
            pixel_count: dims.pixel_count(),
        }
    }

    /// Cut out the artwork region and advance to [`Cropped`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ZeroArea`] if the configured region
    /// rounds to no pixels.
    pub fn crop(self) -> Result<Cropped, PipelineError> {
        let source = Dimensions::of(&self.image);
        let bounds = crop_bounds(source, self.config.artwork);
        let crop = crop_artwork(&self.image, self.config.artwork)?;
        Ok(Cropped {
            config: self.config,
            source,
            bounds,
            crop,
        })
    }
}

// ───────────────────────── Stage 2: Cropped ──────────────────────────

/// Pipeline state after cropping the artwork.
///
/// Call [`describe`](Self::describe) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .describe() to continue"]
pub struct Cropped {
    config: FingerprintConfig,
    source: Dimensions,
    bounds: CropBounds,
    crop: RgbImage,
}

impl Cropped {
    /// The artwork crop.
    #[must_use]
    pub const fn crop(&self) -> &RgbImage {
        &self.crop
    }

    /// Where the crop sits in the source image.
    #[must_use]
    pub const fn bounds(&self) -> CropBounds {
        self.bounds
    }

    /// Metrics describing the crop.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Crop {
            left: self.bounds.left,
            top: self.bounds.top,
            width: self.bounds.width,
            height: self.bounds.height,
        }
    }

    /// Compute both color descriptors and advance to [`Described`].
    ///
    /// The histogram is taken from the letterboxed tile, the spatial
    /// descriptor from the crop itself.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ZeroArea`] if the crop has no pixels.
    pub fn describe(self) -> Result<Described, PipelineError> {
        let tile = letterbox(&self.crop, self.config.input_size)?;
        let histogram = hsv_histogram(&tile);
        let spatial = spatial_descriptor(&self.crop);
        Ok(Described {
            config: self.config,
            source: self.source,
            crop: self.crop,
            tile,
            histogram,
            spatial,
        })
    }
}

// ───────────────────────── Stage 3: Described ────────────────────────

/// Pipeline state after computing the model-free descriptors.
///
/// Call [`augment`](Self::augment) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .augment() to continue"]
pub struct Described {
    config: FingerprintConfig,
    source: Dimensions,
    crop: RgbImage,
    tile: RgbImage,
    histogram: Vec<f32>,
    spatial: Vec<f32>,
}

impl Described {
    /// The letterboxed artwork tile the histogram was computed on.
    #[must_use]
    pub const fn tile(&self) -> &RgbImage {
        &self.tile
    }

    /// The HSV histogram.
    #[must_use]
    pub fn histogram(&self) -> &[f32] {
        &self.histogram
    }

    /// The spatial color descriptor.
    #[must_use]
    pub fn spatial(&self) -> &[f32] {
        &self.spatial
    }

    /// Metrics describing the descriptors.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn metrics(&self) -> StageMetrics {
        let norm = self
            .spatial
            .iter()
            .map(|&v| f64::from(v) * f64::from(v))
            .sum::<f64>()
            .sqrt();
        StageMetrics::Describe {
            tile_size: self.config.input_size,
            occupied_bins: self.histogram.iter().filter(|&&m| m > 0.0).count(),
            histogram_mass: self.histogram.iter().sum(),
            spatial_norm: norm as f32,
        }
    }

    /// Render the augmented views and advance to [`Augmented`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ZeroArea`] if the crop has no pixels.
    pub fn augment(self) -> Result<Augmented, PipelineError> {
        let views = augment(&self.crop, &self.config)?;
        Ok(Augmented {
            config: self.config,
            source: self.source,
            histogram: self.histogram,
            spatial: self.spatial,
            views,
        })
    }
}

// ───────────────────────── Stage 4: Augmented ────────────────────────

/// Pipeline state after rendering the augmented views.
///
/// Call [`embed`](Self::embed) to advance.
#[must_use = "pipeline stages are consumed by advancing; call .embed() to continue"]
pub struct Augmented {
    config: FingerprintConfig,
    source: Dimensions,
    histogram: Vec<f32>,
    spatial: Vec<f32>,
    views: ViewBatch,
}

impl Augmented {
    /// The rendered views, in recipe order.
    #[must_use]
    pub fn views(&self) -> &[RgbImage] {
        self.views.views()
    }

    /// Metrics describing the views.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Augment {
            view_count: self.views.len(),
            tile_size: self.config.input_size,
        }
    }

    /// Embed all views in one extractor call and advance to [`Embedded`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Extraction`] if the extractor fails or
    /// returns malformed output. No partial embedding is kept.
    pub fn embed<E: FeatureExtractor + ?Sized>(
        self,
        extractor: &E,
    ) -> Result<Embedded, PipelineError> {
        let embedding = embed(self.views.views(), extractor, self.config.input_size)?;
        Ok(Embedded {
            source: self.source,
            extractor: extractor.identifier().to_owned(),
            embedding,
            histogram: self.histogram,
            spatial: self.spatial,
        })
    }
}

// ───────────────────────── Stage 5: Embedded ─────────────────────────

/// Final pipeline state: every part of the fingerprint is computed.
///
/// Call [`into_record`](Self::into_record) to produce the record.
#[must_use = "call .into_record() to extract the FingerprintRecord"]
pub struct Embedded {
    source: Dimensions,
    extractor: String,
    embedding: Vec<f64>,
    histogram: Vec<f32>,
    spatial: Vec<f32>,
}

impl Embedded {
    /// The centroid embedding.
    #[must_use]
    pub fn embedding(&self) -> &[f64] {
        &self.embedding
    }

    /// Dimensions of the source card image.
    #[must_use]
    pub const fn source_dimensions(&self) -> Dimensions {
        self.source
    }

    /// Metrics describing the embedding.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        StageMetrics::Embed {
            extractor: self.extractor.clone(),
            embedding_dim: self.embedding.len(),
            centroid_norm: self.embedding.iter().map(|v| v * v).sum::<f64>().sqrt(),
        }
    }

    /// Assemble the fingerprint record.
    pub fn into_record(self, card_id: impl Into<String>, group: Option<String>) -> FingerprintRecord {
        FingerprintRecord {
            card_id: card_id.into(),
            extractor: self.extractor,
            embedding: self.embedding,
            histogram: self.histogram,
            spatial: self.spatial,
            group,
        }
    }
}

// ───────────────────── Pipeline entry point ──────────────────────────

/// Incremental per-card fingerprinting pipeline.
///
/// Created via [`Pipeline::new`] (encoded bytes) or
/// [`Pipeline::from_image`] (an already decoded image). Each stage method
/// consumes the current state and returns the next, making it a
/// compile-time error to skip stages or call them out of order.
pub struct Pipeline;

impl Pipeline {
    /// Store the source bytes and config without processing anything.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(image_bytes: Vec<u8>, config: FingerprintConfig) -> Pending {
        Pending {
            config,
            source: image_bytes,
        }
    }

    /// Start from a decoded image, skipping the decode stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ZeroArea`] if the image has no pixels.
    pub fn from_image(image: RgbImage, config: FingerprintConfig) -> Result<Decoded, PipelineError> {
        let dims = Dimensions::of(&image);
        if dims.is_empty() {
            return Err(PipelineError::ZeroArea {
                width: dims.width,
                height: dims.height,
            });
        }
        Ok(Decoded {
            config,
            image,
            source_len: 0,
        })
    }
}
