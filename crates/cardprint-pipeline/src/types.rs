//! Shared types for the cardprint fingerprinting pipeline.

use serde::{Deserialize, Serialize};

use crate::extractor::ExtractError;

/// Re-export `RgbImage` so downstream crates can hold crops and tiles
/// without depending on `image` directly.
pub use image::RgbImage;

/// Side length, in pixels, of every normalized tile fed to the extractor.
pub const INPUT_SIZE: u32 = 224;

/// Padding color used by letterboxing and by rotations for exposed corners.
pub const PAD_COLOR: image::Rgb<u8> = image::Rgb([128, 128, 128]);

/// Dimensionality of the embedding produced by the reference extractor.
pub const EMBEDDING_DIM: usize = 1280;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an image.
    #[must_use]
    pub fn of(image: &RgbImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Whether either side is zero.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Total number of pixels.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Artwork rectangle as fractions of the full card image.
///
/// The crop is a pure function of the source dimensions, never of its
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArtworkRegion {
    /// Left edge as a fraction of width.
    pub left: f64,
    /// Right edge as a fraction of width.
    pub right: f64,
    /// Top edge as a fraction of height.
    pub top: f64,
    /// Bottom edge as a fraction of height.
    pub bottom: f64,
}

impl ArtworkRegion {
    /// Artwork window of the card layout the reference database was built on.
    pub const CARD_ARTWORK: Self = Self {
        left: 0.08,
        right: 0.92,
        top: 0.18,
        bottom: 0.62,
    };
}

impl Default for ArtworkRegion {
    fn default() -> Self {
        Self::CARD_ARTWORK
    }
}

/// Configuration for the fingerprinting pipeline.
///
/// The defaults reproduce the reference database. Changing any of them
/// produces fingerprints that will not match fingerprints computed with
/// the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Side length of the square tiles produced by letterboxing.
    pub input_size: u32,

    /// Artwork rectangle cropped from the full card image.
    pub artwork: ArtworkRegion,

    /// Base seed for the pixel-noise augmentation views. View `n` derives
    /// its own seed from this value and `n`.
    pub noise_seed: u64,
}

impl FingerprintConfig {
    /// Default tile side length.
    pub const DEFAULT_INPUT_SIZE: u32 = INPUT_SIZE;

    /// Default base seed for noise views.
    pub const DEFAULT_NOISE_SEED: u64 = 0x5eed_ca4d;
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            input_size: Self::DEFAULT_INPUT_SIZE,
            artwork: ArtworkRegion::default(),
            noise_seed: Self::DEFAULT_NOISE_SEED,
        }
    }
}

/// Fingerprint of one card's artwork.
///
/// Created once per card per run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Card identifier from the catalog.
    pub card_id: String,

    /// Identifier of the extractor that produced `embedding`.
    pub extractor: String,

    /// Centroid of the augmented-view embeddings (not normalized).
    pub embedding: Vec<f64>,

    /// HSV histogram of the letterboxed artwork.
    pub histogram: Vec<f32>,

    /// Spatial color descriptor of the unletterboxed artwork.
    pub spatial: Vec<f32>,

    /// Optional grouping tag (e.g. the card's color).
    pub group: Option<String>,
}

/// Coarse classification of a per-card failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Zero-area, empty, or undecodable input.
    InvalidImage,
    /// The image source could not supply the card's image.
    AcquisitionFailure,
    /// The feature extractor failed or returned unusable output.
    ExtractionFailure,
}

/// Errors that can occur while fingerprinting a card.
///
/// Every variant is fatal to the card being processed and to nothing else.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// An image (or the crop taken from it) has no pixels.
    #[error("image has zero area ({width}x{height})")]
    ZeroArea {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },

    /// A tile handed to the extractor does not have the configured size.
    #[error("tile is {width}x{height}, expected {expected}x{expected}")]
    TileSize {
        /// Expected side length.
        expected: u32,
        /// Actual width.
        width: u32,
        /// Actual height.
        height: u32,
    },

    /// The image source failed to supply the card image.
    #[error("image acquisition failed: {0}")]
    Acquisition(String),

    /// The feature extractor failed for the batch.
    #[error("feature extraction failed: {0}")]
    Extraction(#[from] ExtractError),
}

impl PipelineError {
    /// Classify the error for skip reporting.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput
            | Self::ImageDecode(_)
            | Self::ZeroArea { .. }
            | Self::TileSize { .. } => ErrorKind::InvalidImage,
            Self::Acquisition(_) => ErrorKind::AcquisitionFailure,
            Self::Extraction(_) => ErrorKind::ExtractionFailure,
        }
    }
}
