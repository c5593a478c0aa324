//! Per-card diagnostics: stage timings and the numbers behind each stage.
//!
//! [`fingerprint_with_diagnostics`] runs the incremental pipeline one stage
//! at a time and records how long each stage took and what it produced.
//! The orchestrator logs the resulting [`FingerprintDiagnostics::report`]
//! when asked to, which is the main tool for spotting slow extractors and
//! suspicious crops (e.g. a tiny artwork region from a mis-scanned card).
//!
//! Time is read through the [`Clock`] trait so this crate stays free of
//! platform time sources and tests can use a fake clock.
//!
//! Durations are serialized as fractional seconds (`f64`), since
//! `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extractor::FeatureExtractor;
use crate::pipeline::Pipeline;
use crate::types::{FingerprintConfig, FingerprintRecord, PipelineError};

/// Source of monotonic time.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom("duration must be finite and non-negative"))
    }
}

/// Diagnostics for one fingerprinted card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintDiagnostics {
    /// Image decoding.
    pub decode: StageDiagnostics,
    /// Artwork crop.
    pub crop: StageDiagnostics,
    /// Letterbox, histogram and spatial descriptor.
    pub describe: StageDiagnostics,
    /// Rendering of the augmented views.
    pub augment: StageDiagnostics,
    /// Extractor call and centroid.
    pub embed: StageDiagnostics,
    /// Wall-clock duration of the whole card (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the card.
    pub summary: FingerprintSummary,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Image decoding.
    Decode {
        /// Size of the encoded input; 0 when the pipeline started from an
        /// already decoded image.
        input_bytes: usize,
        /// Decoded width in pixels.
        width: u32,
        /// Decoded height in pixels.
        height: u32,
        /// `width * height`.
        pixel_count: u64,
    },
    /// Artwork crop.
    Crop {
        /// Left edge in source pixels.
        left: u32,
        /// Top edge in source pixels.
        top: u32,
        /// Crop width.
        width: u32,
        /// Crop height.
        height: u32,
    },
    /// Color descriptors.
    Describe {
        /// Side of the letterboxed tile.
        tile_size: u32,
        /// Histogram bins with nonzero mass.
        occupied_bins: usize,
        /// Total histogram mass (1 unless every pixel was masked out).
        histogram_mass: f32,
        /// L2 norm of the spatial descriptor (1, or 0 for flat artwork).
        spatial_norm: f32,
    },
    /// View rendering.
    Augment {
        /// Number of rendered views.
        view_count: usize,
        /// Side of each view.
        tile_size: u32,
    },
    /// Extraction and aggregation.
    Embed {
        /// Identifier of the extractor.
        extractor: String,
        /// Length of the centroid.
        embedding_dim: usize,
        /// L2 norm of the (unnormalized) centroid.
        centroid_norm: f64,
    },
}

/// High-level facts about one card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintSummary {
    /// Card identifier.
    pub card_id: String,
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Number of augmented views embedded.
    pub view_count: usize,
    /// Embedding length.
    pub embedding_dim: usize,
}

impl FingerprintDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "Fingerprint Diagnostics: {}\n{}",
            self.summary.card_id,
            "=".repeat(60)
        ));
        lines.push(format!(
            "Image: {}x{}  |  Views: {}  |  Embedding: {} dims",
            self.summary.image_width,
            self.summary.image_height,
            self.summary.view_count,
            self.summary.embedding_dim,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration)
        ));
        lines.push(String::new());
        lines.push(format!(
            "{:<12} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Decode", &self.decode),
            ("Crop", &self.crop),
            ("Describe", &self.describe),
            ("Augment", &self.augment),
            ("Embed", &self.embed),
        ];
        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<12} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }
        lines.join("\n")
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Decode {
            input_bytes,
            width,
            height,
            ..
        } => format!("{input_bytes} bytes -> {width}x{height}"),
        StageMetrics::Crop {
            left,
            top,
            width,
            height,
        } => format!("{width}x{height} at ({left}, {top})"),
        StageMetrics::Describe {
            tile_size,
            occupied_bins,
            histogram_mass,
            spatial_norm,
        } => format!(
            "tile={tile_size} bins={occupied_bins} mass={histogram_mass:.3} spatial_norm={spatial_norm:.3}"
        ),
        StageMetrics::Augment {
            view_count,
            tile_size,
        } => format!("{view_count} views of {tile_size}x{tile_size}"),
        StageMetrics::Embed {
            extractor,
            embedding_dim,
            centroid_norm,
        } => format!("{extractor} d={embedding_dim} |c|={centroid_norm:.4}"),
    }
}

/// Fingerprint one card, timing every stage.
///
/// Produces exactly the record [`crate::fingerprint`] produces.
///
/// # Errors
///
/// Same as [`crate::fingerprint`].
pub fn fingerprint_with_diagnostics<E, C>(
    image_bytes: Vec<u8>,
    card_id: &str,
    group: Option<String>,
    config: &FingerprintConfig,
    extractor: &E,
    clock: &C,
) -> Result<(FingerprintRecord, FingerprintDiagnostics), PipelineError>
where
    E: FeatureExtractor + ?Sized,
    C: Clock,
{
    let start = clock.now();

    let t = clock.now();
    let decoded = Pipeline::new(image_bytes, config.clone()).decode()?;
    let decode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: decoded.metrics(),
    };

    let t = clock.now();
    let cropped = decoded.crop()?;
    let crop = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: cropped.metrics(),
    };

    let t = clock.now();
    let described = cropped.describe()?;
    let describe = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: described.metrics(),
    };

    let t = clock.now();
    let augmented = described.augment()?;
    let augment = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: augmented.metrics(),
    };
    let view_count = augmented.views().len();

    let t = clock.now();
    let embedded = augmented.embed(extractor)?;
    let embed = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: embedded.metrics(),
    };

    let source = embedded.source_dimensions();
    let summary = FingerprintSummary {
        card_id: card_id.to_owned(),
        image_width: source.width,
        image_height: source.height,
        view_count,
        embedding_dim: embedded.embedding().len(),
    };
    let record = embedded.into_record(card_id, group);

    let diagnostics = FingerprintDiagnostics {
        decode,
        crop,
        describe,
        augment,
        embed,
        total_duration: clock.elapsed(&start),
        summary,
    };
    Ok((record, diagnostics))
}
