//! Feature extraction: the seam between the classical pipeline and a
//! frozen embedding model.
//!
//! This module defines the [`FeatureExtractor`] trait, which maps a batch
//! of normalized tiles (`[N, 3, S, S]`) to one embedding per tile
//! (`[N, D]`), and [`ProjectionExtractor`], a deterministic model-free
//! implementation.
//!
//! # Strategy pattern
//!
//! The pipeline never looks inside the extractor. Inference runtimes live
//! outside this crate and plug in by implementing the trait, so the core
//! stays free of I/O and accelerator state.

use ndarray::{Array2, ArrayView4, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::spatial::cell_span;

/// Errors produced by an extractor, or found in its output.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// The inference backend failed.
    #[error("extractor backend failed: {0}")]
    Backend(String),

    /// The output does not have one row per view and one column per
    /// embedding dimension.
    #[error("extractor output has shape {actual:?}, expected [{rows}, {cols}]")]
    Shape {
        /// Expected rows (views).
        rows: usize,
        /// Expected columns (embedding dimension).
        cols: usize,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// The output contains NaN or infinity.
    #[error("extractor output is not finite at view {view}, dimension {dimension}")]
    NonFinite {
        /// Row of the offending value.
        view: usize,
        /// Column of the offending value.
        dimension: usize,
    },
}

/// A frozen, batched image-to-vector function.
///
/// Implementations must be deterministic for a given input within one
/// run. They are shared across worker threads.
pub trait FeatureExtractor: Send + Sync {
    /// Identifier recorded alongside every embedding this extractor
    /// produces.
    fn identifier(&self) -> &str;

    /// Length of each output vector.
    fn embedding_dim(&self) -> usize;

    /// Embed a batch of `[N, 3, S, S]` normalized tiles into `[N, D]`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Backend`] if inference fails.
    fn extract(&self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, ExtractError>;
}

impl<T: FeatureExtractor + ?Sized> FeatureExtractor for Box<T> {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    fn embedding_dim(&self) -> usize {
        (**self).embedding_dim()
    }

    fn extract(&self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, ExtractError> {
        (**self).extract(batch)
    }
}

/// Grid side used by [`ProjectionExtractor`] when pooling each channel.
pub const POOL_GRID: usize = 8;

const POOLED_LEN: usize = 3 * POOL_GRID * POOL_GRID;

/// Deterministic model-free extractor.
///
/// Average-pools each channel of a tile to an 8×8 grid, then applies a
/// fixed random projection drawn from a seeded generator. Two extractors
/// with the same seed and dimension produce identical embeddings.
///
/// Useful for dry runs without model weights and for testing everything
/// downstream of the model.
#[derive(Debug, Clone)]
pub struct ProjectionExtractor {
    identifier: String,
    /// `[D, 192]`
    weights: Array2<f32>,
}

impl ProjectionExtractor {
    /// Build a projection to `embedding_dim` dimensions from `seed`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(seed: u64, embedding_dim: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let scale = (POOLED_LEN as f32).sqrt();
        let weights = Array2::from_shape_fn((embedding_dim, POOLED_LEN), |_| {
            rng.random_range(-1.0_f32..1.0) / scale
        });
        Self {
            identifier: format!("projection_d{embedding_dim}_seed{seed}"),
            weights,
        }
    }

    /// Replace the recorded identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

impl FeatureExtractor for ProjectionExtractor {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn embedding_dim(&self) -> usize {
        self.weights.nrows()
    }

    fn extract(&self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, ExtractError> {
        let (n, channels, height, width) = batch.dim();
        if channels != 3 {
            return Err(ExtractError::Backend(format!(
                "expected 3 input channels, got {channels}"
            )));
        }

        let mut pooled = Array2::<f32>::zeros((n, POOLED_LEN));
        for (tile, mut row) in batch.axis_iter(Axis(0)).zip(pooled.rows_mut()) {
            let mut k = 0;
            for channel in tile.axis_iter(Axis(0)) {
                for gy in 0..POOL_GRID {
                    let (y0, y1) = span(gy, height);
                    for gx in 0..POOL_GRID {
                        let (x0, x1) = span(gx, width);
                        let cell = channel.slice(ndarray::s![y0..y1, x0..x1]);
                        row[k] = cell.mean().unwrap_or(0.0);
                        k += 1;
                    }
                }
            }
        }

        Ok(pooled.dot(&self.weights.t()))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn span(index: usize, extent: usize) -> (usize, usize) {
    let extent = u32::try_from(extent).unwrap_or(u32::MAX);
    let (start, end) = cell_span(index as u32, extent, POOL_GRID as u32);
    (start as usize, end as usize)
}
