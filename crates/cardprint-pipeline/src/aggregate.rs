//! Embedding aggregation: one batched extractor call per card, reduced
//! to a double-precision centroid.

use ndarray::ArrayView2;

use crate::extractor::{ExtractError, FeatureExtractor};
use crate::tensor::to_input_tensor;
use crate::types::{PipelineError, RgbImage};

/// Element-wise mean of the rows of `embeddings`, accumulated in `f64`.
///
/// The centroid is not normalized.
///
/// # Errors
///
/// Returns [`ExtractError::Shape`] if there are no rows, and
/// [`ExtractError::NonFinite`] if any value is NaN or infinite.
#[allow(clippy::cast_precision_loss)]
pub fn centroid(embeddings: ArrayView2<'_, f32>) -> Result<Vec<f64>, ExtractError> {
    let (rows, cols) = embeddings.dim();
    if rows == 0 {
        return Err(ExtractError::Shape {
            rows: 1,
            cols,
            actual: vec![rows, cols],
        });
    }

    let mut sums = vec![0.0_f64; cols];
    for (view, row) in embeddings.rows().into_iter().enumerate() {
        for (dimension, (sum, &value)) in sums.iter_mut().zip(row.iter()).enumerate() {
            if !value.is_finite() {
                return Err(ExtractError::NonFinite { view, dimension });
            }
            *sum += f64::from(value);
        }
    }

    let n = rows as f64;
    Ok(sums.into_iter().map(|s| s / n).collect())
}

/// Embed every view with a single extractor call and return the centroid.
///
/// # Errors
///
/// Returns [`PipelineError::TileSize`] if a view is not `size`×`size`,
/// and [`PipelineError::Extraction`] if the extractor fails or returns
/// anything other than one finite row of `embedding_dim` values per view.
pub fn embed<E: FeatureExtractor + ?Sized>(
    views: &[RgbImage],
    extractor: &E,
    size: u32,
) -> Result<Vec<f64>, PipelineError> {
    let input = to_input_tensor(views, size)?;
    let output = extractor.extract(input.view())?;

    let expected = (views.len(), extractor.embedding_dim());
    if output.dim() != expected {
        return Err(ExtractError::Shape {
            rows: expected.0,
            cols: expected.1,
            actual: output.shape().to_vec(),
        }
        .into());
    }

    Ok(centroid(output.view())?)
}
