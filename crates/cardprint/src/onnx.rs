//! Frozen ONNX export of the embedding model, evaluated with tract.

use std::path::Path;

use cardprint_pipeline::ndarray::{Array2, ArrayView4};
use cardprint_pipeline::{ExtractError, FeatureExtractor};
use tract_onnx::prelude::*;

use crate::error::CliError;

/// Identifier recorded for embeddings of the exported reference model.
pub const DEFAULT_MODEL_ID: &str = "mobilenet_v3_large_100_224";

/// Extractor backed by an ONNX model with a fixed `[batch, 3, size, size]`
/// input and a `[batch, dim]` (or `[batch, dim, 1, 1]`) output.
pub struct OnnxExtractor {
    identifier: String,
    embedding_dim: usize,
    input_shape: [usize; 4],
    model: TypedRunnableModel<TypedModel>,
}

impl OnnxExtractor {
    /// Load and optimize the model at `path` for batches of `batch` tiles
    /// of `size`×`size` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Extractor`] if the model cannot be loaded or
    /// does not accept the input shape.
    pub fn load(
        path: &Path,
        identifier: impl Into<String>,
        embedding_dim: usize,
        batch: usize,
        size: u32,
    ) -> Result<Self, CliError> {
        let setup = |e: TractError| CliError::Extractor(format!("{}: {e}", path.display()));
        let side = size as usize;
        let input_shape = [batch, 3, side, side];
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(setup)?
            .with_input_fact(0, f32::fact(input_shape).into())
            .map_err(setup)?
            .into_optimized()
            .map_err(setup)?
            .into_runnable()
            .map_err(setup)?;
        Ok(Self {
            identifier: identifier.into(),
            embedding_dim,
            input_shape,
            model,
        })
    }
}

impl FeatureExtractor for OnnxExtractor {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn extract(&self, batch: ArrayView4<'_, f32>) -> Result<Array2<f32>, ExtractError> {
        let backend = |e: TractError| ExtractError::Backend(e.to_string());
        if batch.shape() != self.input_shape.as_slice() {
            return Err(ExtractError::Backend(format!(
                "model compiled for input {:?}, got {:?}",
                self.input_shape,
                batch.shape()
            )));
        }
        let contiguous = batch.as_standard_layout();
        let data = contiguous
            .as_slice()
            .ok_or_else(|| ExtractError::Backend("input tensor is not contiguous".to_owned()))?;
        let input = Tensor::from_shape(&self.input_shape, data).map_err(backend)?;

        let outputs = self.model.run(tvec![input.into()]).map_err(backend)?;
        let output = outputs
            .first()
            .ok_or_else(|| ExtractError::Backend("model produced no outputs".to_owned()))?;

        let shape = output.shape().to_vec();
        let rows = self.input_shape[0];
        let features: usize = shape.iter().skip(1).product();
        if shape.first() != Some(&rows) || features != self.embedding_dim {
            return Err(ExtractError::Shape {
                rows,
                cols: self.embedding_dim,
                actual: shape,
            });
        }
        let values = output.as_slice::<f32>().map_err(backend)?;
        Array2::from_shape_vec((rows, features), values.to_vec())
            .map_err(|e| ExtractError::Backend(e.to_string()))
    }
}
