//! Conversion of rendered tiles into the extractor's input tensor.

use ndarray::{Array4, s};

use crate::types::{PipelineError, RgbImage};

/// Per-channel mean of the extractor's training data (RGB).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviation of the extractor's training data (RGB).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Stack `size`×`size` tiles into an `[N, 3, size, size]` tensor.
///
/// Each channel value becomes `(v / 255 - mean) / std`.
///
/// # Errors
///
/// Returns [`PipelineError::TileSize`] if any tile is not `size`×`size`.
pub fn to_input_tensor(tiles: &[RgbImage], size: u32) -> Result<Array4<f32>, PipelineError> {
    if let Some(bad) = tiles.iter().find(|t| t.dimensions() != (size, size)) {
        return Err(PipelineError::TileSize {
            expected: size,
            width: bad.width(),
            height: bad.height(),
        });
    }

    let side = size as usize;
    let mut batch = Array4::<f32>::zeros((tiles.len(), 3, side, side));
    for (i, tile) in tiles.iter().enumerate() {
        let mut slot = batch.slice_mut(s![i, .., .., ..]);
        for (x, y, pixel) in tile.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let v = f32::from(pixel.0[c]) / 255.0;
                slot[[c, y, x]] = (v - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            }
        }
    }
    Ok(batch)
}
