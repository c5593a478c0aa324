//! Spatial color descriptor.
//!
//! Partitions the (unletterboxed) artwork into a 12×12 grid, takes the
//! mean of each RGB channel per cell, then mean-centers and L2-normalizes
//! the resulting 432-vector.
//!
//! Cell edges are computed independently per cell from a fractional cell
//! size and truncated to integer pixels, so neighbouring cells may differ
//! in size by one pixel. The deployed matching client partitions the same
//! way; equalizing the cells would break matching against it.

use crate::types::RgbImage;

/// Number of grid columns.
pub const GRID_COLS: u32 = 12;

/// Number of grid rows.
pub const GRID_ROWS: u32 = 12;

/// Descriptor length: one mean per channel per cell.
pub const SPATIAL_LEN: usize = (GRID_COLS * GRID_ROWS * 3) as usize;

/// Pixel span `[start, end)` of cell `index` along an axis of `extent`
/// pixels split into `cells` cells.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cell_span(index: u32, extent: u32, cells: u32) -> (u32, u32) {
    let size = f64::from(extent) / f64::from(cells);
    let start = (f64::from(index) * size) as u32;
    let end = ((f64::from(index + 1) * size) as u32).min(extent);
    (start, end)
}

/// Per-cell channel means scaled to `[0, 1]`, before centering.
///
/// Values are laid out row-major: grid row, then column, then R, G, B.
/// Cells that cover no pixels (images narrower than the grid) are zero.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn cell_means(image: &RgbImage) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let mut means = vec![0.0_f32; SPATIAL_LEN];

    for gy in 0..GRID_ROWS {
        let (y0, y1) = cell_span(gy, height, GRID_ROWS);
        for gx in 0..GRID_COLS {
            let (x0, x1) = cell_span(gx, width, GRID_COLS);
            let count = u64::from(x1.saturating_sub(x0)) * u64::from(y1.saturating_sub(y0));
            if count == 0 {
                continue;
            }

            let mut sums = [0_u64; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = image.get_pixel(x, y).0;
                    for (sum, &channel) in sums.iter_mut().zip(&p) {
                        *sum += u64::from(channel);
                    }
                }
            }

            let offset = ((gy * GRID_COLS + gx) * 3) as usize;
            for (c, sum) in sums.iter().enumerate() {
                let mean = (*sum as f64 / count as f64) as f32;
                means[offset + c] = mean / 255.0;
            }
        }
    }

    means
}

/// Compute the spatial color descriptor of an image.
///
/// Returns [`SPATIAL_LEN`] values with unit L2 norm, or all zeros when
/// the centered vector has zero norm (e.g. a uniformly colored image).
#[must_use]
pub fn spatial_descriptor(image: &RgbImage) -> Vec<f32> {
    center_and_normalize(cell_means(image))
}

/// Subtract the global mean, then divide by the L2 norm.
///
/// A zero norm leaves the centered vector (all zeros) instead of producing
/// NaNs.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn center_and_normalize(mut values: Vec<f32>) -> Vec<f32> {
    if values.is_empty() {
        return values;
    }

    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
    let mean = mean as f32;
    for v in &mut values {
        *v -= mean;
    }

    let norm = values
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt() as f32;
    if norm > 0.0 {
        for v in &mut values {
            *v /= norm;
        }
    }
    values
}
