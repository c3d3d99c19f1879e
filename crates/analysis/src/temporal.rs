//! Temporal change layers
//!
//! Differences between two acquisitions of the same index, the
//! vegetation-loss mask derived from them, and the combined change
//! magnitude used to flag areas where fuel conditions moved.

use rayon::prelude::*;

use fuelsight_core::raster::Raster;
use fuelsight_core::Result;

use crate::indices::{build_output, check_dimensions};

/// Elementwise temporal difference: `after - before`.
///
/// NaN in either input produces NaN.
pub fn temporal_difference(before: &Raster<f64>, after: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(before, after)?;

    let (rows, cols) = before.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let b = unsafe { before.get_unchecked(row, col) };
                let a = unsafe { after.get_unchecked(row, col) };
                if b.is_nan() || a.is_nan() {
                    continue;
                }
                row_data[col] = a - b;
            }
            row_data
        })
        .collect();

    build_output(before, rows, cols, data)
}

/// Parameters for the vegetation-loss mask.
#[derive(Debug, Clone, Copy)]
pub struct LossMaskParams {
    /// NDVI change below this flags loss
    pub ndvi_loss: f64,
    /// NBR change below this flags loss
    pub nbr_loss: f64,
}

impl Default for LossMaskParams {
    fn default() -> Self {
        Self {
            ndvi_loss: -0.1,
            nbr_loss: -0.1,
        }
    }
}

/// Mask of pixels where either index declined past its loss threshold.
///
/// Output is 1 where fuel conditions likely worsened, 0 elsewhere; pixels
/// with NaN in both inputs are 0.
pub fn vegetation_loss_mask(
    ndvi_change: &Raster<f64>,
    nbr_change: &Raster<f64>,
    params: LossMaskParams,
) -> Result<Raster<u8>> {
    check_dimensions(ndvi_change, nbr_change)?;

    let (rows, cols) = ndvi_change.shape();
    let mut mask = ndvi_change.with_same_meta::<u8>(rows, cols);

    for row in 0..rows {
        for col in 0..cols {
            let dv = unsafe { ndvi_change.get_unchecked(row, col) };
            let db = unsafe { nbr_change.get_unchecked(row, col) };
            let lost = dv < params.ndvi_loss || db < params.nbr_loss;
            if lost {
                mask.set(row, col, 1)?;
            }
        }
    }

    Ok(mask)
}

/// Combined change magnitude: `|ndvi_change| + |nbr_change|`.
pub fn change_magnitude(
    ndvi_change: &Raster<f64>,
    nbr_change: &Raster<f64>,
) -> Result<Raster<f64>> {
    check_dimensions(ndvi_change, nbr_change)?;

    let (rows, cols) = ndvi_change.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let dv = unsafe { ndvi_change.get_unchecked(row, col) };
                let db = unsafe { nbr_change.get_unchecked(row, col) };
                if dv.is_nan() || db.is_nan() {
                    continue;
                }
                row_data[col] = dv.abs() + db.abs();
            }
            row_data
        })
        .collect();

    build_output(ndvi_change, rows, cols, data)
}
