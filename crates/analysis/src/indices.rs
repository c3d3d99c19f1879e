//! Spectral vegetation and moisture indices
//!
//! Normalized-difference indices computed from single-band reflectance
//! rasters. The fuel pipeline consumes three of them: NDVI for greenness,
//! NBR for burn/fuel condition, NDMI for canopy moisture.

use ndarray::Array2;
use rayon::prelude::*;

use fuelsight_core::raster::Raster;
use fuelsight_core::{Error, Result};

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where the denominator vanishes
/// or either input is nodata are set to NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if a.is_nodata(nodata_a) || b.is_nodata(nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Dense vegetation sits around 0.6–0.9, bare soil near 0.1–0.2, water
/// below zero.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Burn Ratio
///
/// `NBR = (NIR - SWIR2) / (NIR + SWIR2)`
///
/// Sensitive to burned vegetation and char; low values indicate burned or
/// fuel-depleted areas.
pub fn nbr(nir: &Raster<f64>, swir2: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, swir2)
}

/// Normalized Difference Moisture Index
///
/// `NDMI = (NIR - SWIR1) / (NIR + SWIR1)`
///
/// Canopy moisture proxy; low values indicate dry, fire-prone vegetation.
pub fn ndmi(nir: &Raster<f64>, swir1: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, swir1)
}

// ---------------------------------------------------------------------------
// Shared helpers for elementwise kernels in this crate
// ---------------------------------------------------------------------------

pub(crate) trait NodataCheck {
    fn is_nodata(self, nodata: Option<f64>) -> bool;
}

impl NodataCheck for f64 {
    fn is_nodata(self, nodata: Option<f64>) -> bool {
        if self.is_nan() {
            return true;
        }
        match nodata {
            Some(nd) => (self - nd).abs() < f64::EPSILON,
            None => false,
        }
    }
}

pub(crate) fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

pub(crate) fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fuelsight_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn ndvi_vegetation() {
        let nir = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        let val = result.get(2, 2).unwrap();

        let expected = (0.5 - 0.1) / (0.5 + 0.1);
        assert!(
            (val - expected).abs() < 1e-10,
            "Expected {}, got {}",
            expected,
            val
        );
    }

    #[test]
    fn ndvi_water_is_negative() {
        let nir = make_band(5, 5, 0.05);
        let red = make_band(5, 5, 0.15);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(2, 2).unwrap() < 0.0);
    }

    #[test]
    fn nbr_and_ndmi() {
        let nir = make_band(3, 3, 0.6);
        let swir1 = make_band(3, 3, 0.3);
        let swir2 = make_band(3, 3, 0.2);

        let moisture = ndmi(&nir, &swir1).unwrap();
        let burn = nbr(&nir, &swir2).unwrap();

        assert!((moisture.get(1, 1).unwrap() - (0.3 / 0.9)).abs() < 1e-10);
        assert!((burn.get(1, 1).unwrap() - (0.4 / 0.8)).abs() < 1e-10);
    }

    #[test]
    fn nodata_propagates() {
        let mut nir = make_band(5, 5, 0.5);
        nir.set_nodata(Some(-9999.0));
        nir.set(2, 2, -9999.0).unwrap();

        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
    }

    #[test]
    fn zero_denominator_is_nan() {
        let nir = make_band(3, 3, 0.0);
        let red = make_band(3, 3, 0.0);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn dimension_mismatch_fails() {
        let a = make_band(5, 5, 1.0);
        let b = make_band(5, 10, 1.0);

        assert!(normalized_difference(&a, &b).is_err());
    }
}
