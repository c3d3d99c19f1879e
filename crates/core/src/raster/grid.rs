//! Georeferenced raster grid

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::Array2;

/// A 2-D grid of cell values with the georeferencing metadata needed to
/// combine it with other grids: an affine transform, an optional CRS and
/// an optional nodata value.
///
/// Every product of the fuel pipeline is one of these — reflectance bands,
/// index grids, stress and risk scores as `Raster<f64>`, classified burn
/// severity as `Raster<u8>`, fuel-model codes as `Raster<i16>`.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<Crs>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Zero-filled grid with default (identity-like) georeferencing.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_parts(Array2::zeros((rows, cols)))
    }

    /// Grid with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_parts(Array2::from_elem((rows, cols), value))
    }

    /// Grid from a flat row-major vector. The length must be `rows * cols`.
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_parts(array))
    }

    fn from_parts(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Zeroed grid of a possibly different cell type on this raster's frame.
    ///
    /// Derived products (a `u8` class grid from an `f64` dNBR grid, say)
    /// keep the parent's transform and CRS but not its nodata value.
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: None,
        }
    }

    // ── Dimensions ──────────────────────────────────────────────────────

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total cell count
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // ── Cell access ─────────────────────────────────────────────────────

    /// Value at `(row, col)`, bounds-checked.
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Value at `(row, col)` without bounds checking.
    ///
    /// # Safety
    /// `row < self.rows()` and `col < self.cols()` must hold. The
    /// elementwise kernels use this inside loops that already iterate the
    /// grid's own shape.
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Store `value` at `(row, col)`, bounds-checked.
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// The underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// The underlying array, mutably
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // ── Georeferencing ──────────────────────────────────────────────────

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size in map units (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Footprint as `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Fractional pixel coordinates `(col, row)` of a map point
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    /// Whether `value` counts as nodata for this grid
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    // ── Statistics ──────────────────────────────────────────────────────

    /// Nodata-aware summary statistics.
    ///
    /// Min, max, mean, population standard deviation and valid-cell count,
    /// skipping nodata cells. These feed the JSON sidecars written next to
    /// each stage's outputs.
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        let mut count = 0usize;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }
            match min {
                Some(m) if value >= m => {}
                _ => min = Some(value),
            }
            match max {
                Some(m) if value <= m => {}
                _ => max = Some(value),
            }
            if let Some(v) = value.to_f64() {
                sum += v;
                sum_sq += v * v;
                count += 1;
            }
        }

        let (mean, std_dev) = if count > 0 {
            let m = sum / count as f64;
            let var = (sum_sq / count as f64 - m * m).max(0.0);
            (Some(m), Some(var.sqrt()))
        } else {
            (None, None)
        };

        RasterStatistics {
            min,
            max,
            mean,
            std_dev,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Summary statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn creation_and_shape() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn get_set() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
    }

    #[test]
    fn derived_grid_keeps_frame() {
        let mut raster: Raster<f64> = Raster::new(4, 6);
        raster.set_transform(GeoTransform::new(400_000.0, 3_970_000.0, 30.0, -30.0));
        raster.set_crs(Some(Crs::from_epsg(32613)));
        raster.set_nodata(Some(f64::NAN));

        let derived: Raster<u8> = raster.with_same_meta(4, 6);
        assert_eq!(derived.transform(), raster.transform());
        assert_eq!(derived.crs(), raster.crs());
        assert_eq!(derived.nodata(), None);
    }

    #[test]
    fn statistics_skip_nan() {
        let mut raster: Raster<f64> = Raster::filled(4, 4, 2.0);
        raster.set(0, 0, f64::NAN).unwrap();
        raster.set(3, 3, 6.0).unwrap();
        raster.set_nodata(Some(f64::NAN));

        let stats = raster.statistics();
        assert_eq!(stats.valid_count, 15);
        assert_eq!(stats.nodata_count, 1);
        assert_eq!(stats.min, Some(2.0));
        assert_eq!(stats.max, Some(6.0));
        let mean = (14.0 * 2.0 + 6.0) / 15.0;
        assert_relative_eq!(stats.mean.unwrap(), mean, epsilon = 1e-12);
    }

    #[test]
    fn statistics_std_dev_constant() {
        let raster: Raster<f64> = Raster::filled(5, 5, 7.0);
        let stats = raster.statistics();
        assert_relative_eq!(stats.std_dev.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn from_vec_rejects_bad_length() {
        let result: Result<Raster<f64>> = Raster::from_vec(vec![1.0; 5], 2, 3);
        assert!(result.is_err());
    }
}
