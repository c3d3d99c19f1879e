//! Vegetation stress scoring
//!
//! Scores per-pixel deviation of each vegetation index from its healthy
//! threshold and blends the components into a combined stress score in
//! [0, 1]. Also produces the deviation-from-healthy grids written as the
//! change maps.

use rayon::prelude::*;

use fuelsight_core::raster::Raster;
use fuelsight_core::{Error, Result};

use crate::indices::{build_output, check_dimensions, NodataCheck};

/// Healthy-vegetation thresholds per index.
///
/// A pixel at or above the threshold carries zero stress; stress grows
/// linearly to 1 as the index falls to zero.
#[derive(Debug, Clone, Copy)]
pub struct StressThresholds {
    pub ndvi: f64,
    pub ndmi: f64,
    pub nbr: f64,
}

impl Default for StressThresholds {
    fn default() -> Self {
        Self {
            ndvi: 0.7,
            ndmi: 0.5,
            nbr: 0.6,
        }
    }
}

/// Blend weights for the combined stress score.
///
/// Must sum to 1: the combined score is a convex combination of bounded
/// components and therefore itself bounded in [0, 1].
#[derive(Debug, Clone, Copy)]
pub struct StressWeights {
    pub ndvi: f64,
    pub ndmi: f64,
    pub nbr: f64,
}

impl Default for StressWeights {
    fn default() -> Self {
        Self {
            ndvi: 0.40,
            ndmi: 0.35,
            nbr: 0.25,
        }
    }
}

impl StressWeights {
    /// Check the convexity invariant.
    pub fn validate(&self) -> Result<()> {
        let sum = self.ndvi + self.ndmi + self.nbr;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(Error::InvalidParameter {
                name: "stress weights",
                value: format!("{:.4} + {:.4} + {:.4} = {:.4}", self.ndvi, self.ndmi, self.nbr, sum),
                reason: "weights must sum to 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters for stress scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct StressParams {
    pub thresholds: StressThresholds,
    pub weights: StressWeights,
}

/// Per-pixel stress component for one index value.
///
/// `(threshold - value) / threshold` clipped to [0, 1] when `value > 0`,
/// zero otherwise. NaN stays NaN.
fn stress_component(value: f64, threshold: f64) -> f64 {
    if value.is_nan() {
        return f64::NAN;
    }
    if value > 0.0 {
        ((threshold - value) / threshold).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Stress of a single index grid against its healthy threshold.
pub fn index_stress(index: &Raster<f64>, threshold: f64) -> Result<Raster<f64>> {
    if threshold <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "threshold",
            value: threshold.to_string(),
            reason: "healthy threshold must be positive".to_string(),
        });
    }

    let (rows, cols) = index.shape();
    let nodata = index.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let v = unsafe { index.get_unchecked(row, col) };
                if v.is_nodata(nodata) {
                    continue;
                }
                row_data[col] = stress_component(v, threshold);
            }
            row_data
        })
        .collect();

    build_output(index, rows, cols, data)
}

/// Deviation of an index grid from its healthy threshold: `threshold - value`.
///
/// Positive values mean the pixel sits below healthy conditions. These are
/// the change maps consumed by the fuel-risk fuser.
pub fn deviation_from_healthy(index: &Raster<f64>, threshold: f64) -> Result<Raster<f64>> {
    let (rows, cols) = index.shape();
    let nodata = index.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let v = unsafe { index.get_unchecked(row, col) };
                if v.is_nodata(nodata) {
                    continue;
                }
                row_data[col] = threshold - v;
            }
            row_data
        })
        .collect();

    build_output(index, rows, cols, data)
}

/// Combined weighted stress score over the three index grids.
///
/// Any NaN input pixel produces a NaN output pixel; mismatched shapes fail
/// fast.
pub fn stress_score(
    ndvi: &Raster<f64>,
    ndmi: &Raster<f64>,
    nbr: &Raster<f64>,
    params: &StressParams,
) -> Result<Raster<f64>> {
    params.weights.validate()?;
    check_dimensions(ndvi, ndmi)?;
    check_dimensions(ndvi, nbr)?;

    let (rows, cols) = ndvi.shape();
    let nd_v = ndvi.nodata();
    let nd_m = ndmi.nodata();
    let nd_b = nbr.nodata();
    let t = params.thresholds;
    let w = params.weights;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let v = unsafe { ndvi.get_unchecked(row, col) };
                let m = unsafe { ndmi.get_unchecked(row, col) };
                let b = unsafe { nbr.get_unchecked(row, col) };

                if v.is_nodata(nd_v) || m.is_nodata(nd_m) || b.is_nodata(nd_b) {
                    continue;
                }

                row_data[col] = w.ndvi * stress_component(v, t.ndvi)
                    + w.ndmi * stress_component(m, t.ndmi)
                    + w.nbr * stress_component(b, t.nbr);
            }
            row_data
        })
        .collect();

    build_output(ndvi, rows, cols, data)
}

/// Full output of the stress stage: the combined score plus the three
/// deviation grids.
#[derive(Debug, Clone)]
pub struct StressProducts {
    pub stress: Raster<f64>,
    pub ndvi_deviation: Raster<f64>,
    pub ndmi_deviation: Raster<f64>,
    pub nbr_deviation: Raster<f64>,
}

/// Run the whole stress stage over the three index grids.
pub fn stress_products(
    ndvi: &Raster<f64>,
    ndmi: &Raster<f64>,
    nbr: &Raster<f64>,
    params: &StressParams,
) -> Result<StressProducts> {
    Ok(StressProducts {
        stress: stress_score(ndvi, ndmi, nbr, params)?,
        ndvi_deviation: deviation_from_healthy(ndvi, params.thresholds.ndvi)?,
        ndmi_deviation: deviation_from_healthy(ndmi, params.thresholds.ndmi)?,
        nbr_deviation: deviation_from_healthy(nbr, params.thresholds.nbr)?,
    })
}

/// Share of valid pixels in the high / moderate / low stress bands
/// (> 0.5, 0.3–0.5, <= 0.3).
#[derive(Debug, Clone, Copy)]
pub struct StressBreakdown {
    pub high_percent: f64,
    pub moderate_percent: f64,
    pub low_percent: f64,
    pub valid_count: usize,
}

/// Distribution of a stress grid over the reporting bands.
///
/// Non-finite pixels are excluded from the denominator.
pub fn stress_breakdown(stress: &Raster<f64>) -> StressBreakdown {
    let mut high = 0usize;
    let mut moderate = 0usize;
    let mut low = 0usize;

    for &v in stress.data().iter() {
        if !v.is_finite() {
            continue;
        }
        if v > 0.5 {
            high += 1;
        } else if v > 0.3 {
            moderate += 1;
        } else {
            low += 1;
        }
    }

    let valid = high + moderate + low;
    let pct = |n: usize| {
        if valid == 0 {
            0.0
        } else {
            n as f64 / valid as f64 * 100.0
        }
    };

    StressBreakdown {
        high_percent: pct(high),
        moderate_percent: pct(moderate),
        low_percent: pct(low),
        valid_count: valid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fuelsight_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn component_formula() {
        // (0.7 - 0.35) / 0.7 = 0.5
        assert_relative_eq!(stress_component(0.35, 0.7), 0.5, epsilon = 1e-12);
        // At or above threshold: no stress
        assert_relative_eq!(stress_component(0.7, 0.7), 0.0, epsilon = 1e-12);
        assert_relative_eq!(stress_component(0.9, 0.7), 0.0, epsilon = 1e-12);
        // Non-positive index: defined as zero stress
        assert_relative_eq!(stress_component(0.0, 0.7), 0.0, epsilon = 1e-12);
        assert_relative_eq!(stress_component(-0.3, 0.7), 0.0, epsilon = 1e-12);
        // NaN stays NaN
        assert!(stress_component(f64::NAN, 0.7).is_nan());
    }

    #[test]
    fn component_clipped_to_unit_interval() {
        for v in [-1.0, -0.01, 0.001, 0.2, 0.5, 0.69, 0.7, 0.95, 1.0] {
            let s = stress_component(v, 0.7);
            assert!((0.0..=1.0).contains(&s), "stress {} out of [0,1] for {}", s, v);
        }
    }

    #[test]
    fn combined_score_known_value() {
        let ndvi = make_band(4, 4, 0.35); // stress 0.5
        let ndmi = make_band(4, 4, 0.25); // (0.5-0.25)/0.5 = 0.5
        let nbr = make_band(4, 4, 0.30); // (0.6-0.3)/0.6 = 0.5

        let result = stress_score(&ndvi, &ndmi, &nbr, &StressParams::default()).unwrap();
        // All components 0.5, convex weights → 0.5
        assert_relative_eq!(result.get(1, 1).unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn combined_score_bounded() {
        // Extreme inputs still land in [0, 1]
        let ndvi = make_band(3, 3, -0.9);
        let ndmi = make_band(3, 3, 0.01);
        let nbr = make_band(3, 3, 0.01);

        let result = stress_score(&ndvi, &ndmi, &nbr, &StressParams::default()).unwrap();
        let v = result.get(0, 0).unwrap();
        assert!((0.0..=1.0).contains(&v));
    }

    #[test]
    fn nan_input_propagates() {
        let mut ndvi = make_band(3, 3, 0.4);
        ndvi.set(1, 1, f64::NAN).unwrap();
        let ndmi = make_band(3, 3, 0.4);
        let nbr = make_band(3, 3, 0.4);

        let result = stress_score(&ndvi, &ndmi, &nbr, &StressParams::default()).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
        assert!(!result.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn all_nan_in_all_nan_out() {
        let ndvi = make_band(2, 2, f64::NAN);
        let ndmi = make_band(2, 2, f64::NAN);
        let nbr = make_band(2, 2, f64::NAN);

        let result = stress_score(&ndvi, &ndmi, &nbr, &StressParams::default()).unwrap();
        assert!(result.data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn invalid_weights_rejected() {
        let params = StressParams {
            weights: StressWeights {
                ndvi: 0.5,
                ndmi: 0.5,
                nbr: 0.5,
            },
            ..Default::default()
        };
        let band = make_band(2, 2, 0.4);
        assert!(stress_score(&band, &band, &band, &params).is_err());
    }

    #[test]
    fn shape_mismatch_fails_fast() {
        let a = make_band(4, 4, 0.4);
        let b = make_band(4, 5, 0.4);
        assert!(stress_score(&a, &b, &a, &StressParams::default()).is_err());
    }

    #[test]
    fn deviation_grid() {
        let ndvi = make_band(2, 2, 0.55);
        let dev = deviation_from_healthy(&ndvi, 0.7).unwrap();
        assert_relative_eq!(dev.get(0, 0).unwrap(), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn breakdown_excludes_nan() {
        let mut stress = make_band(2, 2, 0.6);
        stress.set(0, 0, 0.2).unwrap();
        stress.set(0, 1, 0.4).unwrap();
        stress.set(1, 1, f64::NAN).unwrap();

        let b = stress_breakdown(&stress);
        assert_eq!(b.valid_count, 3);
        assert_relative_eq!(b.high_percent, 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(b.moderate_percent, 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(b.low_percent, 100.0 / 3.0, epsilon = 1e-9);
    }
}
