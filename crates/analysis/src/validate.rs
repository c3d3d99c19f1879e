//! Validation against observed burn severity
//!
//! Compares two competing fuel predictors (static baseline vs enhanced
//! risk) against ground-truth dNBR over one shared grid, reporting Pearson
//! correlation, r², and the improvement of the enhanced map over the
//! baseline.

use serde::Serialize;
use tracing::warn;

use fuelsight_core::raster::Raster;
use fuelsight_core::Result;

use crate::correlation::pearson;
use crate::indices::check_dimensions;
use crate::severity::BurnSeverity;

/// Fewer valid pixels than this makes the correlation statistically
/// meaningless; the report is flagged rather than rejected.
pub const MIN_VALID_SAMPLES: usize = 100;

/// Ground-truth dNBR outside this open interval is treated as an
/// instrument artifact and excluded.
pub const DNBR_VALID_RANGE: (f64, f64) = (-0.5, 2.0);

/// Parameters for validation.
#[derive(Debug, Clone, Copy)]
pub struct ValidationParams {
    /// Open interval of acceptable ground-truth values
    pub truth_bounds: (f64, f64),
    /// Below this many valid pixels the report is flagged unreliable
    pub min_samples: usize,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            truth_bounds: DNBR_VALID_RANGE,
            min_samples: MIN_VALID_SAMPLES,
        }
    }
}

/// Correlation of one predictor against the ground truth.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PredictorScore {
    pub pearson_r: f64,
    pub r_squared: f64,
    pub p_value: f64,
}

/// Mean predictor values over one observed severity class.
#[derive(Debug, Clone, Serialize)]
pub struct ClassMeans {
    pub class: u8,
    pub label: &'static str,
    pub count: usize,
    pub baseline_mean: f64,
    pub enhanced_mean: f64,
}

/// Full validation report, written as the validation-stage JSON sidecar.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub baseline: PredictorScore,
    pub enhanced: PredictorScore,
    /// r²_enhanced − r²_baseline
    pub absolute_improvement: f64,
    /// Relative r² improvement in percent; 0 when the baseline r² is 0
    pub relative_improvement_percent: f64,
    pub sample_size: usize,
    /// False when fewer than `min_samples` pixels survived the mask
    pub reliable: bool,
    pub by_class: Option<Vec<ClassMeans>>,
}

/// Validate two predictors against ground-truth dNBR.
///
/// All rasters must already share one grid. The validity mask keeps pixels
/// finite in all three grids with truth inside the configured bounds;
/// everything else (nodata, instrument artifacts) is excluded. The optional
/// class grid stratifies predictor means by observed severity.
pub fn validate(
    baseline: &Raster<f64>,
    enhanced: &Raster<f64>,
    truth: &Raster<f64>,
    classes: Option<&Raster<u8>>,
    params: &ValidationParams,
) -> Result<ValidationReport> {
    check_dimensions(baseline, enhanced)?;
    check_dimensions(baseline, truth)?;
    if let Some(cls) = classes {
        if cls.shape() != baseline.shape() {
            return Err(fuelsight_core::Error::SizeMismatch {
                er: baseline.rows(),
                ec: baseline.cols(),
                ar: cls.rows(),
                ac: cls.cols(),
            });
        }
    }

    let (lo, hi) = params.truth_bounds;
    let n_cells = baseline.len();

    let mut baseline_valid = Vec::with_capacity(n_cells);
    let mut enhanced_valid = Vec::with_capacity(n_cells);
    let mut truth_valid = Vec::with_capacity(n_cells);
    let mut class_valid: Vec<u8> = Vec::new();

    let flat_b = baseline.data();
    let flat_e = enhanced.data();
    let flat_t = truth.data();

    for (idx, ((&b, &e), &t)) in flat_b.iter().zip(flat_e.iter()).zip(flat_t.iter()).enumerate() {
        let keep = b.is_finite() && e.is_finite() && t.is_finite() && t > lo && t < hi;
        if !keep {
            continue;
        }
        baseline_valid.push(b);
        enhanced_valid.push(e);
        truth_valid.push(t);
        if let Some(cls) = classes {
            let (row, col) = (idx / cls.cols(), idx % cls.cols());
            class_valid.push(unsafe { cls.get_unchecked(row, col) });
        }
    }

    let sample_size = truth_valid.len();
    let reliable = sample_size >= params.min_samples;
    if !reliable {
        warn!(
            samples = sample_size,
            minimum = params.min_samples,
            "valid pixel count below the reliability floor; correlation is not meaningful"
        );
    }

    let score_b = pearson(&baseline_valid, &truth_valid)?;
    let score_e = pearson(&enhanced_valid, &truth_valid)?;

    let r2_b = score_b.r_squared();
    let r2_e = score_e.r_squared();
    let absolute = r2_e - r2_b;
    // The baseline can be entirely uncorrelated; a zero r² must not divide.
    let relative = if r2_b > 0.0 {
        absolute / r2_b * 100.0
    } else {
        0.0
    };

    let by_class = classes.map(|_| stratify(&baseline_valid, &enhanced_valid, &class_valid));

    Ok(ValidationReport {
        baseline: PredictorScore {
            pearson_r: score_b.r,
            r_squared: r2_b,
            p_value: score_b.p_value,
        },
        enhanced: PredictorScore {
            pearson_r: score_e.r,
            r_squared: r2_e,
            p_value: score_e.p_value,
        },
        absolute_improvement: absolute,
        relative_improvement_percent: relative,
        sample_size,
        reliable,
        by_class,
    })
}

/// Per-class means of both predictors over the masked subset.
fn stratify(baseline: &[f64], enhanced: &[f64], classes: &[u8]) -> Vec<ClassMeans> {
    BurnSeverity::ALL
        .iter()
        .filter_map(|&severity| {
            let code = severity.code();
            let mut count = 0usize;
            let mut sum_b = 0.0;
            let mut sum_e = 0.0;
            for i in 0..classes.len() {
                if classes[i] == code {
                    count += 1;
                    sum_b += baseline[i];
                    sum_e += enhanced[i];
                }
            }
            if count == 0 {
                return None;
            }
            Some(ClassMeans {
                class: code,
                label: severity.label(),
                count,
                baseline_mean: sum_b / count as f64,
                enhanced_mean: sum_e / count as f64,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fuelsight_core::GeoTransform;

    fn raster_from(values: Vec<f64>, rows: usize, cols: usize) -> Raster<f64> {
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    fn relaxed_params() -> ValidationParams {
        ValidationParams {
            min_samples: 4,
            ..Default::default()
        }
    }

    #[test]
    fn truth_outliers_are_excluded() {
        // Truth [-1, 0.5, 1.0, 5.0]: only indices 1 and 2 are inside the
        // (-0.5, 2.0) window. Pad with in-range pixels so Pearson has
        // enough samples, then check the sample size arithmetic.
        let truth = raster_from(vec![-1.0, 0.5, 1.0, 5.0, 0.2, 0.3, 0.4, 0.6], 2, 4);
        let baseline = raster_from(vec![1.0, 2.0, 3.0, 4.0, 1.5, 2.5, 3.5, 4.5], 2, 4);
        let enhanced = raster_from(vec![4.0, 3.0, 2.0, 1.0, 4.5, 3.5, 2.5, 1.5], 2, 4);

        let report = validate(&baseline, &enhanced, &truth, None, &relaxed_params()).unwrap();
        // 8 pixels, two excluded as outliers
        assert_eq!(report.sample_size, 6);
    }

    #[test]
    fn nonfinite_pixels_are_excluded() {
        let truth = raster_from(vec![0.2, f64::NAN, 0.4, 0.6, 0.8, 0.1], 2, 3);
        let baseline = raster_from(vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0], 2, 3);
        let enhanced = raster_from(vec![1.0, 2.0, 3.0, 4.0, 5.0, 0.5], 2, 3);

        let report = validate(&baseline, &enhanced, &truth, None, &relaxed_params()).unwrap();
        assert_eq!(report.sample_size, 4);
    }

    #[test]
    fn perfect_enhanced_vs_orthogonal_baseline() {
        // Baseline has zero covariance with truth (r² = 0); enhanced equals
        // truth exactly (r² = 1). Absolute improvement is a full unit of
        // r² and the relative improvement guard must not divide by zero.
        let truth = raster_from(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8], 2, 4);
        let baseline = raster_from(vec![1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0], 2, 4);
        let enhanced = truth.clone();

        let report = validate(&baseline, &enhanced, &truth, None, &relaxed_params()).unwrap();

        assert_relative_eq!(report.baseline.r_squared, 0.0, epsilon = 1e-20);
        assert_relative_eq!(report.enhanced.r_squared, 1.0, epsilon = 1e-12);
        assert_relative_eq!(report.absolute_improvement, 1.0, epsilon = 1e-12);
        assert!(report.relative_improvement_percent.is_finite());
    }

    #[test]
    fn low_sample_count_is_flagged_not_fatal() {
        let truth = raster_from(vec![0.1, 0.2, 0.3, 0.4], 2, 2);
        let baseline = raster_from(vec![1.0, 2.0, 3.0, 3.5], 2, 2);
        let enhanced = raster_from(vec![0.1, 0.2, 0.3, 0.4], 2, 2);

        let report =
            validate(&baseline, &enhanced, &truth, None, &ValidationParams::default()).unwrap();
        assert!(!report.reliable);
        assert_eq!(report.sample_size, 4);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let truth = raster_from(vec![0.1, 0.2, 0.3, 0.4], 2, 2);
        let baseline = raster_from(vec![1.0; 6], 2, 3);
        let enhanced = raster_from(vec![1.0, 2.0, 3.0, 4.0], 2, 2);

        assert!(validate(&baseline, &enhanced, &truth, None, &relaxed_params()).is_err());
    }

    #[test]
    fn stratification_reports_class_means() {
        let truth = raster_from(vec![0.0, 0.05, 0.5, 0.55, 0.9, 1.0], 2, 3);
        let baseline = raster_from(vec![1.0, 2.0, 5.0, 6.0, 9.0, 10.0], 2, 3);
        let enhanced = raster_from(vec![0.0, 1.0, 50.0, 60.0, 90.0, 100.0], 2, 3);

        let mut classes: Raster<u8> = Raster::new(2, 3);
        for (i, c) in [0u8, 0, 3, 3, 4, 4].iter().enumerate() {
            classes.set(i / 3, i % 3, *c).unwrap();
        }

        let report = validate(
            &baseline,
            &enhanced,
            &truth,
            Some(&classes),
            &relaxed_params(),
        )
        .unwrap();

        let by_class = report.by_class.unwrap();
        assert_eq!(by_class.len(), 3);

        let unburned = &by_class[0];
        assert_eq!(unburned.class, 0);
        assert_eq!(unburned.count, 2);
        assert_relative_eq!(unburned.baseline_mean, 1.5, epsilon = 1e-12);
        assert_relative_eq!(unburned.enhanced_mean, 0.5, epsilon = 1e-12);

        let high = &by_class[2];
        assert_eq!(high.class, 4);
        assert_relative_eq!(high.enhanced_mean, 95.0, epsilon = 1e-12);
    }

    #[test]
    fn enhanced_beats_baseline_scenario() {
        // Noisy baseline, exact enhanced: relative improvement is positive.
        let truth_vals: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let baseline_vals: Vec<f64> = truth_vals
            .iter()
            .enumerate()
            .map(|(i, v)| v + if i % 2 == 0 { 0.4 } else { -0.4 })
            .collect();

        let truth = raster_from(truth_vals.clone(), 10, 10);
        let baseline = raster_from(baseline_vals, 10, 10);
        let enhanced = raster_from(truth_vals, 10, 10);

        let report =
            validate(&baseline, &enhanced, &truth, None, &ValidationParams::default()).unwrap();
        assert!(report.reliable);
        assert!(report.enhanced.r_squared > report.baseline.r_squared);
        assert!(report.relative_improvement_percent > 0.0);
        assert!(report.absolute_improvement > 0.0);
    }
}
