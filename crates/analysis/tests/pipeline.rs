//! End-to-end run of the analysis stages over a synthetic fire scene.
//!
//! A 12x12 "satellite" grid carries a west-to-east stress gradient and a
//! burn whose severity follows the same gradient; the "baseline" fuel grid
//! varies north-to-south and is therefore nearly uncorrelated with the
//! burn. The enhanced risk map has to beat it.

use approx::assert_relative_eq;

use fuelsight_analysis::fuse::{fuse_fuel_risk, FuseParams};
use fuelsight_analysis::indices::{nbr, ndmi, ndvi};
use fuelsight_analysis::resample::{resample_classes, resample_field, GridSpec};
use fuelsight_analysis::severity::{classify_severity, dnbr, SEVERITY_NODATA};
use fuelsight_analysis::stress::{stress_products, StressParams};
use fuelsight_analysis::validate::{validate, ValidationParams};
use fuelsight_core::{Crs, GeoTransform, Raster};

const ROWS: usize = 12;
const COLS: usize = 12;

fn satellite_transform() -> GeoTransform {
    GeoTransform::new(400_000.0, 3_970_000.0, 30.0, -30.0)
}

fn satellite_raster(value_at: impl Fn(usize, usize) -> f64) -> Raster<f64> {
    let mut r = Raster::new(ROWS, COLS);
    r.set_transform(satellite_transform());
    r.set_crs(Some(Crs::from_epsg(32613)));
    r.set_nodata(Some(f64::NAN));
    for row in 0..ROWS {
        for col in 0..COLS {
            r.set(row, col, value_at(row, col)).unwrap();
        }
    }
    r
}

/// Band pair that produces a target normalized-difference value against a
/// fixed 0.5 reference band: `(ref - b) / (ref + b) = v`.
fn band_for_target(v: f64) -> f64 {
    0.5 * (1.0 - v) / (1.0 + v)
}

/// Target index profiles, all driven by the column (west-to-east gradient).
fn ndvi_target(col: usize) -> f64 {
    0.75 - 0.05 * col as f64
}

fn ndmi_target(col: usize) -> f64 {
    0.55 - 0.04 * col as f64
}

fn nbr_pre_target(col: usize) -> f64 {
    0.65 - 0.03 * col as f64
}

fn dnbr_target(col: usize) -> f64 {
    0.06 * col as f64
}

#[test]
fn full_pipeline_on_synthetic_scene() {
    // ── Index computation from reflectance bands ─────────────────────────
    let nir = satellite_raster(|_, _| 0.5);
    let red = satellite_raster(|_, col| band_for_target(ndvi_target(col)));
    let swir1 = satellite_raster(|_, col| band_for_target(ndmi_target(col)));
    let swir2 = satellite_raster(|_, col| band_for_target(nbr_pre_target(col)));

    let ndvi_grid = ndvi(&nir, &red).unwrap();
    let ndmi_grid = ndmi(&nir, &swir1).unwrap();
    let nbr_pre = nbr(&nir, &swir2).unwrap();

    for col in 0..COLS {
        assert_relative_eq!(ndvi_grid.get(5, col).unwrap(), ndvi_target(col), epsilon = 1e-9);
        assert_relative_eq!(ndmi_grid.get(5, col).unwrap(), ndmi_target(col), epsilon = 1e-9);
        assert_relative_eq!(nbr_pre.get(5, col).unwrap(), nbr_pre_target(col), epsilon = 1e-9);
    }

    // ── Stress stage ─────────────────────────────────────────────────────
    let stress = stress_products(&ndvi_grid, &ndmi_grid, &nbr_pre, &StressParams::default())
        .unwrap();

    let mut previous = -1.0;
    for col in 0..COLS {
        let s = stress.stress.get(5, col).unwrap();
        assert!((0.0..=1.0).contains(&s), "stress {} out of range", s);
        assert!(s >= previous, "stress must not decrease eastward");
        previous = s;
    }

    // ── Burn severity stage ──────────────────────────────────────────────
    let nbr_post = satellite_raster(|_, col| nbr_pre_target(col) - dnbr_target(col));
    let dnbr_grid = dnbr(&nbr_pre, &nbr_post).unwrap();

    for col in 0..COLS {
        assert_relative_eq!(dnbr_grid.get(3, col).unwrap(), dnbr_target(col), epsilon = 1e-9);
    }

    let classes = classify_severity(&dnbr_grid).unwrap();
    // The eastern edge burned hard, the western edge not at all.
    assert_eq!(classes.get(0, 0).unwrap(), 0);
    assert_eq!(classes.get(0, COLS - 1).unwrap(), 4);

    // ── Alignment onto the coarser baseline grid ─────────────────────────
    let baseline_spec = GridSpec::new(
        GeoTransform::new(400_030.0, 3_969_970.0, 60.0, -60.0),
        Some(Crs::from_epsg(32613)),
        5,
        5,
    );

    let stress_aligned = resample_field(&stress.stress, &baseline_spec).unwrap();
    let ndvi_dev_aligned = resample_field(&stress.ndvi_deviation, &baseline_spec).unwrap();
    let ndmi_dev_aligned = resample_field(&stress.ndmi_deviation, &baseline_spec).unwrap();
    let dnbr_aligned = resample_field(&dnbr_grid, &baseline_spec).unwrap();
    let classes_aligned = resample_classes(&classes, &baseline_spec).unwrap();

    for row in 0..5 {
        for col in 0..5 {
            let c = classes_aligned.get(row, col).unwrap();
            assert!(c <= 4 || c == SEVERITY_NODATA, "invented class code {}", c);
        }
    }

    // ── Fuel fusion ──────────────────────────────────────────────────────
    // Baseline density varies north-to-south, orthogonal to the burn.
    let mut baseline_density = Raster::new(5, 5);
    baseline_density.set_transform(baseline_spec.transform);
    baseline_density.set_crs(baseline_spec.crs.clone());
    baseline_density.set_nodata(Some(f64::NAN));
    for row in 0..5 {
        for col in 0..5 {
            baseline_density.set(row, col, 5.0 + row as f64).unwrap();
        }
    }

    let fused = fuse_fuel_risk(
        &stress_aligned,
        &ndvi_dev_aligned,
        &ndmi_dev_aligned,
        &baseline_density,
        &FuseParams::default(),
    )
    .unwrap();

    for row in 0..5 {
        for col in 0..5 {
            let risk = fused.risk_score.get(row, col).unwrap();
            let load = fused.load_factor.get(row, col).unwrap();
            let density = fused.enhanced_density.get(row, col).unwrap();
            let base = baseline_density.get(row, col).unwrap();

            assert!((0.0..=100.0).contains(&risk));
            assert!((1.0..=2.0).contains(&load));
            assert!(density >= base - 1e-9, "enhancement must not shrink fuel");
            assert!(density <= 1000.0);
        }
    }

    // ── Validation: the enhanced map must beat the baseline ──────────────
    let report = validate(
        &baseline_density,
        &fused.risk_score,
        &dnbr_aligned,
        Some(&classes_aligned),
        &ValidationParams {
            min_samples: 10,
            ..Default::default()
        },
    )
    .unwrap();

    assert!(report.reliable);
    assert!(
        report.enhanced.r_squared > report.baseline.r_squared,
        "enhanced r² {} must beat baseline r² {}",
        report.enhanced.r_squared,
        report.baseline.r_squared
    );
    assert!(report.absolute_improvement > 0.0);
    assert!(report.relative_improvement_percent >= 0.0);
    assert!(report.enhanced.r_squared > 0.9, "gradient scene should correlate strongly");

    // Stratified means rise with severity for the enhanced predictor.
    let by_class = report.by_class.unwrap();
    assert!(by_class.len() >= 2);
    for pair in by_class.windows(2) {
        assert!(
            pair[1].enhanced_mean >= pair[0].enhanced_mean,
            "enhanced risk should grow with observed severity"
        );
    }
}
