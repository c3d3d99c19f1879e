//! Fuel-risk fusion
//!
//! Blends the satellite-derived stress and change grids with the static
//! fuel baseline into a 0–100 risk score, a fuel-load adjustment factor,
//! and an enhanced canopy-density grid.

use rayon::prelude::*;

use fuelsight_core::raster::Raster;
use fuelsight_core::{Error, Result};

use crate::indices::{build_output, check_dimensions, NodataCheck};

/// Blend weights for the risk score, on the 0–100 scale.
///
/// Must sum to 100 so the score is bounded in [0, 100] by construction.
#[derive(Debug, Clone, Copy)]
pub struct FuseWeights {
    /// Overall stress score
    pub stress: f64,
    /// Vegetation decline (NDVI deviation)
    pub ndvi: f64,
    /// Moisture deficit (NDMI deviation)
    pub ndmi: f64,
}

impl Default for FuseWeights {
    fn default() -> Self {
        Self {
            stress: 40.0,
            ndvi: 35.0,
            ndmi: 25.0,
        }
    }
}

impl FuseWeights {
    /// Check the sum-to-100 invariant.
    pub fn validate(&self) -> Result<()> {
        let sum = self.stress + self.ndvi + self.ndmi;
        if (sum - 100.0).abs() > 1e-6 {
            return Err(Error::InvalidParameter {
                name: "fuse weights",
                value: format!("{} + {} + {} = {}", self.stress, self.ndvi, self.ndmi, sum),
                reason: "weights must sum to 100".to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters for fuel-risk fusion.
#[derive(Debug, Clone, Copy)]
pub struct FuseParams {
    pub weights: FuseWeights,
    /// Index deviation at which the change contribution saturates
    pub change_saturation: f64,
    /// Upper cap for the enhanced density grid
    pub density_cap: f64,
}

impl Default for FuseParams {
    fn default() -> Self {
        Self {
            weights: FuseWeights::default(),
            change_saturation: 0.5,
            density_cap: 1000.0,
        }
    }
}

/// Outputs of the fusion stage.
#[derive(Debug, Clone)]
pub struct FusedFuel {
    /// Combined risk score, [0, 100]
    pub risk_score: Raster<f64>,
    /// Fuel-load adjustment factor, [1, 2]
    pub load_factor: Raster<f64>,
    /// Baseline density scaled by the load factor, capped
    pub enhanced_density: Raster<f64>,
}

/// Fuse the stress and change grids with the baseline canopy density.
///
/// ```text
/// risk    = w_s·clip(stress, 0, 1)
///         + w_v·clip(ndvi_change / sat, 0, 1)
///         + w_m·clip(ndmi_change / sat, 0, 1)
/// load    = 1 + risk / 100
/// density = clip(baseline · load, 0, cap)
/// ```
///
/// All grids must share one frame (resample first). NaN in any input
/// propagates to the corresponding output pixel. Inputs are not mutated.
pub fn fuse_fuel_risk(
    stress: &Raster<f64>,
    ndvi_change: &Raster<f64>,
    ndmi_change: &Raster<f64>,
    baseline_density: &Raster<f64>,
    params: &FuseParams,
) -> Result<FusedFuel> {
    params.weights.validate()?;
    if params.change_saturation <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "change_saturation",
            value: params.change_saturation.to_string(),
            reason: "saturation must be positive".to_string(),
        });
    }
    check_dimensions(stress, ndvi_change)?;
    check_dimensions(stress, ndmi_change)?;
    check_dimensions(stress, baseline_density)?;

    let (rows, cols) = stress.shape();
    let nd_s = stress.nodata();
    let nd_v = ndvi_change.nodata();
    let nd_m = ndmi_change.nodata();
    let nd_d = baseline_density.nodata();
    let w = params.weights;
    let sat = params.change_saturation;
    let cap = params.density_cap;

    type RowTriple = Vec<(f64, f64, f64)>;
    let triples: Vec<(f64, f64, f64)> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut out: RowTriple = vec![(f64::NAN, f64::NAN, f64::NAN); cols];
            for (col, slot) in out.iter_mut().enumerate() {
                let s = unsafe { stress.get_unchecked(row, col) };
                let dv = unsafe { ndvi_change.get_unchecked(row, col) };
                let dm = unsafe { ndmi_change.get_unchecked(row, col) };
                let d = unsafe { baseline_density.get_unchecked(row, col) };

                if s.is_nodata(nd_s) || dv.is_nodata(nd_v) || dm.is_nodata(nd_m) {
                    continue;
                }

                let risk = w.stress * s.clamp(0.0, 1.0)
                    + w.ndvi * (dv / sat).clamp(0.0, 1.0)
                    + w.ndmi * (dm / sat).clamp(0.0, 1.0);
                let load = 1.0 + risk / 100.0;
                let density = if d.is_nodata(nd_d) {
                    f64::NAN
                } else {
                    (d * load).clamp(0.0, cap)
                };

                *slot = (risk, load, density);
            }
            out
        })
        .collect();

    let mut risk_data = Vec::with_capacity(rows * cols);
    let mut load_data = Vec::with_capacity(rows * cols);
    let mut density_data = Vec::with_capacity(rows * cols);
    for (risk, load, density) in triples {
        risk_data.push(risk);
        load_data.push(load);
        density_data.push(density);
    }

    Ok(FusedFuel {
        risk_score: build_output(stress, rows, cols, risk_data)?,
        load_factor: build_output(stress, rows, cols, load_data)?,
        enhanced_density: build_output(stress, rows, cols, density_data)?,
    })
}

/// Share of valid pixels in the high / moderate / low risk bands
/// (> 60, 40–60, <= 40 on the 0–100 scale).
#[derive(Debug, Clone, Copy)]
pub struct RiskBreakdown {
    pub high_percent: f64,
    pub moderate_percent: f64,
    pub low_percent: f64,
    pub valid_count: usize,
}

/// Distribution of a risk grid over the reporting bands.
pub fn risk_breakdown(risk: &Raster<f64>) -> RiskBreakdown {
    let mut high = 0usize;
    let mut moderate = 0usize;
    let mut low = 0usize;

    for &v in risk.data().iter() {
        if !v.is_finite() {
            continue;
        }
        if v > 60.0 {
            high += 1;
        } else if v > 40.0 {
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

    RiskBreakdown {
        high_percent: pct(high),
        moderate_percent: pct(moderate),
        low_percent: pct(low),
        valid_count: valid,
    }
}

/// Continuous hazard proxy for FBFM40 fuel-model codes, in [0, 1].
///
/// Grass 0.3, shrub 0.5, timber-understory 0.6, timber litter 0.8; codes
/// outside the mapped families (non-burnable, agriculture) score 0.
pub fn fbfm_hazard(fbfm: &Raster<i16>) -> Raster<f64> {
    let (rows, cols) = fbfm.shape();
    let mut hazard = fbfm.with_same_meta::<f64>(rows, cols);
    hazard.set_nodata(Some(f64::NAN));

    for ((row, col), out) in hazard.data_mut().indexed_iter_mut() {
        let code = unsafe { fbfm.get_unchecked(row, col) };
        *out = match code {
            101..=109 => 0.3, // GR: grass
            120..=129 => 0.5, // GS: grass-shrub
            140..=149 => 0.6, // SH/TU boundary: timber-understory grass
            180..=189 => 0.8, // TL: timber litter
            _ => 0.0,
        };
    }

    hazard
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
    fn known_blend() {
        let stress = make_band(3, 3, 0.5);
        let ndvi_change = make_band(3, 3, 0.25); // 0.25/0.5 = 0.5
        let ndmi_change = make_band(3, 3, 1.0); // saturates to 1.0
        let density = make_band(3, 3, 10.0);

        let fused = fuse_fuel_risk(
            &stress,
            &ndvi_change,
            &ndmi_change,
            &density,
            &FuseParams::default(),
        )
        .unwrap();

        // 40*0.5 + 35*0.5 + 25*1.0 = 62.5
        assert_relative_eq!(fused.risk_score.get(1, 1).unwrap(), 62.5, epsilon = 1e-9);
        assert_relative_eq!(fused.load_factor.get(1, 1).unwrap(), 1.625, epsilon = 1e-9);
        assert_relative_eq!(
            fused.enhanced_density.get(1, 1).unwrap(),
            16.25,
            epsilon = 1e-9
        );
    }

    #[test]
    fn invariants_hold_across_extremes() {
        for (s, dv, dm, d) in [
            (0.0, -1.0, -1.0, 0.0),
            (1.0, 1.0, 1.0, 900.0),
            (2.0, 5.0, 5.0, 600.0), // inputs beyond nominal bounds get clipped
            (0.3, 0.1, 0.0, 50.0),
        ] {
            let fused = fuse_fuel_risk(
                &make_band(2, 2, s),
                &make_band(2, 2, dv),
                &make_band(2, 2, dm),
                &make_band(2, 2, d),
                &FuseParams::default(),
            )
            .unwrap();

            let risk = fused.risk_score.get(0, 0).unwrap();
            let load = fused.load_factor.get(0, 0).unwrap();
            let density = fused.enhanced_density.get(0, 0).unwrap();

            assert!((0.0..=100.0).contains(&risk), "risk {} out of range", risk);
            assert!((1.0..=2.0).contains(&load), "load {} out of range", load);
            assert!(density >= d.min(1000.0) || density == 0.0);
            assert!(density <= 1000.0);
            assert!(density >= d.clamp(0.0, 1000.0) - 1e-9, "enhanced below baseline");
        }
    }

    #[test]
    fn density_capped() {
        let fused = fuse_fuel_risk(
            &make_band(2, 2, 1.0),
            &make_band(2, 2, 1.0),
            &make_band(2, 2, 1.0),
            &make_band(2, 2, 800.0),
            &FuseParams::default(),
        )
        .unwrap();

        // 800 * 2.0 = 1600, capped at 1000
        assert_relative_eq!(
            fused.enhanced_density.get(0, 0).unwrap(),
            1000.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn nan_propagates() {
        let mut stress = make_band(2, 2, 0.5);
        stress.set(0, 0, f64::NAN).unwrap();

        let fused = fuse_fuel_risk(
            &stress,
            &make_band(2, 2, 0.2),
            &make_band(2, 2, 0.2),
            &make_band(2, 2, 10.0),
            &FuseParams::default(),
        )
        .unwrap();

        assert!(fused.risk_score.get(0, 0).unwrap().is_nan());
        assert!(fused.load_factor.get(0, 0).unwrap().is_nan());
        assert!(fused.enhanced_density.get(0, 0).unwrap().is_nan());
        assert!(!fused.risk_score.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn bad_weights_rejected() {
        let params = FuseParams {
            weights: FuseWeights {
                stress: 50.0,
                ndvi: 30.0,
                ndmi: 30.0,
            },
            ..Default::default()
        };
        let band = make_band(2, 2, 0.5);
        assert!(fuse_fuel_risk(&band, &band, &band, &band, &params).is_err());
    }

    #[test]
    fn shape_mismatch_rejected() {
        let a = make_band(2, 2, 0.5);
        let b = make_band(2, 3, 0.5);
        assert!(fuse_fuel_risk(&a, &a, &a, &b, &FuseParams::default()).is_err());
    }

    #[test]
    fn hazard_lookup() {
        let mut fbfm: Raster<i16> = Raster::new(1, 5);
        fbfm.set(0, 0, 102).unwrap(); // grass
        fbfm.set(0, 1, 122).unwrap(); // grass-shrub
        fbfm.set(0, 2, 145).unwrap(); // timber-understory
        fbfm.set(0, 3, 185).unwrap(); // timber litter
        fbfm.set(0, 4, 91).unwrap(); // non-burnable urban

        let hazard = fbfm_hazard(&fbfm);
        assert_relative_eq!(hazard.get(0, 0).unwrap(), 0.3);
        assert_relative_eq!(hazard.get(0, 1).unwrap(), 0.5);
        assert_relative_eq!(hazard.get(0, 2).unwrap(), 0.6);
        assert_relative_eq!(hazard.get(0, 3).unwrap(), 0.8);
        assert_relative_eq!(hazard.get(0, 4).unwrap(), 0.0);
    }

    #[test]
    fn risk_breakdown_bands() {
        let mut risk = make_band(2, 2, 70.0);
        risk.set(0, 1, 50.0).unwrap();
        risk.set(1, 0, 10.0).unwrap();
        risk.set(1, 1, f64::NAN).unwrap();

        let b = risk_breakdown(&risk);
        assert_eq!(b.valid_count, 3);
        assert_relative_eq!(b.high_percent, 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(b.moderate_percent, 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(b.low_percent, 100.0 / 3.0, epsilon = 1e-9);
    }
}
