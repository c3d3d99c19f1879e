//! JSON statistics sidecars
//!
//! Each pipeline stage writes a small JSON summary next to its rasters.
//! The sidecars are descriptive only; no later stage reads them back.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use fuelsight_core::raster::Raster;
use fuelsight_core::{Error, Result};

use crate::fuse::RiskBreakdown;
use crate::severity::{severity_breakdown, BurnSeverity};
use crate::stress::StressBreakdown;

/// Nodata-aware summary of one continuous grid.
#[derive(Debug, Clone, Serialize)]
pub struct GridSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub valid_count: usize,
}

impl GridSummary {
    /// Summarize a raster. All-nodata grids summarize to NaN fields with a
    /// zero count.
    pub fn of(raster: &Raster<f64>) -> Self {
        let stats = raster.statistics();
        Self {
            mean: stats.mean.unwrap_or(f64::NAN),
            std: stats.std_dev.unwrap_or(f64::NAN),
            min: stats.min.unwrap_or(f64::NAN),
            max: stats.max.unwrap_or(f64::NAN),
            valid_count: stats.valid_count,
        }
    }
}

/// Sidecar for the change-detection / stress stage.
#[derive(Debug, Clone, Serialize)]
pub struct StressReport {
    pub ndvi: GridSummary,
    pub nbr: GridSummary,
    pub ndmi: GridSummary,
    pub stress_mean: f64,
    pub high_stress_percent: f64,
    pub moderate_stress_percent: f64,
    pub low_stress_percent: f64,
}

impl StressReport {
    pub fn new(
        ndvi: &Raster<f64>,
        nbr: &Raster<f64>,
        ndmi: &Raster<f64>,
        stress: &Raster<f64>,
        breakdown: &StressBreakdown,
    ) -> Self {
        Self {
            ndvi: GridSummary::of(ndvi),
            nbr: GridSummary::of(nbr),
            ndmi: GridSummary::of(ndmi),
            stress_mean: GridSummary::of(stress).mean,
            high_stress_percent: breakdown.high_percent,
            moderate_stress_percent: breakdown.moderate_percent,
            low_stress_percent: breakdown.low_percent,
        }
    }
}

/// One row of the severity distribution.
#[derive(Debug, Clone, Serialize)]
pub struct SeverityClassRow {
    pub class: u8,
    pub label: &'static str,
    pub count: usize,
    pub percent: f64,
}

/// Sidecar for the burn-severity stage.
#[derive(Debug, Clone, Serialize)]
pub struct SeverityReport {
    pub dnbr: GridSummary,
    pub distribution: Vec<SeverityClassRow>,
    pub burned_percent: f64,
}

impl SeverityReport {
    pub fn new(dnbr: &Raster<f64>, classes: &Raster<u8>) -> Self {
        let breakdown = severity_breakdown(classes);
        let distribution = BurnSeverity::ALL
            .iter()
            .map(|&severity| {
                let i = severity.code() as usize;
                SeverityClassRow {
                    class: severity.code(),
                    label: severity.label(),
                    count: breakdown.counts[i],
                    percent: breakdown.percents[i],
                }
            })
            .collect();

        Self {
            dnbr: GridSummary::of(dnbr),
            distribution,
            burned_percent: breakdown.burned_percent,
        }
    }
}

/// Sidecar for the fuel-fusion stage.
#[derive(Debug, Clone, Serialize)]
pub struct FusionReport {
    pub risk: GridSummary,
    pub load_factor: GridSummary,
    pub baseline_density_mean: f64,
    pub enhanced_density_mean: f64,
    pub high_risk_percent: f64,
    pub moderate_risk_percent: f64,
    pub low_risk_percent: f64,
}

impl FusionReport {
    pub fn new(
        risk: &Raster<f64>,
        load_factor: &Raster<f64>,
        baseline_density: &Raster<f64>,
        enhanced_density: &Raster<f64>,
        breakdown: &RiskBreakdown,
    ) -> Self {
        Self {
            risk: GridSummary::of(risk),
            load_factor: GridSummary::of(load_factor),
            baseline_density_mean: GridSummary::of(baseline_density).mean,
            enhanced_density_mean: GridSummary::of(enhanced_density).mean,
            high_risk_percent: breakdown.high_percent,
            moderate_risk_percent: breakdown.moderate_percent,
            low_risk_percent: breakdown.low_percent,
        }
    }
}

/// Write any serializable report as pretty-printed JSON.
pub fn write_json<T: Serialize, P: AsRef<Path>>(report: &T, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .map_err(|e| Error::Other(format!("cannot serialize report: {}", e)))?;
    Ok(())
}
