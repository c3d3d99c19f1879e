//! Burn severity from differenced NBR
//!
//! `dNBR = NBR_pre − NBR_post`, classified into five ordinal classes with
//! the USGS thresholds. Bin boundaries belong to the higher class.

use rayon::prelude::*;

use fuelsight_core::raster::Raster;
use fuelsight_core::Result;

use crate::indices::{build_output, check_dimensions};

/// Nodata value for classified severity rasters.
pub const SEVERITY_NODATA: u8 = 255;

/// USGS dNBR class boundaries, increasing. A dNBR at or above boundary `i`
/// is at least class `i + 1`.
pub const DNBR_CLASS_BOUNDS: [f64; 4] = [0.10, 0.27, 0.44, 0.66];

/// Ordinal burn severity classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum BurnSeverity {
    Unburned = 0,
    Low = 1,
    ModerateLow = 2,
    ModerateHigh = 3,
    High = 4,
}

impl BurnSeverity {
    /// Classify a dNBR value. Returns `None` for non-finite input.
    pub fn from_dnbr(dnbr: f64) -> Option<Self> {
        if !dnbr.is_finite() {
            return None;
        }
        Some(if dnbr >= DNBR_CLASS_BOUNDS[3] {
            Self::High
        } else if dnbr >= DNBR_CLASS_BOUNDS[2] {
            Self::ModerateHigh
        } else if dnbr >= DNBR_CLASS_BOUNDS[1] {
            Self::ModerateLow
        } else if dnbr >= DNBR_CLASS_BOUNDS[0] {
            Self::Low
        } else {
            Self::Unburned
        })
    }

    /// All classes in increasing order
    pub const ALL: [BurnSeverity; 5] = [
        Self::Unburned,
        Self::Low,
        Self::ModerateLow,
        Self::ModerateHigh,
        Self::High,
    ];

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::Unburned => "Unburned",
            Self::Low => "Low",
            Self::ModerateLow => "Moderate-low",
            Self::ModerateHigh => "Moderate-high",
            Self::High => "High",
        }
    }

    /// Class index as stored in the classified raster
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Differenced Normalized Burn Ratio: `nbr_pre − nbr_post`.
///
/// Higher values indicate more severe burns. NaN in either input produces
/// NaN; mismatched shapes fail fast.
pub fn dnbr(nbr_pre: &Raster<f64>, nbr_post: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(nbr_pre, nbr_post)?;

    let (rows, cols) = nbr_pre.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let pre = unsafe { nbr_pre.get_unchecked(row, col) };
                let post = unsafe { nbr_post.get_unchecked(row, col) };
                if pre.is_nan() || post.is_nan() {
                    continue;
                }
                row_data[col] = pre - post;
            }
            row_data
        })
        .collect();

    build_output(nbr_pre, rows, cols, data)
}

/// Classify a dNBR grid into the five severity classes.
///
/// Non-finite pixels become [`SEVERITY_NODATA`].
pub fn classify_severity(dnbr: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dnbr.shape();

    let mut classes = dnbr.with_same_meta::<u8>(rows, cols);
    classes.set_nodata(Some(SEVERITY_NODATA));

    for row in 0..rows {
        for col in 0..cols {
            let v = unsafe { dnbr.get_unchecked(row, col) };
            let code = match BurnSeverity::from_dnbr(v) {
                Some(class) => class.code(),
                None => SEVERITY_NODATA,
            };
            classes.set(row, col, code)?;
        }
    }

    Ok(classes)
}

/// Class distribution of a classified severity raster.
///
/// Percentages are over valid (non-nodata) pixels only.
#[derive(Debug, Clone)]
pub struct SeverityBreakdown {
    /// Pixel count per class, indexed by class code
    pub counts: [usize; 5],
    /// Percentage per class, indexed by class code
    pub percents: [f64; 5],
    /// Percentage burned at any severity (classes 1-4)
    pub burned_percent: f64,
    pub valid_count: usize,
}

/// Distribution over the five severity classes.
pub fn severity_breakdown(classes: &Raster<u8>) -> SeverityBreakdown {
    let mut counts = [0usize; 5];

    for &c in classes.data().iter() {
        if let Some(slot) = counts.get_mut(c as usize) {
            *slot += 1;
        }
    }

    let valid: usize = counts.iter().sum();
    let mut percents = [0.0; 5];
    if valid > 0 {
        for (i, &n) in counts.iter().enumerate() {
            percents[i] = n as f64 / valid as f64 * 100.0;
        }
    }

    SeverityBreakdown {
        counts,
        percents,
        burned_percent: percents[1] + percents[2] + percents[3] + percents[4],
        valid_count: valid,
    }
}
