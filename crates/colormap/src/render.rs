//! Raster-to-image rendering.

use std::path::Path;

use image::RgbaImage;

use fuelsight_core::raster::{Raster, RasterElement};
use fuelsight_core::{Error, Result};

use crate::scheme::{evaluate, severity_color, ColorScheme, Rgb};

/// Parameters for colormap rendering.
#[derive(Debug, Clone)]
pub struct ColormapParams {
    /// Color scheme to use.
    pub scheme: ColorScheme,
    /// Minimum value for normalization. Values below this are clamped.
    pub min: f64,
    /// Maximum value for normalization. Values above this are clamped.
    pub max: f64,
    /// Color for nodata pixels (RGBA). Default: fully transparent.
    pub nodata_color: [u8; 4],
}

impl ColormapParams {
    /// Params with an explicit value range.
    pub fn with_range(scheme: ColorScheme, min: f64, max: f64) -> Self {
        Self {
            scheme,
            min,
            max,
            nodata_color: [0, 0, 0, 0],
        }
    }
}

/// Auto-detect min/max from a raster, returning params ready to use.
///
/// Scans all valid (non-nodata) cells for the data range. All-nodata and
/// constant rasters get a degenerate-safe range.
pub fn auto_params<T: RasterElement>(raster: &Raster<T>, scheme: ColorScheme) -> ColormapParams {
    let nodata = raster.nodata();
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for val in raster.data().iter() {
        if val.is_nodata(nodata) {
            continue;
        }
        if let Some(v) = val.to_f64() {
            if v.is_finite() {
                if v < min {
                    min = v;
                }
                if v > max {
                    max = v;
                }
            }
        }
    }

    if !min.is_finite() || !max.is_finite() {
        min = 0.0;
        max = 1.0;
    } else if (max - min).abs() < f64::EPSILON {
        max = min + 1.0;
    }

    ColormapParams::with_range(scheme, min, max)
}

/// Convert a raster to an RGBA pixel buffer.
///
/// Returns a `Vec<u8>` of length `rows * cols * 4` in row-major order.
/// Nodata pixels get `params.nodata_color`.
pub fn raster_to_rgba<T: RasterElement>(raster: &Raster<T>, params: &ColormapParams) -> Vec<u8> {
    let rows = raster.rows();
    let cols = raster.cols();
    let nodata = raster.nodata();
    let range = params.max - params.min;
    let inv_range = if range.abs() > f64::EPSILON {
        1.0 / range
    } else {
        1.0
    };

    let mut rgba = vec![0u8; rows * cols * 4];

    for (i, val) in raster.data().iter().enumerate() {
        let offset = i * 4;

        if val.is_nodata(nodata) {
            rgba[offset..offset + 4].copy_from_slice(&params.nodata_color);
            continue;
        }

        match val.to_f64() {
            Some(v) if v.is_finite() => {
                let t = (v - params.min) * inv_range;
                let Rgb { r, g, b } = evaluate(params.scheme, t);
                rgba[offset] = r;
                rgba[offset + 1] = g;
                rgba[offset + 2] = b;
                rgba[offset + 3] = 255;
            }
            _ => {
                rgba[offset..offset + 4].copy_from_slice(&params.nodata_color);
            }
        }
    }

    rgba
}

/// Convert a classified severity raster to an RGBA buffer using the
/// discrete class palette. Codes outside the palette render as nodata.
pub fn severity_to_rgba(classes: &Raster<u8>, nodata_color: [u8; 4]) -> Vec<u8> {
    let rows = classes.rows();
    let cols = classes.cols();

    let mut rgba = vec![0u8; rows * cols * 4];

    for (i, &code) in classes.data().iter().enumerate() {
        let offset = i * 4;
        match severity_color(code) {
            Some(Rgb { r, g, b }) => {
                rgba[offset] = r;
                rgba[offset + 1] = g;
                rgba[offset + 2] = b;
                rgba[offset + 3] = 255;
            }
            None => {
                rgba[offset..offset + 4].copy_from_slice(&nodata_color);
            }
        }
    }

    rgba
}

fn save_rgba(rgba: Vec<u8>, cols: usize, rows: usize, path: &Path) -> Result<()> {
    let image = RgbaImage::from_raw(cols as u32, rows as u32, rgba)
        .ok_or_else(|| Error::Other("RGBA buffer does not match raster size".to_string()))?;
    image
        .save(path)
        .map_err(|e| Error::Other(format!("cannot write image: {}", e)))
}

/// Render a continuous raster to a PNG file.
pub fn render_png<T: RasterElement, P: AsRef<Path>>(
    raster: &Raster<T>,
    params: &ColormapParams,
    path: P,
) -> Result<()> {
    let rgba = raster_to_rgba(raster, params);
    save_rgba(rgba, raster.cols(), raster.rows(), path.as_ref())
}

/// Render a classified severity raster to a PNG file.
pub fn render_severity_png<P: AsRef<Path>>(classes: &Raster<u8>, path: P) -> Result<()> {
    let rgba = severity_to_rgba(classes, [0, 0, 0, 0]);
    save_rgba(rgba, classes.cols(), classes.rows(), path.as_ref())
}
