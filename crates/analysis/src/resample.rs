//! Grid-to-grid resampling
//!
//! Aligns a source raster onto a target grid (transform, CRS, shape) before
//! elementwise combination. Continuous magnitude fields use bilinear
//! interpolation; categorical label grids use nearest-neighbor so no
//! invalid class codes are invented. The split is enforced by giving each
//! its own entry point.
//!
//! Source and target may sit in different coordinate systems as long as
//! both are WGS84 or UTM; target pixel centers are routed through the
//! point transforms in `fuelsight_core::crs`.

use rayon::prelude::*;

use fuelsight_core::crs::{parse_utm_epsg, utm_to_wgs84, wgs84_to_utm, Crs};
use fuelsight_core::raster::{GeoTransform, Raster, RasterElement};
use fuelsight_core::{Error, Result};

use crate::indices::build_output;

/// The frame a raster is resampled onto: transform, CRS and shape.
#[derive(Debug, Clone)]
pub struct GridSpec {
    pub transform: GeoTransform,
    pub crs: Option<Crs>,
    pub rows: usize,
    pub cols: usize,
}

impl GridSpec {
    pub fn new(transform: GeoTransform, crs: Option<Crs>, rows: usize, cols: usize) -> Self {
        Self {
            transform,
            crs,
            rows,
            cols,
        }
    }

    /// Take the frame of an existing raster.
    pub fn from_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        Self {
            transform: *raster.transform(),
            crs: raster.crs().cloned(),
            rows: raster.rows(),
            cols: raster.cols(),
        }
    }
}

/// Point route from the target CRS into the source CRS, resolved once so
/// the per-pixel loop is infallible.
#[derive(Debug, Clone, Copy)]
enum PointRoute {
    Identity,
    /// `None` = WGS84 geographic, `Some((zone, north))` = UTM
    Transform {
        from_utm: Option<(u32, bool)>,
        to_utm: Option<(u32, bool)>,
    },
}

impl PointRoute {
    fn resolve(target_crs: Option<&Crs>, source_crs: Option<&Crs>) -> Result<Self> {
        match (target_crs, source_crs) {
            // Without CRS metadata on both sides the grids are assumed to
            // share a frame; only the affine transforms differ.
            (None, _) | (_, None) => Ok(Self::Identity),
            (Some(t), Some(s)) if t.is_equivalent(s) => Ok(Self::Identity),
            (Some(t), Some(s)) => {
                let parse = |crs: &Crs| -> Result<Option<(u32, bool)>> {
                    if crs.is_wgs84() {
                        return Ok(None);
                    }
                    crs.epsg()
                        .and_then(parse_utm_epsg)
                        .map(Some)
                        .ok_or_else(|| Error::UnsupportedCrs(crs.identifier()))
                };
                Ok(Self::Transform {
                    from_utm: parse(t)?,
                    to_utm: parse(s)?,
                })
            }
        }
    }

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Identity => (x, y),
            Self::Transform { from_utm, to_utm } => {
                let (lon, lat) = match from_utm {
                    Some((zone, north)) => utm_to_wgs84(x, y, *zone, *north),
                    None => (x, y),
                };
                match to_utm {
                    Some((zone, north)) => wgs84_to_utm(lon, lat, *zone, *north),
                    None => (lon, lat),
                }
            }
        }
    }
}

/// Fractional source array coordinates of a target pixel center, or `None`
/// outside source coverage. Array coordinates put cell centers at integer
/// indices.
fn source_coords<T: RasterElement>(
    source: &Raster<T>,
    target: &GridSpec,
    route: &PointRoute,
    row: usize,
    col: usize,
) -> Option<(f64, f64)> {
    let (x, y) = target.transform.pixel_to_geo(col, row);
    let (sx, sy) = route.apply(x, y);
    let (fc, fr) = source.geo_to_pixel(sx, sy);
    // geo_to_pixel is corner-based; shift to center-based array coordinates
    let (ac, ar) = (fc - 0.5, fr - 0.5);

    let rows = source.rows() as f64;
    let cols = source.cols() as f64;
    if !ac.is_finite() || !ar.is_finite() {
        return None;
    }
    if ac < -0.5 || ar < -0.5 || ac > cols - 0.5 || ar > rows - 0.5 {
        return None;
    }
    Some((ac, ar))
}

/// Bilinear sample at fractional array coordinates. NaN if any of the four
/// corners is nodata.
fn bilinear_sample(source: &Raster<f64>, ac: f64, ar: f64) -> f64 {
    let rows = source.rows();
    let cols = source.cols();
    let nodata = source.nodata();

    let c0 = ac.floor().clamp(0.0, (cols - 1) as f64) as usize;
    let r0 = ar.floor().clamp(0.0, (rows - 1) as f64) as usize;
    let c1 = (c0 + 1).min(cols - 1);
    let r1 = (r0 + 1).min(rows - 1);

    let cf = (ac - c0 as f64).clamp(0.0, 1.0);
    let rf = (ar - r0 as f64).clamp(0.0, 1.0);

    let v00 = unsafe { source.get_unchecked(r0, c0) };
    let v01 = unsafe { source.get_unchecked(r0, c1) };
    let v10 = unsafe { source.get_unchecked(r1, c0) };
    let v11 = unsafe { source.get_unchecked(r1, c1) };

    let is_nd = |v: f64| v.is_nan() || nodata.map_or(false, |nd| (v - nd).abs() < f64::EPSILON);
    if is_nd(v00) || is_nd(v01) || is_nd(v10) || is_nd(v11) {
        return f64::NAN;
    }

    let top = v00 * (1.0 - cf) + v01 * cf;
    let bottom = v10 * (1.0 - cf) + v11 * cf;
    top * (1.0 - rf) + bottom * rf
}

/// Resample a continuous magnitude grid onto a target frame, bilinear.
///
/// Target pixels outside source coverage become NaN. Use
/// [`resample_classes`] for categorical grids; bilinear interpolation
/// between class codes produces codes that do not exist.
pub fn resample_field(source: &Raster<f64>, target: &GridSpec) -> Result<Raster<f64>> {
    let route = PointRoute::resolve(target.crs.as_ref(), source.crs())?;
    let (rows, cols) = (target.rows, target.cols);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if let Some((ac, ar)) = source_coords(source, target, &route, row, col) {
                    *out = bilinear_sample(source, ac, ar);
                }
            }
            row_data
        })
        .collect();

    let mut template = source.with_same_meta::<f64>(rows, cols);
    template.set_transform(target.transform);
    template.set_crs(target.crs.clone());
    build_output(&template, rows, cols, data)
}

/// Resample a categorical grid onto a target frame, nearest-neighbor.
///
/// Every output value is one of the source's values, so no invalid class
/// codes are invented. Target pixels outside source coverage become the
/// source's nodata value (or the type default when none is set).
pub fn resample_classes<T: RasterElement>(
    source: &Raster<T>,
    target: &GridSpec,
) -> Result<Raster<T>> {
    let route = PointRoute::resolve(target.crs.as_ref(), source.crs())?;
    let (rows, cols) = (target.rows, target.cols);
    let fill = source.nodata().unwrap_or_else(T::default_nodata);

    let mut output: Raster<T> = source.with_same_meta::<T>(rows, cols);
    output.set_transform(target.transform);
    output.set_crs(target.crs.clone());
    output.set_nodata(Some(fill));

    for row in 0..rows {
        for col in 0..cols {
            let value = match source_coords(source, target, &route, row, col) {
                Some((ac, ar)) => {
                    let sc = ac.round().clamp(0.0, (source.cols() - 1) as f64) as usize;
                    let sr = ar.round().clamp(0.0, (source.rows() - 1) as f64) as usize;
                    unsafe { source.get_unchecked(sr, sc) }
                }
                None => fill,
            };
            output.set(row, col, value)?;
        }
    }

    Ok(output)
}
