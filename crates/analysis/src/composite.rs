//! Named access to the multi-band satellite composites
//!
//! The Sentinel-2 derived composite carries a fixed band layout
//! (reflectance plus precomputed indices); MODIS NDVI products carry scaled
//! integer counts that need a 1e-4 factor applied on load.

use std::path::Path;

use fuelsight_core::io::read_geotiff;
use fuelsight_core::raster::Raster;
use fuelsight_core::Result;

/// Scale factor for MODIS NDVI products (stored as scaled integers).
pub const MODIS_NDVI_SCALE: f64 = 1e-4;

/// Band layout of the Sentinel-2 composite, 1-based GDAL indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeBand {
    /// Blue reflectance
    B2,
    /// Green reflectance
    B3,
    /// Red reflectance
    B4,
    /// Near-infrared reflectance
    B8,
    /// Shortwave infrared 1
    B11,
    /// Shortwave infrared 2
    B12,
    /// Precomputed NDVI
    Ndvi,
    /// Precomputed NBR
    Nbr,
    /// Precomputed NDMI
    Ndmi,
}

impl CompositeBand {
    /// 1-based band index in the composite file
    pub fn index(self) -> usize {
        match self {
            Self::B2 => 1,
            Self::B3 => 2,
            Self::B4 => 3,
            Self::B8 => 4,
            Self::B11 => 5,
            Self::B12 => 6,
            Self::Ndvi => 7,
            Self::Nbr => 8,
            Self::Ndmi => 9,
        }
    }

    /// Short name as used in file naming and logs
    pub fn name(self) -> &'static str {
        match self {
            Self::B2 => "B2",
            Self::B3 => "B3",
            Self::B4 => "B4",
            Self::B8 => "B8",
            Self::B11 => "B11",
            Self::B12 => "B12",
            Self::Ndvi => "NDVI",
            Self::Nbr => "NBR",
            Self::Ndmi => "NDMI",
        }
    }
}

/// Read one named band of a composite file.
pub fn read_composite_band<P: AsRef<Path>>(path: P, band: CompositeBand) -> Result<Raster<f64>> {
    read_geotiff(path, Some(band.index()))
}

/// The three index bands the stress scorer consumes.
#[derive(Debug, Clone)]
pub struct IndexBands {
    pub ndvi: Raster<f64>,
    pub nbr: Raster<f64>,
    pub ndmi: Raster<f64>,
}

impl IndexBands {
    /// Load the precomputed NDVI/NBR/NDMI bands of a composite.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            ndvi: read_composite_band(path, CompositeBand::Ndvi)?,
            nbr: read_composite_band(path, CompositeBand::Nbr)?,
            ndmi: read_composite_band(path, CompositeBand::Ndmi)?,
        })
    }
}

/// Load a MODIS NDVI raster (band 1) and apply the integer scale factor.
///
/// Nodata cells stay NaN; everything else is multiplied by
/// [`MODIS_NDVI_SCALE`].
pub fn load_modis_ndvi<P: AsRef<Path>>(path: P) -> Result<Raster<f64>> {
    let raw: Raster<f64> = read_geotiff(path, Some(1))?;
    let nodata = raw.nodata();
    let (rows, cols) = raw.shape();

    let mut scaled = raw.with_same_meta::<f64>(rows, cols);
    scaled.set_nodata(Some(f64::NAN));
    for ((r, c), out) in scaled
        .data_mut()
        .indexed_iter_mut()
    {
        let v = unsafe { raw.get_unchecked(r, c) };
        *out = if v.is_nan() || nodata.map_or(false, |nd| (v - nd).abs() < f64::EPSILON) {
            f64::NAN
        } else {
            v * MODIS_NDVI_SCALE
        };
    }

    Ok(scaled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_layout() {
        assert_eq!(CompositeBand::B2.index(), 1);
        assert_eq!(CompositeBand::B4.index(), 3);
        assert_eq!(CompositeBand::B8.index(), 4);
        assert_eq!(CompositeBand::Ndvi.index(), 7);
        assert_eq!(CompositeBand::Nbr.index(), 8);
        assert_eq!(CompositeBand::Ndmi.index(), 9);
        assert_eq!(CompositeBand::Ndmi.name(), "NDMI");
    }
}
