//! GeoTIFF reading and writing using GDAL

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use gdal::raster::{Buffer, GdalType, RasterCreationOption};
use gdal::spatial_ref::SpatialRef;
use gdal::{Dataset, DriverManager};
use std::path::Path;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Compression type: "LZW", "DEFLATE", "ZSTD", "NONE".
    /// The pipeline writes LZW-compressed outputs.
    pub compression: String,
    /// Tile size for tiled TIFFs (0 for strips)
    pub tile_size: usize,
    /// BigTIFF for files > 4GB
    pub bigtiff: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: "LZW".to_string(),
            tile_size: 256,
            bigtiff: false,
        }
    }
}

/// Read one band of a GeoTIFF file into a Raster.
///
/// `band` is 1-indexed (GDAL convention); `None` reads band 1. A band
/// index past the file's band count fails with [`Error::BandOutOfRange`].
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }

    let dataset = Dataset::open(path)?;
    let band_idx = band.unwrap_or(1);
    let count = dataset.raster_count() as usize;
    if band_idx == 0 || band_idx > count {
        return Err(Error::BandOutOfRange {
            band: band_idx,
            count,
        });
    }
    let rasterband = dataset.rasterband(band_idx)?;

    let (cols, rows) = dataset.raster_size();
    let buffer = rasterband.read_as::<T>((0, 0), (cols, rows), (cols, rows), None)?;

    let mut raster = Raster::from_vec(buffer.data, rows, cols)?;

    if let Ok(gt) = dataset.geo_transform() {
        raster.set_transform(GeoTransform::from_gdal(gt));
    }

    if let Ok(srs) = dataset.spatial_ref() {
        if let Ok(code) = srs.auth_code() {
            raster.set_crs(Some(Crs::from_epsg(code as u32)));
        } else if let Ok(wkt) = srs.to_wkt() {
            raster.set_crs(Some(Crs::from_wkt(wkt)));
        }
    }

    if let Some(nodata) = rasterband.no_data_value() {
        if let Some(nd) = num_traits::cast(nodata) {
            raster.set_nodata(Some(nd));
        }
    }

    Ok(raster)
}

/// Write a Raster to a single-band GeoTIFF file
pub fn write_geotiff<T, P>(
    raster: &Raster<T>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()>
where
    T: RasterElement + GdalType,
    P: AsRef<Path>,
{
    let opts = options.unwrap_or_default();
    let driver = DriverManager::get_driver_by_name("GTiff")?;

    let (rows, cols) = raster.shape();

    let tile = opts.tile_size.to_string();
    let mut create_options = vec![RasterCreationOption {
        key: "COMPRESS",
        value: &opts.compression,
    }];

    if opts.tile_size > 0 {
        create_options.push(RasterCreationOption {
            key: "TILED",
            value: "YES",
        });
        create_options.push(RasterCreationOption {
            key: "BLOCKXSIZE",
            value: &tile,
        });
        create_options.push(RasterCreationOption {
            key: "BLOCKYSIZE",
            value: &tile,
        });
    }

    if opts.bigtiff {
        create_options.push(RasterCreationOption {
            key: "BIGTIFF",
            value: "YES",
        });
    }

    let mut dataset = driver.create_with_band_type_with_options::<T, _>(
        path.as_ref(),
        cols as isize,
        rows as isize,
        1,
        &create_options,
    )?;

    dataset.set_geo_transform(&raster.transform().to_gdal())?;

    if let Some(crs) = raster.crs() {
        if let Some(epsg) = crs.epsg() {
            let srs = SpatialRef::from_epsg(epsg)?;
            dataset.set_spatial_ref(&srs)?;
        } else if let Some(wkt) = crs.wkt() {
            let srs = SpatialRef::from_wkt(wkt)?;
            dataset.set_spatial_ref(&srs)?;
        }
    }

    let mut band = dataset.rasterband(1)?;

    if let Some(nodata) = raster.nodata() {
        if let Some(nd) = num_traits::cast(nodata) {
            band.set_no_data_value(Some(nd))?;
        }
    }

    let data: Vec<T> = raster.data().iter().copied().collect();
    let buffer = Buffer::new((cols, rows), data);
    band.write((0, 0), (cols, rows), &buffer)?;

    Ok(())
}
