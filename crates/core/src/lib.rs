//! # FuelSight Core
//!
//! Core types and I/O for the FuelSight fuel-risk analysis toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: generic georeferenced raster grid
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Crs`: coordinate reference system handling, with pure-Rust
//!   WGS84 ↔ UTM point transforms
//! - GeoTIFF reading and writing (GDAL-backed behind the `gdal` feature,
//!   `tiff`-crate fallback otherwise)

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::Crs;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement, RasterStatistics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::Crs;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
}
