//! Error types for FuelSight

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for FuelSight operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Required input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported CRS for reprojection: {0}")]
    UnsupportedCrs(String),

    #[error("Band {band} out of range for raster with {count} band(s)")]
    BandOutOfRange { band: usize, count: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Zero variance in {0}: correlation is undefined")]
    ZeroVariance(&'static str),

    #[error("Insufficient valid samples: {count} (need at least {minimum})")]
    InsufficientSamples { count: usize, minimum: usize },

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "gdal")]
impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for FuelSight operations
pub type Result<T> = std::result::Result<T, Error>;
