//! # FuelSight Analysis
//!
//! The numeric stages of the fuel-risk pipeline:
//!
//! - **indices**: NDVI / NBR / NDMI from reflectance bands
//! - **composite**: named access to the multi-band satellite composites
//! - **stress**: deviation-from-healthy scoring and the blended stress score
//! - **temporal**: change layers between two acquisitions
//! - **severity**: dNBR and the five-class burn-severity table
//! - **resample**: grid alignment (bilinear for fields, nearest for classes)
//! - **fuse**: baseline + satellite fusion into the enhanced risk grids
//! - **correlation / validate**: Pearson comparison against observed severity
//! - **report**: JSON sidecars per stage

pub mod composite;
pub mod correlation;
pub mod fuse;
pub mod indices;
pub mod report;
pub mod resample;
pub mod severity;
pub mod stress;
pub mod temporal;
pub mod validate;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::composite::{CompositeBand, IndexBands};
    pub use crate::correlation::{pearson, Correlation};
    pub use crate::fuse::{fuse_fuel_risk, FuseParams, FusedFuel};
    pub use crate::indices::{nbr, ndmi, ndvi, normalized_difference};
    pub use crate::resample::{resample_classes, resample_field, GridSpec};
    pub use crate::severity::{classify_severity, dnbr, BurnSeverity};
    pub use crate::stress::{stress_products, stress_score, StressParams};
    pub use crate::validate::{validate, ValidationParams, ValidationReport};
    pub use fuelsight_core::prelude::*;
}
