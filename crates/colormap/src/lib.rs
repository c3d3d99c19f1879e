//! # FuelSight Colormap
//!
//! Color schemes and PNG rendering for the pipeline's rasters: continuous
//! ramps for indices, stress and dNBR grids, plus the discrete five-class
//! burn-severity palette.

mod render;
mod scheme;

pub use render::{
    auto_params, raster_to_rgba, render_png, render_severity_png, severity_to_rgba,
    ColormapParams,
};
pub use scheme::{evaluate, severity_color, ColorScheme, ColorStop, Rgb, SEVERITY_PALETTE};
