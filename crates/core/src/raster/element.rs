//! Cell-value trait for generic rasters

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Types a raster cell can hold.
///
/// Bounds the cell types the pipeline reads and writes: reflectance and
/// index grids (`f32`/`f64`), severity classes and masks (`u8`), fuel-model
/// codes (`i16`/`i32`) and scaled sensor counts (`u16`). Floats treat NaN
/// as nodata unconditionally; integers only match an explicit nodata code.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Nodata value used when a grid declares none of its own
    fn default_nodata() -> Self;

    /// Whether `self` counts as nodata given a grid's declared value
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this is a floating point type
    fn is_float() -> bool;

    /// Lossy widening to f64 for statistics
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! integer_element {
    ($($t:ty),+) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::MAX
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }

            fn is_float() -> bool {
                false
            }
        }
    )+};
}

macro_rules! float_element {
    ($($t:ty),+) => {$(
        impl RasterElement for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }

            fn is_float() -> bool {
                true
            }
        }
    )+};
}

integer_element!(u8, u16, i16, i32);
float_element!(f32, f64);
