//! Affine georeferencing

use serde::{Deserialize, Serialize};

/// Affine transform tying pixel coordinates to map coordinates.
///
/// The same six coefficients GDAL carries, so files round-trip losslessly:
///
/// ```text
/// x = origin_x + col * pixel_width  + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Satellite composites and LANDFIRE tiles are north-up: both rotation
/// terms zero and `pixel_height` negative (y decreases downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// Map X of the top-left corner of pixel (0, 0)
    pub origin_x: f64,
    /// Map Y of the top-left corner of pixel (0, 0)
    pub origin_y: f64,
    /// Cell width in map units
    pub pixel_width: f64,
    /// Cell height in map units, negative for north-up grids
    pub pixel_height: f64,
    /// X shear per row (zero for north-up)
    pub row_rotation: f64,
    /// Y shear per column (zero for north-up)
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform: origin plus cell sizes, no rotation.
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// From the GDAL coefficient order
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
    pub fn from_gdal(c: [f64; 6]) -> Self {
        Self {
            origin_x: c[0],
            pixel_width: c[1],
            row_rotation: c[2],
            origin_y: c[3],
            col_rotation: c[4],
            pixel_height: c[5],
        }
    }

    /// Back to the GDAL coefficient order.
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    fn project(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width + row * self.row_rotation,
            self.origin_y + col * self.col_rotation + row * self.pixel_height,
        )
    }

    /// Map coordinates of the center of pixel `(col, row)`.
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.project(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of the top-left corner of pixel `(col, row)`.
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.project(col as f64, row as f64)
    }

    /// Fractional pixel coordinates `(col, row)` of a map point, by
    /// inverting the affine. NaN when the transform is degenerate
    /// (zero-area pixels).
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-10 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        (
            (self.pixel_height * dx - self.row_rotation * dy) / det,
            (self.pixel_width * dy - self.col_rotation * dx) / det,
        )
    }

    /// Cell size in map units (assumes square pixels).
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Footprint `(min_x, min_y, max_x, max_y)` of a `width` x `height`
    /// grid under this transform. Walks all four corners so rotated grids
    /// still get an axis-aligned box.
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];

        let mut bounds = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            bounds.0 = bounds.0.min(x);
            bounds.1 = bounds.1.min(y);
            bounds.2 = bounds.2.max(x);
            bounds.3 = bounds.3.max(y);
        }
        bounds
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
