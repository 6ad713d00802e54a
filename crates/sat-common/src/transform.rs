//! North-up affine geotransforms.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Affine mapping from pixel (col, row) to map coordinates.
///
/// Only north-up grids are produced by the pipeline, so the rotation
/// terms of a full GDAL geotransform are always zero and omitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner of the upper-left pixel.
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner of the upper-left pixel.
    pub origin_y: f64,
    /// Pixel width in map units (positive).
    pub pixel_width: f64,
    /// Pixel height in map units (negative for north-up).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Transform with its origin at the top-left of `bounds` and square pixels.
    pub fn from_bounds(bounds: &BoundingBox, resolution: f64) -> Self {
        Self {
            origin_x: bounds.min_x,
            origin_y: bounds.max_y,
            pixel_width: resolution,
            pixel_height: -resolution,
        }
    }

    /// Map coordinates of the centre of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Extent covered by a `width` x `height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let x2 = self.origin_x + width as f64 * self.pixel_width;
        let y2 = self.origin_y + height as f64 * self.pixel_height;
        BoundingBox::new(
            self.origin_x.min(x2),
            self.origin_y.min(y2),
            self.origin_x.max(x2),
            self.origin_y.max(y2),
        )
    }

    /// GDAL ordering: [origin_x, pixel_width, 0, origin_y, 0, pixel_height].
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            0.0,
            self.origin_y,
            0.0,
            self.pixel_height,
        ]
    }

    /// Whether two grids share resolution and pixel alignment.
    pub fn is_aligned_with(&self, other: &GeoTransform) -> bool {
        const EPS: f64 = 1e-6;
        if (self.pixel_width - other.pixel_width).abs() > EPS
            || (self.pixel_height - other.pixel_height).abs() > EPS
        {
            return false;
        }
        let dx = (self.origin_x - other.origin_x) / self.pixel_width;
        let dy = (self.origin_y - other.origin_y) / self.pixel_height;
        (dx - dx.round()).abs() < EPS && (dy - dy.round()).abs() < EPS
    }
}
