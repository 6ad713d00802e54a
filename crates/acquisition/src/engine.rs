//! Raster read/reproject engine collaborator.

use async_trait::async_trait;
use sat_common::{Epsg, GeoTransform};
use serde::Serialize;
use thiserror::Error;

/// Errors reported by a raster engine.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// The asset does not exist (partial scenes, expired links).
    #[error("asset not found: {0}")]
    NotFound(String),

    /// Decoding or resampling failed.
    #[error("raster engine failure: {0}")]
    Failed(String),
}

/// Metadata of an opened asset. No pixels are read to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetInfo {
    pub href: String,
    pub crs: Epsg,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub nodata: Option<f64>,
}

/// Resampling kernel requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resampling {
    /// Nearest neighbour (preserves class values).
    Nearest,
    /// Bilinear interpolation.
    Bilinear,
}

impl std::fmt::Display for Resampling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
        }
    }
}

/// Target grid of one windowed read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    pub crs: Epsg,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    /// `None` when the asset already sits on the target grid.
    pub resampling: Option<Resampling>,
    /// Value for target pixels the asset does not cover.
    pub fill: f64,
}

/// Decoded pixels in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGrid {
    pub width: usize,
    pub height: usize,
    pub crs: Epsg,
    pub data: Vec<f32>,
}

impl PixelGrid {
    pub fn filled(width: usize, height: usize, crs: Epsg, value: f32) -> Self {
        Self {
            width,
            height,
            crs,
            data: vec![value; width * height],
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col < self.width && row < self.height {
            self.data.get(row * self.width + col).copied()
        } else {
            None
        }
    }
}

/// Opens raster assets and reads windows of them into a target grid.
///
/// Implementations wrap GDAL, a COG reader or, in tests, synthetic data.
/// Every `open` is balanced by exactly one `release` once the window is
/// dropped, so implementations may hold file handles or HTTP sessions
/// between the two.
#[async_trait]
pub trait RasterEngine: Send + Sync {
    /// Read an asset's header.
    ///
    /// # Arguments
    /// * `href` - Asset location as published by the catalog
    async fn open(&self, href: &str) -> Result<AssetInfo, EngineError>;

    /// Read the part of `asset` that falls inside the request grid,
    /// resampling into it when `request.resampling` is set.
    async fn windowed_read(
        &self,
        asset: &AssetInfo,
        request: &ReadRequest,
    ) -> Result<PixelGrid, EngineError>;

    /// Called once per opened asset when its window is dropped.
    fn release(&self, _asset: &AssetInfo) {}
}
