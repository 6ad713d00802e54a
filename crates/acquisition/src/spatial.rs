//! Target grid selection and clipping.
//!
//! The output grid is decided once per query: the UTM zone containing the
//! AOI centroid, the profile's native resolution, and an extent given by
//! the clip method. Every window of every item is read into that grid.

use geo::{BoundingRect, Coord, Intersects, MapCoords, Point, Polygon};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use catalog::{ClipMethod, Query, SatelliteProfile};
use projection::{utm_crs_for, TransverseMercator};
use sat_common::{AcquisitionError, AcquisitionResult, BoundingBox, Epsg, GeoTransform};

use crate::engine::{AssetInfo, PixelGrid, ReadRequest, Resampling};
use crate::loader::RasterWindow;

/// The common grid every time step is produced on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpatialPlan {
    pub crs: Epsg,
    pub transform: GeoTransform,
    pub width: usize,
    pub height: usize,
    pub resolution: f64,
    pub fill: f64,
    /// Pixels whose centre lies inside the AOI (geometry clip only).
    #[serde(skip)]
    pub mask: Option<Vec<bool>>,
}

impl SpatialPlan {
    /// Plan the output grid of `query`.
    pub fn for_query(query: &Query, profile: &SatelliteProfile) -> AcquisitionResult<Self> {
        let (lon, lat) = query.aoi.centroid();
        let crs = utm_crs_for(lon, lat);
        let tm = TransverseMercator::from_epsg(crs)
            .ok_or_else(|| AcquisitionError::invalid(format!("{} is not a UTM zone", crs)))?;

        let projected: Polygon<f64> = query.aoi.polygon().map_coords(|c| {
            let (x, y) = tm.forward(c.x, c.y);
            Coord { x, y }
        });
        let extent = projected
            .bounding_rect()
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
            .ok_or_else(|| AcquisitionError::invalid("area of interest has no extent"))?;

        let resolution = profile.resolution;
        let fill = query.fill_value.unwrap_or(profile.nodata);

        let plan = match query.clip_method {
            ClipMethod::Geometry => Self::masked(crs, &projected, &extent, resolution, fill),
            ClipMethod::Window { pixels } => {
                Self::window(crs, &extent, resolution, pixels as usize, fill)
            }
        };

        debug!(
            crs = %plan.crs,
            width = plan.width,
            height = plan.height,
            masked = plan.mask.is_some(),
            "Spatial plan computed"
        );
        Ok(plan)
    }

    /// Minimal grid covering the projected polygon, with a centre-in-polygon mask.
    fn masked(
        crs: Epsg,
        projected: &Polygon<f64>,
        extent: &BoundingBox,
        resolution: f64,
        fill: f64,
    ) -> Self {
        let snapped = extent.snap_outward(resolution);
        let width = ((snapped.width() / resolution).round() as usize).max(1);
        let height = ((snapped.height() / resolution).round() as usize).max(1);
        let transform = GeoTransform::from_bounds(&snapped, resolution);

        let mut mask: Vec<bool> = (0..height)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..width).map(move |col| {
                    let (x, y) = transform.pixel_center(col, row);
                    projected.intersects(&Point::new(x, y))
                })
            })
            .collect();

        // An AOI smaller than one pixel still selects the pixel under its centre.
        if !mask.iter().any(|inside| *inside) {
            let (cx, cy) = extent.center();
            let col = (((cx - transform.origin_x) / resolution) as usize).min(width - 1);
            let row = (((transform.origin_y - cy) / resolution) as usize).min(height - 1);
            mask[row * width + col] = true;
        }

        Self {
            crs,
            transform,
            width,
            height,
            resolution,
            fill,
            mask: Some(mask),
        }
    }

    /// Fixed `pixels` x `pixels` grid centred on the extent, aligned to the resolution.
    fn window(crs: Epsg, extent: &BoundingBox, resolution: f64, pixels: usize, fill: f64) -> Self {
        let (cx, cy) = extent.center();
        let half = pixels as f64 * resolution / 2.0;
        let transform = GeoTransform {
            origin_x: ((cx - half) / resolution).round() * resolution,
            origin_y: ((cy + half) / resolution).round() * resolution,
            pixel_width: resolution,
            pixel_height: -resolution,
        };

        Self {
            crs,
            transform,
            width: pixels,
            height: pixels,
            resolution,
            fill,
            mask: None,
        }
    }

    /// (height, width)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    pub fn is_inside(&self, col: usize, row: usize) -> bool {
        match &self.mask {
            Some(mask) => mask.get(row * self.width + col).copied().unwrap_or(false),
            None => col < self.width && row < self.height,
        }
    }

    /// Number of pixels that can hold data.
    pub fn valid_pixels(&self) -> usize {
        match &self.mask {
            Some(mask) => mask.iter().filter(|inside| **inside).count(),
            None => self.width * self.height,
        }
    }
}

/// Clips and reprojects opened windows onto the query's [`SpatialPlan`].
#[derive(Debug, Clone)]
pub struct SpatialProcessor {
    plan: SpatialPlan,
    profile: &'static SatelliteProfile,
}

impl SpatialProcessor {
    pub fn new(query: &Query, profile: &'static SatelliteProfile) -> AcquisitionResult<Self> {
        Ok(Self {
            plan: SpatialPlan::for_query(query, profile)?,
            profile,
        })
    }

    pub fn plan(&self) -> &SpatialPlan {
        &self.plan
    }

    /// Resampling needed to bring `asset` onto the plan grid, if any.
    pub fn resampling_for(&self, band: &str, asset: &AssetInfo) -> Option<Resampling> {
        if asset.crs == self.plan.crs && asset.transform.is_aligned_with(&self.plan.transform) {
            None
        } else if self.profile.is_categorical(band) {
            Some(Resampling::Nearest)
        } else {
            Some(Resampling::Bilinear)
        }
    }

    pub fn read_request(&self, band: &str, asset: &AssetInfo) -> ReadRequest {
        ReadRequest {
            crs: self.plan.crs,
            transform: self.plan.transform,
            width: self.plan.width,
            height: self.plan.height,
            resampling: self.resampling_for(band, asset),
            fill: self.plan.fill,
        }
    }

    /// Read one window into the plan grid and apply the clip mask.
    #[instrument(skip_all, fields(item_id = %window.item_id(), band = %window.band()))]
    pub async fn process(&self, window: RasterWindow) -> AcquisitionResult<PixelGrid> {
        let item_id = window.item_id().to_string();
        let band = window.band().to_string();
        let request = self.read_request(&band, window.asset());

        let mut grid = window
            .read(&request)
            .await
            .map_err(|e| AcquisitionError::Reprojection {
                item_id: item_id.clone(),
                band: band.clone(),
                message: e.to_string(),
            })?;

        if grid.shape() != self.plan.shape() || grid.data.len() != grid.width * grid.height {
            return Err(AcquisitionError::InconsistentShape(format!(
                "engine returned {}x{} ({} values) for item {} band {}, expected {}x{}",
                grid.height,
                grid.width,
                grid.data.len(),
                item_id,
                band,
                self.plan.height,
                self.plan.width
            )));
        }
        if grid.crs != self.plan.crs {
            return Err(AcquisitionError::Reprojection {
                item_id,
                band,
                message: format!("engine returned {} instead of {}", grid.crs, self.plan.crs),
            });
        }

        if let Some(mask) = &self.plan.mask {
            let fill = self.plan.fill as f32;
            grid.data
                .par_iter_mut()
                .zip(mask.par_iter())
                .for_each(|(value, inside)| {
                    if !*inside {
                        *value = fill;
                    }
                });
        }

        Ok(grid)
    }
}
