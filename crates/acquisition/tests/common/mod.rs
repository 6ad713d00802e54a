//! Test doubles for the acquisition pipeline: a scripted STAC catalog and
//! a synthetic raster engine that counts opened and released handles.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use acquisition::{
    AcquisitionConfig, AssetInfo, EngineError, PixelGrid, Pipeline, RasterEngine, ReadRequest,
};
use catalog::{CatalogClient, CatalogEndpoints, CatalogError, ItemCollection, PageRequest};
use sat_common::{Epsg, GeoTransform};
use test_utils::{feature_collection, stac_feature};

pub const PC_URL: &str = "mock://planetary-computer/search";
pub const E84_URL: &str = "mock://earth-search/search";

/// Footprint of the synthetic Sentinel-2 tile around Copenhagen.
pub const TILE_BBOX: (f64, f64, f64, f64) = (12.0, 55.0, 13.6, 56.0);

pub fn config() -> AcquisitionConfig {
    AcquisitionConfig {
        endpoints: CatalogEndpoints {
            planetary_computer: PC_URL.to_string(),
            earth_search: E84_URL.to_string(),
        },
        ..AcquisitionConfig::default()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Serves features per URL; honours `query` `eq`/`lte` clauses and `limit`.
#[derive(Default)]
pub struct MockCatalog {
    features: HashMap<String, Vec<Value>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockCatalog {
    pub fn add(&mut self, url: &str, feature: Value) {
        self.features.entry(url.to_string()).or_default().push(feature);
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

fn matches(feature: &Value, body: &Value) -> bool {
    let Some(filters) = body["query"].as_object() else {
        return true;
    };
    filters.iter().all(|(property, clause)| {
        let value = &feature["properties"][property.as_str()];
        let eq = clause.get("eq").map_or(true, |expected| value == expected);
        let lte = clause
            .get("lte")
            .and_then(Value::as_f64)
            .map_or(true, |ceiling| value.as_f64().map_or(false, |v| v <= ceiling));
        eq && lte
    })
}

#[async_trait]
impl CatalogClient for MockCatalog {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ItemCollection, CatalogError> {
        self.requests.lock().unwrap().push(request.clone());
        let body = request.body.clone().unwrap_or_else(|| json!({}));
        let limit = body["limit"].as_u64().unwrap_or(100) as usize;
        let page: Vec<Value> = self
            .features
            .get(&request.url)
            .map(|all| all.iter().filter(|f| matches(f, &body)).take(limit).cloned().collect())
            .unwrap_or_default();
        serde_json::from_value(feature_collection(page, None))
            .map_err(|e| CatalogError::Permanent(e.to_string()))
    }
}

// ============================================================================
// Raster engine
// ============================================================================

/// Which part of the target grid an asset covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    Full,
    LeftHalf,
    RightHalf,
    /// Listed in the catalog but the engine cannot find it.
    NotFound,
    /// Opens, but every read fails.
    Corrupt,
}

#[derive(Debug, Clone)]
pub struct SyntheticAsset {
    pub value: f32,
    pub coverage: Coverage,
    pub crs: Epsg,
    pub read_delay: Duration,
}

/// Produces constant-valued grids directly on the requested target grid.
#[derive(Default)]
pub struct SyntheticEngine {
    assets: HashMap<String, SyntheticAsset>,
    hang_reads: bool,
    opened: AtomicUsize,
    released: AtomicUsize,
    reads: Mutex<Vec<(String, ReadRequest)>>,
}

impl SyntheticEngine {
    pub fn insert(&mut self, href: String, asset: SyntheticAsset) {
        self.assets.insert(href, asset);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn open_handles(&self) -> usize {
        self.opened() - self.released.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> Vec<(String, ReadRequest)> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RasterEngine for SyntheticEngine {
    async fn open(&self, href: &str) -> Result<AssetInfo, EngineError> {
        let asset = self
            .assets
            .get(href)
            .filter(|a| a.coverage != Coverage::NotFound)
            .ok_or_else(|| EngineError::NotFound(href.to_string()))?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(AssetInfo {
            href: href.to_string(),
            crs: asset.crs,
            transform: GeoTransform {
                origin_x: 300_000.0,
                origin_y: 6_200_040.0,
                pixel_width: 10.0,
                pixel_height: -10.0,
            },
            width: 10_980,
            height: 10_980,
            nodata: Some(0.0),
        })
    }

    async fn windowed_read(
        &self,
        asset: &AssetInfo,
        request: &ReadRequest,
    ) -> Result<PixelGrid, EngineError> {
        self.reads
            .lock()
            .unwrap()
            .push((asset.href.clone(), request.clone()));

        if self.hang_reads {
            futures::future::pending::<()>().await;
        }

        let synthetic = self
            .assets
            .get(&asset.href)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(asset.href.clone()))?;
        if !synthetic.read_delay.is_zero() {
            tokio::time::sleep(synthetic.read_delay).await;
        }
        if synthetic.coverage == Coverage::Corrupt {
            return Err(EngineError::Failed(format!("cannot decode {}", asset.href)));
        }

        let fill = request.fill as f32;
        let half = request.width / 2;
        let mut data = Vec::with_capacity(request.width * request.height);
        for _row in 0..request.height {
            for col in 0..request.width {
                let covered = match synthetic.coverage {
                    Coverage::LeftHalf => col < half,
                    Coverage::RightHalf => col >= half,
                    _ => true,
                };
                data.push(if covered { synthetic.value } else { fill });
            }
        }

        Ok(PixelGrid {
            width: request.width,
            height: request.height,
            crs: request.crs,
            data,
        })
    }

    fn release(&self, _asset: &AssetInfo) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Scenario builder
// ============================================================================

/// One band of a synthetic scene: provider asset key, pixel value, coverage.
pub type BandSpec<'a> = (&'a str, f32, Coverage);

/// Catalog and engine populated together, one scene at a time.
#[derive(Default)]
pub struct World {
    pub catalog: MockCatalog,
    pub engine: SyntheticEngine,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(
        self,
        url: &str,
        id: &str,
        datetime: &str,
        cloud: Option<f64>,
        bands: &[BandSpec<'_>],
    ) -> Self {
        self.scene_with(url, id, datetime, cloud, bands, Epsg::utm(33, true), Duration::ZERO)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn scene_with(
        mut self,
        url: &str,
        id: &str,
        datetime: &str,
        cloud: Option<f64>,
        bands: &[BandSpec<'_>],
        crs: Epsg,
        read_delay: Duration,
    ) -> Self {
        let hrefs: Vec<(String, String)> = bands
            .iter()
            .map(|(key, _, _)| (key.to_string(), format!("mem://{}/{}.tif", id, key)))
            .collect();

        for ((_, value, coverage), (_, href)) in bands.iter().zip(&hrefs) {
            self.engine.insert(
                href.clone(),
                SyntheticAsset {
                    value: *value,
                    coverage: *coverage,
                    crs,
                    read_delay,
                },
            );
        }

        let assets: Vec<(&str, &str)> = hrefs.iter().map(|(k, h)| (k.as_str(), h.as_str())).collect();
        self.catalog
            .add(url, stac_feature(id, datetime, TILE_BBOX, cloud, &assets));
        self
    }

    /// Reads never complete.
    pub fn hanging_reads(mut self) -> Self {
        self.engine.hang_reads = true;
        self
    }

    pub fn build(self) -> (Pipeline, Arc<MockCatalog>, Arc<SyntheticEngine>) {
        let catalog = Arc::new(self.catalog);
        let engine = Arc::new(self.engine);
        let pipeline = Pipeline::new(catalog.clone(), engine.clone(), config());
        (pipeline, catalog, engine)
    }
}
