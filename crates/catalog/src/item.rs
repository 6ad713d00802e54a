//! Provider-agnostic catalog items.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use geo::MultiPolygon;

use crate::profile::Provider;

/// Reference to one raster asset of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub href: String,
    pub media_type: Option<String>,
}

/// One scene as returned by a provider, normalised.
///
/// Assets are keyed by the satellite's native band name regardless of how
/// the provider names them. Only the bands of the current query are kept.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogItem {
    pub id: String,
    pub provider: Provider,
    pub collection: String,
    pub datetime: DateTime<Utc>,
    pub footprint: MultiPolygon<f64>,
    pub cloud_cover: Option<f64>,
    pub assets: BTreeMap<String, AssetRef>,
}

/// Deduplication key: acquisition instant plus quantised footprint.
pub type ItemKey = (i64, u32, Vec<(i64, i64)>);

/// Footprint coordinates are compared at 1e-7 degrees (about 1 cm).
const FOOTPRINT_QUANTUM: f64 = 1e7;

impl CatalogItem {
    pub fn acquisition_day(&self) -> NaiveDate {
        self.datetime.date_naive()
    }

    pub fn asset(&self, native: &str) -> Option<&AssetRef> {
        self.assets.get(native)
    }

    /// Key identifying the same acquisition across pages or providers.
    pub fn dedup_key(&self) -> ItemKey {
        let coords = self
            .footprint
            .0
            .iter()
            .flat_map(|polygon| polygon.exterior().coords())
            .map(|c| {
                (
                    (c.x * FOOTPRINT_QUANTUM).round() as i64,
                    (c.y * FOOTPRINT_QUANTUM).round() as i64,
                )
            })
            .collect();
        (
            self.datetime.timestamp(),
            self.datetime.timestamp_subsec_micros(),
            coords,
        )
    }

    /// Whether the item passes a cloud ceiling. Items without a cloud
    /// value cannot be judged and are kept.
    pub fn within_cloud_ceiling(&self, ceiling: f64) -> bool {
        self.cloud_cover.map_or(true, |cc| cc <= ceiling)
    }
}
