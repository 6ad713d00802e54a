//! Provider adapters.
//!
//! A closed set of variants, one per catalog operator, selected from the
//! satellite profile's (satellite, provider) bindings. Each variant builds
//! its provider's search request and maps returned items onto
//! [`CatalogItem`]. Capability checks run when an adapter is constructed,
//! so an unsupported query fails before any request exists.

mod earth_search;
mod planetary_computer;

pub use earth_search::EarthSearchAdapter;
pub use planetary_computer::PlanetaryComputerAdapter;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use sat_common::geometry::multipolygon_from_geojson;
use sat_common::time::parse_datetime;
use sat_common::{AcquisitionError, AcquisitionResult};

use crate::bands::ResolvedBandSet;
use crate::item::{AssetRef, CatalogItem};
use crate::profile::{ProductKind, Provider, ProviderBinding, SatelliteProfile, TileScheme};
use crate::query::Query;
use crate::stac::{ItemCollection, PageRequest, StacItem};

/// Search endpoints per provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoints {
    pub planetary_computer: String,
    pub earth_search: String,
}

impl Default for CatalogEndpoints {
    fn default() -> Self {
        Self {
            planetary_computer: Provider::PlanetaryComputer.default_endpoint().to_string(),
            earth_search: Provider::EarthSearch.default_endpoint().to_string(),
        }
    }
}

impl CatalogEndpoints {
    /// Point every provider at the same base URL (used by local test servers).
    pub fn all(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            planetary_computer: url.clone(),
            earth_search: url,
        }
    }

    pub fn for_provider(&self, provider: Provider) -> &str {
        match provider {
            Provider::PlanetaryComputer => &self.planetary_computer,
            Provider::EarthSearch => &self.earth_search,
        }
    }
}

/// What every adapter knows about its (satellite, provider) binding.
#[derive(Debug, Clone)]
pub struct AdapterSpec {
    pub satellite: &'static str,
    pub kind: ProductKind,
    pub binding: ProviderBinding,
    pub endpoint: String,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub enum ProviderAdapter {
    PlanetaryComputer(PlanetaryComputerAdapter),
    EarthSearch(EarthSearchAdapter),
}

impl ProviderAdapter {
    /// Adapter for one binding, after checking the query against its capabilities.
    pub fn new(
        profile: &'static SatelliteProfile,
        binding: &ProviderBinding,
        query: &Query,
        endpoints: &CatalogEndpoints,
        page_size: usize,
    ) -> AcquisitionResult<Self> {
        check_capabilities(profile, binding, query)?;

        let spec = AdapterSpec {
            satellite: profile.id,
            kind: profile.kind,
            binding: binding.clone(),
            endpoint: endpoints.for_provider(binding.provider).to_string(),
            page_size: page_size.max(1),
        };

        Ok(match binding.provider {
            Provider::PlanetaryComputer => {
                ProviderAdapter::PlanetaryComputer(PlanetaryComputerAdapter::new(spec))
            }
            Provider::EarthSearch => ProviderAdapter::EarthSearch(EarthSearchAdapter::new(spec)),
        })
    }

    /// All adapters implied by the profile, in fan-out order.
    pub fn for_query(
        profile: &'static SatelliteProfile,
        query: &Query,
        endpoints: &CatalogEndpoints,
        page_size: usize,
    ) -> AcquisitionResult<Vec<Self>> {
        profile
            .providers
            .iter()
            .map(|binding| Self::new(profile, binding, query, endpoints, page_size))
            .collect()
    }

    fn spec(&self) -> &AdapterSpec {
        match self {
            ProviderAdapter::PlanetaryComputer(a) => &a.spec,
            ProviderAdapter::EarthSearch(a) => &a.spec,
        }
    }

    pub fn provider(&self) -> Provider {
        self.spec().binding.provider
    }

    pub fn binding(&self) -> &ProviderBinding {
        &self.spec().binding
    }

    pub fn build_search_request(&self, query: &Query, bands: &ResolvedBandSet) -> PageRequest {
        match self {
            ProviderAdapter::PlanetaryComputer(a) => a.build_search_request(query, bands),
            ProviderAdapter::EarthSearch(a) => a.build_search_request(query, bands),
        }
    }

    pub fn normalize(&self, page: &ItemCollection, bands: &ResolvedBandSet) -> Vec<CatalogItem> {
        match self {
            ProviderAdapter::PlanetaryComputer(a) => a.normalize(page, bands),
            ProviderAdapter::EarthSearch(a) => a.normalize(page, bands),
        }
    }

    pub fn next_request(&self, page: &ItemCollection, previous: &PageRequest) -> Option<PageRequest> {
        page.next_request(previous)
    }
}

fn check_capabilities(
    profile: &SatelliteProfile,
    binding: &ProviderBinding,
    query: &Query,
) -> AcquisitionResult<()> {
    if let Some(tile) = query.tile() {
        match binding.tile_search {
            None => {
                return Err(AcquisitionError::unsupported(
                    profile.id,
                    binding.provider.as_str(),
                    "tile search",
                ))
            }
            Some(scheme) => validate_tile(&scheme, tile)?,
        }
    }

    if query.cloud_coverage.is_some() && !profile.applies_cloud_filter() {
        debug!(
            satellite = profile.id,
            "Ignoring cloud coverage filter for non-optical product"
        );
    }
    if query.time_range.is_some() && !profile.applies_time_filter() {
        debug!(satellite = profile.id, "Ignoring time range for static product");
    }

    Ok(())
}

fn validate_tile(scheme: &TileScheme, tile: &str) -> AcquisitionResult<()> {
    let valid = match scheme {
        TileScheme::Mgrs { .. } => {
            let bytes = tile.as_bytes();
            bytes.len() == 5
                && bytes[..2].iter().all(u8::is_ascii_digit)
                && bytes[2..].iter().all(u8::is_ascii_uppercase)
        }
        TileScheme::Wrs2 { .. } => tile.len() == 6 && tile.bytes().all(|b| b.is_ascii_digit()),
    };

    if valid {
        Ok(())
    } else {
        Err(AcquisitionError::invalid(format!(
            "tile id '{}' does not match the {} grid",
            tile,
            match scheme {
                TileScheme::Mgrs { .. } => "MGRS",
                TileScheme::Wrs2 { .. } => "WRS-2 PPPRRR",
            }
        )))
    }
}

/// STAC `query` extension clauses selecting one tile.
pub(crate) fn tile_clauses(scheme: &TileScheme, tile: &str) -> Vec<(String, Value)> {
    match scheme {
        TileScheme::Mgrs { property, prefix } => {
            vec![(property.to_string(), json!({ "eq": format!("{}{}", prefix, tile) }))]
        }
        TileScheme::Wrs2 {
            path_property,
            row_property,
        } => vec![
            (path_property.to_string(), json!({ "eq": &tile[..3] })),
            (row_property.to_string(), json!({ "eq": &tile[3..] })),
        ],
    }
}

/// Request body fields common to every STAC API.
pub(crate) fn base_body(spec: &AdapterSpec, query: &Query) -> Map<String, Value> {
    let limit = query
        .max_items
        .map_or(spec.page_size, |max| max.min(spec.page_size));

    let mut body = Map::new();
    body.insert("collections".into(), json!([spec.binding.collection]));
    body.insert("intersects".into(), query.aoi.to_geojson());
    body.insert("limit".into(), json!(limit));

    if spec.kind != ProductKind::Static {
        if let Some(range) = &query.time_range {
            body.insert("datetime".into(), json!(range.to_interval()));
        }
    }
    body
}

fn item_datetime(item: &StacItem) -> Option<DateTime<Utc>> {
    ["datetime", "start_datetime"]
        .iter()
        .filter_map(|key| item.property_str(key))
        .find_map(|s| parse_datetime(s).ok())
}

/// Map a STAC item onto a [`CatalogItem`], keeping only the query's bands.
pub(crate) fn normalize_item(
    spec: &AdapterSpec,
    item: &StacItem,
    bands: &ResolvedBandSet,
) -> Option<CatalogItem> {
    let datetime = match item_datetime(item) {
        Some(dt) => dt,
        None => {
            warn!(item_id = %item.id, provider = %spec.binding.provider, "Skipping item without datetime");
            return None;
        }
    };

    let footprint = match item.geometry.as_ref().map(multipolygon_from_geojson) {
        Some(Ok(footprint)) => footprint,
        Some(Err(e)) => {
            warn!(item_id = %item.id, error = %e, "Skipping item with invalid footprint");
            return None;
        }
        None => {
            warn!(item_id = %item.id, "Skipping item without footprint");
            return None;
        }
    };

    let mut assets = BTreeMap::new();
    for native in bands.natives() {
        let key = spec.binding.asset_key(&native);
        if let Some(asset) = item.assets.get(key) {
            assets.insert(
                native.clone(),
                AssetRef {
                    href: asset.href.clone(),
                    media_type: asset.media_type.clone(),
                },
            );
        }
    }

    let cloud_cover = spec
        .binding
        .cloud_property
        .and_then(|property| item.property_f64(property));

    Some(CatalogItem {
        id: item.id.clone(),
        provider: spec.binding.provider,
        collection: item
            .collection
            .clone()
            .unwrap_or_else(|| spec.binding.collection.to_string()),
        datetime,
        footprint,
        cloud_cover,
        assets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::BandResolver;
    use crate::profile::profile;
    use sat_common::{AreaOfInterest, TimeRange};

    fn query(satellite: &str) -> crate::query::QueryBuilder {
        Query::builder(
            satellite,
            AreaOfInterest::buffered_point(12.5683, 55.6761, 0.0005),
        )
        .time_range(TimeRange::from_strings("2024-06-01", "2024-06-15").unwrap())
    }

    #[test]
    fn test_tile_search_rejected_without_scheme() {
        let s1 = profile("S1MPC").unwrap();
        let q = query("S1MPC").tile("33UUB").build().unwrap();
        let err = ProviderAdapter::for_query(s1, &q, &CatalogEndpoints::default(), 100)
            .unwrap_err();
        match err {
            AcquisitionError::UnsupportedCapability {
                satellite,
                capability,
                ..
            } => {
                assert_eq!(satellite, "S1MPC");
                assert_eq!(capability, "tile search");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_tile_format_validated() {
        let s2 = profile("S2MPC").unwrap();
        let q = query("S2MPC").tile("33uub").build().unwrap();
        assert!(matches!(
            ProviderAdapter::for_query(s2, &q, &CatalogEndpoints::default(), 100),
            Err(AcquisitionError::InvalidQuery(_))
        ));

        let landsat = profile("LANDSATMPC").unwrap();
        let q = query("LANDSATMPC").tile("194021").build().unwrap();
        assert!(ProviderAdapter::for_query(landsat, &q, &CatalogEndpoints::default(), 100).is_ok());
    }

    #[test]
    fn test_fan_out_builds_one_adapter_per_binding() {
        let s2 = profile("S2").unwrap();
        let q = query("S2").build().unwrap();
        let adapters = ProviderAdapter::for_query(s2, &q, &CatalogEndpoints::default(), 50).unwrap();
        let providers: Vec<Provider> = adapters.iter().map(|a| a.provider()).collect();
        assert_eq!(providers, vec![Provider::PlanetaryComputer, Provider::EarthSearch]);
    }

    #[test]
    fn test_static_product_drops_datetime() {
        let dem = profile("COPDEM30MPC").unwrap();
        let q = query("COPDEM30MPC").build().unwrap();
        let bands = BandResolver::resolve(dem, None).unwrap();
        let adapters = ProviderAdapter::for_query(dem, &q, &CatalogEndpoints::default(), 10).unwrap();
        let request = adapters[0].build_search_request(&q, &bands);
        let body = request.body.unwrap();
        assert!(body.get("datetime").is_none());
        assert_eq!(body["collections"][0], "cop-dem-glo-30");
    }

    #[test]
    fn test_wrs_tile_clauses() {
        let scheme = TileScheme::Wrs2 {
            path_property: "landsat:wrs_path",
            row_property: "landsat:wrs_row",
        };
        let clauses = tile_clauses(&scheme, "194021");
        assert_eq!(clauses[0].1, json!({ "eq": "194" }));
        assert_eq!(clauses[1].1, json!({ "eq": "021" }));
    }
}
