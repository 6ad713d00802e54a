//! Element 84 Earth Search STAC adapter.
//!
//! Earth Search names Sentinel-2 assets by common name ("red", "nir08")
//! rather than band code, so assets are looked up through the binding's
//! key table. The cloud ceiling is left to the coordinator's client-side
//! filter.

use serde_json::{json, Map, Value};

use crate::bands::ResolvedBandSet;
use crate::item::CatalogItem;
use crate::profile::ProductKind;
use crate::query::Query;
use crate::stac::{ItemCollection, PageRequest};

use super::{base_body, normalize_item, tile_clauses, AdapterSpec};

#[derive(Debug, Clone)]
pub struct EarthSearchAdapter {
    pub(super) spec: AdapterSpec,
}

impl EarthSearchAdapter {
    pub fn new(spec: AdapterSpec) -> Self {
        Self { spec }
    }

    pub fn build_search_request(&self, query: &Query, _bands: &ResolvedBandSet) -> PageRequest {
        let mut body = base_body(&self.spec, query);

        if let (Some(tile), Some(scheme)) = (query.tile(), self.spec.binding.tile_search.as_ref()) {
            let filters: Map<String, Value> = tile_clauses(scheme, tile).into_iter().collect();
            body.insert("query".into(), Value::Object(filters));
        }

        if query.sort && self.spec.kind != ProductKind::Static {
            body.insert(
                "sortby".into(),
                json!([{ "field": "properties.datetime", "direction": "asc" }]),
            );
        }

        PageRequest::post(self.spec.endpoint.clone(), Value::Object(body))
    }

    pub fn normalize(&self, page: &ItemCollection, bands: &ResolvedBandSet) -> Vec<CatalogItem> {
        page.features
            .iter()
            .filter_map(|item| normalize_item(&self.spec, item, bands))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::BandResolver;
    use crate::profile::{profile, Provider};
    use crate::provider::{CatalogEndpoints, ProviderAdapter};
    use sat_common::{AreaOfInterest, TimeRange};

    fn s2_fan_out_query() -> Query {
        Query::builder("S2", AreaOfInterest::buffered_point(12.5683, 55.6761, 0.0005))
            .time_range(TimeRange::from_strings("2024-06-01", "2024-06-15").unwrap())
            .bands(["B08", "red"])
            .cloud_coverage(30.0)
            .tile("33UUB")
            .build()
            .unwrap()
    }

    fn earth_search_adapter(q: &Query) -> (ProviderAdapter, ResolvedBandSet) {
        let p = profile("S2").unwrap();
        let bands = BandResolver::resolve(p, q.bands.as_deref()).unwrap();
        let binding = p.binding(Provider::EarthSearch).unwrap();
        let adapter = ProviderAdapter::new(p, binding, q, &CatalogEndpoints::default(), 100).unwrap();
        (adapter, bands)
    }

    #[test]
    fn test_request_uses_grid_code_and_no_cloud_query() {
        let q = s2_fan_out_query();
        let (adapter, bands) = earth_search_adapter(&q);
        let request = adapter.build_search_request(&q, &bands);
        let body = request.body.unwrap();

        assert!(request.url.contains("earth-search"));
        assert_eq!(body["query"]["grid:code"], json!({ "eq": "MGRS-33UUB" }));
        assert!(body["query"].get("eo:cloud_cover").is_none());
        assert_eq!(body["sortby"][0]["field"], "properties.datetime");
    }

    #[test]
    fn test_assets_mapped_back_to_native_codes() {
        let q = s2_fan_out_query();
        let (adapter, bands) = earth_search_adapter(&q);
        let page: ItemCollection = serde_json::from_value(json!({
            "features": [{
                "id": "S2B_33UUB_20240603_0_L2A",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[12.0, 55.0], [13.0, 55.0], [13.0, 56.0], [12.0, 56.0], [12.0, 55.0]]]
                },
                "properties": { "datetime": "2024-06-03T10:36:29Z", "eo:cloud_cover": 41.0 },
                "assets": {
                    "nir": { "href": "https://e84/nir.tif", "type": "image/tiff; application=geotiff" },
                    "red": { "href": "https://e84/red.tif" }
                }
            }]
        }))
        .unwrap();

        let items = adapter.normalize(&page, &bands);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].provider, Provider::EarthSearch);
        assert_eq!(items[0].collection, "sentinel-2-l2a");
        assert_eq!(items[0].asset("B08").unwrap().href, "https://e84/nir.tif");
        assert_eq!(items[0].asset("B04").unwrap().href, "https://e84/red.tif");
        assert_eq!(items[0].cloud_cover, Some(41.0));
    }
}
