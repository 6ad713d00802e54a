//! Microsoft Planetary Computer STAC adapter.
//!
//! Planetary Computer supports the STAC `query` extension, so both tile
//! selection and the cloud ceiling are evaluated server-side. Asset keys
//! equal the native band names of every collection used here.

use serde_json::{json, Map, Value};

use crate::bands::ResolvedBandSet;
use crate::item::CatalogItem;
use crate::profile::ProductKind;
use crate::query::Query;
use crate::stac::{ItemCollection, PageRequest};

use super::{base_body, normalize_item, tile_clauses, AdapterSpec};

#[derive(Debug, Clone)]
pub struct PlanetaryComputerAdapter {
    pub(super) spec: AdapterSpec,
}

impl PlanetaryComputerAdapter {
    pub fn new(spec: AdapterSpec) -> Self {
        Self { spec }
    }

    pub fn build_search_request(&self, query: &Query, _bands: &ResolvedBandSet) -> PageRequest {
        let mut body = base_body(&self.spec, query);
        let mut filters = Map::new();

        if let (Some(tile), Some(scheme)) = (query.tile(), self.spec.binding.tile_search.as_ref()) {
            for (property, clause) in tile_clauses(scheme, tile) {
                filters.insert(property, clause);
            }
        }

        if self.spec.kind == ProductKind::Optical && self.spec.binding.server_side_cloud_filter {
            if let (Some(ceiling), Some(property)) =
                (query.cloud_coverage, self.spec.binding.cloud_property)
            {
                filters.insert(property.to_string(), json!({ "lte": ceiling }));
            }
        }

        if !filters.is_empty() {
            body.insert("query".into(), Value::Object(filters));
        }

        if query.sort && self.spec.kind != ProductKind::Static {
            body.insert(
                "sortby".into(),
                json!([{ "field": "datetime", "direction": "asc" }]),
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
    use crate::profile::profile;
    use crate::provider::{CatalogEndpoints, ProviderAdapter};
    use sat_common::{AreaOfInterest, TimeRange};

    fn adapter_and_request(q: &Query) -> (ProviderAdapter, PageRequest, ResolvedBandSet) {
        let p = profile(&q.satellite).unwrap();
        let bands = BandResolver::resolve(p, q.bands.as_deref()).unwrap();
        let adapter = ProviderAdapter::new(
            p,
            &p.providers[0],
            q,
            &CatalogEndpoints::all("http://localhost/search"),
            100,
        )
        .unwrap();
        let request = adapter.build_search_request(q, &bands);
        (adapter, request, bands)
    }

    fn june(satellite: &str) -> crate::query::QueryBuilder {
        Query::builder(
            satellite,
            AreaOfInterest::buffered_point(12.5683, 55.6761, 0.0005),
        )
        .time_range(TimeRange::from_strings("2024-06-01", "2024-06-15").unwrap())
    }

    #[test]
    fn test_sentinel2_request_body() {
        let q = june("S2MPC").cloud_coverage(20.0).tile("33UUB").build().unwrap();
        let (_, request, _) = adapter_and_request(&q);
        let body = request.body.unwrap();

        assert_eq!(request.url, "http://localhost/search");
        assert_eq!(body["collections"], json!(["sentinel-2-l2a"]));
        assert_eq!(body["datetime"], "2024-06-01T00:00:00Z/2024-06-15T23:59:59.999999Z");
        assert_eq!(body["query"]["eo:cloud_cover"], json!({ "lte": 20.0 }));
        assert_eq!(body["query"]["s2:mgrs_tile"], json!({ "eq": "33UUB" }));
        assert_eq!(body["intersects"]["type"], "Polygon");
        assert_eq!(body["sortby"][0]["field"], "datetime");
    }

    #[test]
    fn test_sar_ignores_cloud_ceiling() {
        let q = june("S1MPC").cloud_coverage(5.0).build().unwrap();
        let (_, request, _) = adapter_and_request(&q);
        assert!(request.body.unwrap().get("query").is_none());
    }

    #[test]
    fn test_normalize_keeps_requested_assets() {
        let q = june("S2MPC").bands(["nir", "red"]).build().unwrap();
        let (adapter, _, bands) = adapter_and_request(&q);
        let page: ItemCollection = serde_json::from_value(json!({
            "features": [{
                "id": "S2B_MSIL2A_20240603T103629_R008_T33UUB",
                "collection": "sentinel-2-l2a",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[12.0, 55.0], [13.0, 55.0], [13.0, 56.0], [12.0, 56.0], [12.0, 55.0]]]
                },
                "properties": { "datetime": "2024-06-03T10:36:29.024Z", "eo:cloud_cover": 7.5 },
                "assets": {
                    "B04": { "href": "https://pc/B04.tif" },
                    "B08": { "href": "https://pc/B08.tif" },
                    "B02": { "href": "https://pc/B02.tif" }
                }
            }, {
                "id": "broken",
                "properties": {},
                "assets": {}
            }]
        }))
        .unwrap();

        let items = adapter.normalize(&page, &bands);
        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.cloud_cover, Some(7.5));
        assert_eq!(item.assets.len(), 2);
        assert_eq!(item.asset("B08").unwrap().href, "https://pc/B08.tif");
        assert!(item.asset("B02").is_none());
    }
}
