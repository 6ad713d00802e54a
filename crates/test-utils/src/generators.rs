//! Builders for STAC payloads and synthetic pixel grids.

use serde_json::{json, Map, Value};

/// A STAC item whose footprint is the rectangle `bbox` = (min_lon, min_lat, max_lon, max_lat).
///
/// `assets` pairs an asset key with its href. `cloud` is written to
/// `eo:cloud_cover` when present.
///
/// # Example
///
/// ```
/// use test_utils::stac_feature;
///
/// let item = stac_feature(
///     "S2B_33UUB_20240603",
///     "2024-06-03T10:36:29Z",
///     (12.0, 55.0, 13.0, 56.0),
///     Some(12.5),
///     &[("B04", "mem://B04.tif")],
/// );
/// assert_eq!(item["properties"]["eo:cloud_cover"], 12.5);
/// ```
pub fn stac_feature(
    id: &str,
    datetime: &str,
    bbox: (f64, f64, f64, f64),
    cloud: Option<f64>,
    assets: &[(&str, &str)],
) -> Value {
    let (x0, y0, x1, y1) = bbox;
    let mut properties = Map::new();
    properties.insert("datetime".into(), json!(datetime));
    if let Some(cloud) = cloud {
        properties.insert("eo:cloud_cover".into(), json!(cloud));
    }

    let assets: Map<String, Value> = assets
        .iter()
        .map(|(key, href)| {
            (
                key.to_string(),
                json!({ "href": href, "type": "image/tiff; application=geotiff; profile=cloud-optimized" }),
            )
        })
        .collect();

    json!({
        "type": "Feature",
        "stac_version": "1.0.0",
        "id": id,
        "bbox": [x0, y0, x1, y1],
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
        },
        "properties": properties,
        "assets": assets,
        "links": []
    })
}

/// An ItemCollection page with an optional `next` link object.
pub fn feature_collection(features: Vec<Value>, next: Option<Value>) -> Value {
    let links: Vec<Value> = next.into_iter().collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
        "links": links
    })
}

/// Row-major grid where each pixel is `base + row * width + col`.
pub fn ramp_grid(width: usize, height: usize, base: f32) -> Vec<f32> {
    (0..width * height).map(|i| base + i as f32).collect()
}

/// Grid whose left `valid_cols` columns hold `value` and the rest `fill`.
pub fn left_columns_grid(
    width: usize,
    height: usize,
    valid_cols: usize,
    value: f32,
    fill: f32,
) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for _ in 0..height {
        for col in 0..width {
            data.push(if col < valid_cols { value } else { fill });
        }
    }
    data
}
