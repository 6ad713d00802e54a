//! Query geometries and GeoJSON conversion.

use geo::{BoundingRect, Centroid, Coord, LineString, MultiPolygon, Polygon};
use serde_json::{json, Value};
use thiserror::Error;

use crate::bbox::BoundingBox;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("Unsupported GeoJSON geometry type: {0}")]
    UnsupportedType(String),

    #[error("Malformed GeoJSON: {0}")]
    Malformed(String),

    #[error("Polygon needs at least 3 distinct vertices")]
    TooFewVertices,
}

/// Area of interest in geographic (EPSG:4326) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum AreaOfInterest {
    Polygon(Polygon<f64>),
    BoundingBox(BoundingBox),
}

impl AreaOfInterest {
    /// Square polygon of half-width `buffer` degrees around a point.
    pub fn buffered_point(lon: f64, lat: f64, buffer: f64) -> Self {
        AreaOfInterest::BoundingBox(BoundingBox::new(
            lon - buffer,
            lat - buffer,
            lon + buffer,
            lat + buffer,
        ))
    }

    pub fn from_exterior(coords: &[(f64, f64)]) -> Result<Self, GeometryError> {
        let mut distinct: Vec<(f64, f64)> = Vec::with_capacity(coords.len());
        for &c in coords {
            if !distinct.contains(&c) {
                distinct.push(c);
            }
        }
        if distinct.len() < 3 {
            return Err(GeometryError::TooFewVertices);
        }
        let ring: LineString<f64> = coords.iter().map(|&(x, y)| Coord { x, y }).collect();
        Ok(AreaOfInterest::Polygon(Polygon::new(ring, vec![])))
    }

    /// Parse a GeoJSON Polygon, a Feature wrapping one, or a single-member MultiPolygon.
    pub fn from_geojson(value: &Value) -> Result<Self, GeometryError> {
        let geometry = match value.get("type").and_then(Value::as_str) {
            Some("Feature") => value
                .get("geometry")
                .ok_or_else(|| GeometryError::Malformed("feature without geometry".into()))?,
            _ => value,
        };

        let polygons = multipolygon_from_geojson(geometry)?;
        match polygons.0.as_slice() {
            [polygon] => Ok(AreaOfInterest::Polygon(polygon.clone())),
            _ => Err(GeometryError::UnsupportedType(
                "MultiPolygon with more than one member".into(),
            )),
        }
    }

    /// Exterior geometry as a polygon.
    pub fn polygon(&self) -> Polygon<f64> {
        match self {
            AreaOfInterest::Polygon(polygon) => polygon.clone(),
            AreaOfInterest::BoundingBox(bbox) => bbox.to_polygon(),
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        match self {
            AreaOfInterest::BoundingBox(bbox) => *bbox,
            AreaOfInterest::Polygon(polygon) => polygon
                .bounding_rect()
                .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y))
                .unwrap_or_else(|| BoundingBox::new(0.0, 0.0, 0.0, 0.0)),
        }
    }

    /// Centroid (lon, lat) of the geometry.
    pub fn centroid(&self) -> (f64, f64) {
        match self {
            AreaOfInterest::BoundingBox(bbox) => bbox.center(),
            AreaOfInterest::Polygon(polygon) => polygon
                .centroid()
                .map(|p| (p.x(), p.y()))
                .unwrap_or_else(|| self.bbox().center()),
        }
    }

    /// GeoJSON representation for STAC `intersects` filters.
    pub fn to_geojson(&self) -> Value {
        let polygon = self.polygon();
        let mut rings = vec![ring_coords(polygon.exterior())];
        rings.extend(polygon.interiors().iter().map(ring_coords));
        json!({ "type": "Polygon", "coordinates": rings })
    }

    /// Short human readable description used in diagnostics.
    pub fn summary(&self) -> String {
        match self {
            AreaOfInterest::BoundingBox(b) => format!(
                "bbox({:.6},{:.6},{:.6},{:.6})",
                b.min_x, b.min_y, b.max_x, b.max_y
            ),
            AreaOfInterest::Polygon(p) => {
                let b = self.bbox();
                format!(
                    "polygon[{} vertices] within ({:.6},{:.6},{:.6},{:.6})",
                    p.exterior().0.len(),
                    b.min_x,
                    b.min_y,
                    b.max_x,
                    b.max_y
                )
            }
        }
    }
}

fn ring_coords(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| json!([c.x, c.y])).collect())
}

fn parse_ring(value: &Value) -> Result<LineString<f64>, GeometryError> {
    let positions = value
        .as_array()
        .ok_or_else(|| GeometryError::Malformed("ring is not an array".into()))?;

    positions
        .iter()
        .map(|position| {
            let x = position.get(0).and_then(Value::as_f64);
            let y = position.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => Err(GeometryError::Malformed(format!(
                    "invalid position {}",
                    position
                ))),
            }
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>, GeometryError> {
    let rings = value
        .as_array()
        .ok_or_else(|| GeometryError::Malformed("polygon is not an array of rings".into()))?;
    let mut parsed = rings.iter().map(parse_ring);
    let exterior = parsed
        .next()
        .ok_or_else(|| GeometryError::Malformed("polygon without exterior ring".into()))??;
    let interiors = parsed.collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Convert a GeoJSON Polygon or MultiPolygon geometry into a MultiPolygon.
pub fn multipolygon_from_geojson(value: &Value) -> Result<MultiPolygon<f64>, GeometryError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| GeometryError::Malformed("missing geometry type".into()))?;
    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| GeometryError::Malformed("missing coordinates".into()))?;

    match kind {
        "Polygon" => Ok(MultiPolygon::new(vec![parse_polygon(coordinates)?])),
        "MultiPolygon" => {
            let members = coordinates
                .as_array()
                .ok_or_else(|| GeometryError::Malformed("multipolygon is not an array".into()))?;
            members
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>, _>>()
                .map(MultiPolygon::new)
        }
        other => Err(GeometryError::UnsupportedType(other.to_string())),
    }
}
