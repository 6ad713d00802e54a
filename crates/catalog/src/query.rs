//! Strongly typed acquisition query.

use serde::{Deserialize, Serialize};

use sat_common::{
    AcquisitionError, AcquisitionResult, AreaOfInterest, DataType, QueryContext, TimeRange,
};

use crate::profile::profile;

/// How the catalog is searched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Items intersecting the query geometry.
    Geometry,
    /// Items of one grid tile (MGRS for Sentinel-2, WRS-2 path/row for Landsat).
    Tile(String),
}

/// How each item is cut to the area of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipMethod {
    /// Exact polygon mask on the minimal bounding grid at native resolution.
    Geometry,
    /// Fixed `pixels` x `pixels` window centred on the bounding box.
    Window { pixels: u32 },
}

/// Temporal grouping of items into time steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingMode {
    /// Merge overlapping acquisitions of the same UTC day.
    #[default]
    SolarDay,
    /// Every item is its own time step.
    None,
}

/// A validated acquisition query.
///
/// Constructed through [`Query::builder`]; the builder enforces every
/// primitive constraint, so a `Query` value is always internally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub satellite: String,
    pub aoi: AreaOfInterest,
    /// `None` only for static products.
    pub time_range: Option<TimeRange>,
    /// `None` means the profile default bands.
    pub bands: Option<Vec<String>>,
    /// Maximum cloud cover percentage (0-100).
    pub cloud_coverage: Option<f64>,
    pub search_method: SearchMethod,
    pub clip_method: ClipMethod,
    pub grouping: GroupingMode,
    /// Sort items by acquisition time; otherwise keep provider order.
    pub sort: bool,
    pub max_items: Option<usize>,
    pub dtype: Option<DataType>,
    pub fill_value: Option<f64>,
}

impl Query {
    pub fn builder(satellite: impl Into<String>, aoi: AreaOfInterest) -> QueryBuilder {
        QueryBuilder::new(satellite, aoi)
    }

    /// Parameters attached to every failure of this query.
    pub fn context(&self) -> QueryContext {
        QueryContext {
            satellite: self.satellite.clone(),
            geometry: self.aoi.summary(),
            date_range: self.time_range.as_ref().map(TimeRange::summary),
            bands: self.bands.clone().unwrap_or_else(|| vec!["<default>".to_string()]),
        }
    }

    pub fn tile(&self) -> Option<&str> {
        match &self.search_method {
            SearchMethod::Tile(tile) => Some(tile.as_str()),
            SearchMethod::Geometry => None,
        }
    }
}

/// Builder for [`Query`].
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new(satellite: impl Into<String>, aoi: AreaOfInterest) -> Self {
        Self {
            query: Query {
                satellite: satellite.into(),
                aoi,
                time_range: None,
                bands: None,
                cloud_coverage: None,
                search_method: SearchMethod::Geometry,
                clip_method: ClipMethod::Geometry,
                grouping: GroupingMode::SolarDay,
                sort: true,
                max_items: None,
                dtype: None,
                fill_value: None,
            },
        }
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.query.time_range = Some(range);
        self
    }

    pub fn bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.bands = Some(bands.into_iter().map(Into::into).collect());
        self
    }

    pub fn cloud_coverage(mut self, percent: f64) -> Self {
        self.query.cloud_coverage = Some(percent);
        self
    }

    pub fn tile(mut self, tile: impl Into<String>) -> Self {
        self.query.search_method = SearchMethod::Tile(tile.into());
        self
    }

    pub fn clip_window(mut self, pixels: u32) -> Self {
        self.query.clip_method = ClipMethod::Window { pixels };
        self
    }

    pub fn clip_geometry(mut self) -> Self {
        self.query.clip_method = ClipMethod::Geometry;
        self
    }

    pub fn grouping(mut self, mode: GroupingMode) -> Self {
        self.query.grouping = mode;
        self
    }

    pub fn sort(mut self, sort: bool) -> Self {
        self.query.sort = sort;
        self
    }

    pub fn max_items(mut self, max_items: usize) -> Self {
        self.query.max_items = Some(max_items);
        self
    }

    pub fn dtype(mut self, dtype: DataType) -> Self {
        self.query.dtype = Some(dtype);
        self
    }

    pub fn fill_value(mut self, fill: f64) -> Self {
        self.query.fill_value = Some(fill);
        self
    }

    /// Validate and produce the query.
    pub fn build(self) -> AcquisitionResult<Query> {
        let mut query = self.query;
        let profile = profile(&query.satellite)?;

        if let Some(cloud) = query.cloud_coverage {
            if !cloud.is_finite() || !(0.0..=100.0).contains(&cloud) {
                return Err(AcquisitionError::invalid(format!(
                    "cloud_coverage must be within 0-100, got {}",
                    cloud
                )));
            }
        }

        match &query.time_range {
            Some(range) if range.start > range.end => {
                return Err(AcquisitionError::invalid(format!(
                    "start {} is after end {}",
                    range.start, range.end
                )));
            }
            None if profile.applies_time_filter() => {
                return Err(AcquisitionError::invalid(format!(
                    "a time range is required for {}",
                    profile.id
                )));
            }
            _ => {}
        }

        if let SearchMethod::Tile(tile) = &query.search_method {
            let trimmed = tile.trim();
            if trimmed.is_empty() {
                return Err(AcquisitionError::invalid("tile id must not be empty"));
            }
            query.search_method = SearchMethod::Tile(trimmed.to_string());
        }

        if let ClipMethod::Window { pixels: 0 } = query.clip_method {
            return Err(AcquisitionError::invalid("window clip needs pixels > 0"));
        }

        if query.max_items == Some(0) {
            return Err(AcquisitionError::invalid("max_items must be > 0"));
        }

        if let Some(bands) = &query.bands {
            if bands.iter().any(|b| b.trim().is_empty()) {
                return Err(AcquisitionError::invalid("band names must not be empty"));
            }
        }

        let bbox = query.aoi.bbox();
        if bbox.width() <= 0.0 && bbox.height() <= 0.0 {
            return Err(AcquisitionError::invalid("area of interest is empty"));
        }
        if bbox.min_y < -90.0 || bbox.max_y > 90.0 || bbox.min_x < -180.0 || bbox.max_x > 180.0 {
            return Err(AcquisitionError::invalid(format!(
                "area of interest {} is outside geographic bounds",
                query.aoi.summary()
            )));
        }

        let dtype = query.dtype.unwrap_or(profile.dtype);
        let fill = query.fill_value.unwrap_or(profile.nodata);
        if !dtype.can_represent(fill) {
            return Err(AcquisitionError::invalid(format!(
                "fill value {} does not fit dtype {}",
                fill, dtype
            )));
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sat_common::time::parse_datetime;

    fn june() -> TimeRange {
        TimeRange::from_strings("2024-06-01", "2024-06-15").unwrap()
    }

    fn aoi() -> AreaOfInterest {
        AreaOfInterest::buffered_point(12.5683, 55.6761, 0.0005)
    }

    #[test]
    fn test_defaults() {
        let query = Query::builder("S2MPC", aoi()).time_range(june()).build().unwrap();
        assert_eq!(query.search_method, SearchMethod::Geometry);
        assert_eq!(query.clip_method, ClipMethod::Geometry);
        assert_eq!(query.grouping, GroupingMode::SolarDay);
        assert!(query.sort);
        assert!(query.bands.is_none());
    }

    #[test]
    fn test_unknown_satellite() {
        let err = Query::builder("NOPE", aoi()).time_range(june()).build().unwrap_err();
        assert!(matches!(err, AcquisitionError::UnknownSatellite { .. }));
    }

    #[test]
    fn test_cloud_range_enforced() {
        for bad in [-1.0, 100.5, f64::NAN] {
            let err = Query::builder("S2MPC", aoi())
                .time_range(june())
                .cloud_coverage(bad)
                .build()
                .unwrap_err();
            assert!(matches!(err, AcquisitionError::InvalidQuery(_)));
        }
    }

    #[test]
    fn test_time_range_required_unless_static() {
        let err = Query::builder("S2MPC", aoi()).build().unwrap_err();
        assert!(matches!(err, AcquisitionError::InvalidQuery(_)));

        assert!(Query::builder("COPDEM30MPC", aoi()).build().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let range = TimeRange::new(
            parse_datetime("2024-06-10").unwrap(),
            parse_datetime("2024-06-01").unwrap(),
        );
        assert!(Query::builder("S2MPC", aoi()).time_range(range).build().is_err());
    }

    #[test]
    fn test_window_and_tile_validation() {
        assert!(Query::builder("S2MPC", aoi())
            .time_range(june())
            .clip_window(0)
            .build()
            .is_err());
        assert!(Query::builder("S2MPC", aoi())
            .time_range(june())
            .tile("  ")
            .build()
            .is_err());

        let query = Query::builder("S2MPC", aoi())
            .time_range(june())
            .tile(" 33UUB ")
            .build()
            .unwrap();
        assert_eq!(query.tile(), Some("33UUB"));
    }

    #[test]
    fn test_fill_must_fit_dtype() {
        let err = Query::builder("S2MPC", aoi())
            .time_range(june())
            .fill_value(-9999.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::InvalidQuery(_)));

        assert!(Query::builder("S2MPC", aoi())
            .time_range(june())
            .dtype(DataType::Float32)
            .fill_value(-9999.0)
            .build()
            .is_ok());
    }

    #[test]
    fn test_context_summary() {
        let query = Query::builder("S2MPC", aoi())
            .time_range(june())
            .bands(["red", "nir"])
            .build()
            .unwrap();
        let ctx = query.context();
        assert_eq!(ctx.satellite, "S2MPC");
        assert_eq!(ctx.date_range.as_deref(), Some("2024-06-01/2024-06-15"));
        assert_eq!(ctx.bands, vec!["red".to_string(), "nir".to_string()]);
        assert!(ctx.geometry.starts_with("bbox("));
    }
}
