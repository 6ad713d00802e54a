//! Common types and utilities shared across the satellite acquisition crates.

pub mod bbox;
pub mod crs;
pub mod dtype;
pub mod error;
pub mod geometry;
pub mod time;
pub mod transform;

pub use bbox::{BboxParseError, BoundingBox};
pub use crs::{CrsParseError, Epsg};
pub use dtype::DataType;
pub use error::{AcquisitionError, AcquisitionResult, QueryContext, QueryError, WithQueryContext};
pub use geometry::{AreaOfInterest, GeometryError};
pub use time::{TimeParseError, TimeRange};
pub use transform::GeoTransform;
