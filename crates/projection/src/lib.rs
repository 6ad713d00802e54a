//! Coordinate reference system transformations.
//!
//! Implements the WGS84 Transverse Mercator projection from scratch without
//! external dependencies. The acquisition pipeline uses it to choose a UTM
//! target frame for each query and to lay out pixel grids in that frame.

pub mod utm;

pub use utm::{utm_crs_for, utm_zone_for, TransverseMercator};
