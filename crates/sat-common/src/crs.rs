//! Coordinate Reference System codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An EPSG coordinate reference system code.
///
/// The pipeline only ever works in two families: WGS84 geographic
/// (EPSG:4326) for query geometries and footprints, and WGS84 / UTM
/// (EPSG:326zz north, EPSG:327zz south) for assembled rasters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Epsg(pub u32);

impl Epsg {
    /// WGS84 Geographic (lon/lat in degrees)
    pub const WGS84: Epsg = Epsg(4326);

    /// WGS84 / UTM code for a zone (1-60) and hemisphere.
    pub fn utm(zone: u8, north: bool) -> Self {
        let base = if north { 32600 } else { 32700 };
        Epsg(base + zone as u32)
    }

    /// Zone number and hemisphere if this is a WGS84 / UTM code.
    pub fn utm_zone(&self) -> Option<(u8, bool)> {
        match self.0 {
            32601..=32660 => Some(((self.0 - 32600) as u8, true)),
            32701..=32760 => Some(((self.0 - 32700) as u8, false)),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        self.0
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self.0, 4326 | 4269 | 4258)
    }

    /// Parse "EPSG:32633", "epsg:32633" or a bare "32633".
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let trimmed = s.trim();
        let digits = match trimmed.split_once(':') {
            Some((authority, code)) if authority.eq_ignore_ascii_case("EPSG") => code,
            Some(_) => return Err(CrsParseError::UnsupportedCrs(s.to_string())),
            None => trimmed,
        };
        digits
            .parse::<u32>()
            .map(Epsg)
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))
    }
}

impl fmt::Display for Epsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utm_codes() {
        assert_eq!(Epsg::utm(33, true), Epsg(32633));
        assert_eq!(Epsg::utm(23, false), Epsg(32723));
        assert_eq!(Epsg(32633).utm_zone(), Some((33, true)));
        assert_eq!(Epsg(32723).utm_zone(), Some((23, false)));
        assert_eq!(Epsg::WGS84.utm_zone(), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Epsg::parse("EPSG:32633").unwrap(), Epsg(32633));
        assert_eq!(Epsg::parse("epsg:4326").unwrap(), Epsg::WGS84);
        assert_eq!(Epsg::parse("3857").unwrap(), Epsg(3857));
        assert!(Epsg::parse("CRS:84").is_err());
        assert_eq!(Epsg(32633).to_string(), "EPSG:32633");
    }
}
