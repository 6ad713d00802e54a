//! SatelliteProfile registry.
//!
//! A fixed, process-wide table describing every supported satellite or
//! product: which providers serve it, how common band names map onto
//! native asset names, default bands and pixel type, and which search
//! capabilities apply. Built once on first access and never mutated.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use sat_common::{AcquisitionError, AcquisitionResult, DataType};

/// Catalog operators the pipeline knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Microsoft Planetary Computer STAC API
    PlanetaryComputer,
    /// Element 84 Earth Search STAC API
    EarthSearch,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::PlanetaryComputer => "planetary_computer",
            Provider::EarthSearch => "earth_search",
        }
    }

    pub fn default_endpoint(&self) -> &'static str {
        match self {
            Provider::PlanetaryComputer => {
                "https://planetarycomputer.microsoft.com/api/stac/v1/search"
            }
            Provider::EarthSearch => "https://earth-search.aws.element84.com/v1/search",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product family; decides whether time and cloud filters apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Optical,
    Sar,
    /// Time-independent products such as elevation models.
    Static,
}

/// How a provider exposes tile-based search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum TileScheme {
    /// Sentinel-2 MGRS tile ("33UUB"), matched on `property` as `{prefix}{tile}`.
    Mgrs {
        property: &'static str,
        prefix: &'static str,
    },
    /// Landsat WRS-2 path/row given as "PPPRRR".
    Wrs2 {
        path_property: &'static str,
        row_property: &'static str,
    },
}

/// One (satellite, provider) entry of the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderBinding {
    pub provider: Provider,
    pub collection: &'static str,
    /// Native band name to provider asset key, for the bands where they differ.
    pub asset_keys: &'static [(&'static str, &'static str)],
    /// Item property holding cloud cover percentage.
    pub cloud_property: Option<&'static str>,
    /// Whether the cloud ceiling is sent to the provider as a query filter.
    pub server_side_cloud_filter: bool,
    pub tile_search: Option<TileScheme>,
}

impl ProviderBinding {
    /// Provider asset key for a native band name.
    pub fn asset_key<'a>(&'a self, native: &'a str) -> &'a str {
        self.asset_keys
            .iter()
            .find(|(n, _)| *n == native)
            .map(|(_, key)| *key)
            .unwrap_or(native)
    }

    pub fn supports_tile_search(&self) -> bool {
        self.tile_search.is_some()
    }
}

/// Immutable description of one satellite or product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SatelliteProfile {
    pub id: &'static str,
    pub description: &'static str,
    pub kind: ProductKind,
    /// Providers in fan-out order. Results are concatenated in this order.
    pub providers: Vec<ProviderBinding>,
    pub native_bands: &'static [&'static str],
    /// Common name to native band name.
    pub aliases: &'static [(&'static str, &'static str)],
    pub default_bands: &'static [&'static str],
    /// Classification bands that must be resampled nearest-neighbour.
    pub categorical_bands: &'static [&'static str],
    pub dtype: DataType,
    pub nodata: f64,
    /// Native ground sampling distance in meters.
    pub resolution: f64,
}

impl SatelliteProfile {
    pub fn is_static(&self) -> bool {
        self.kind == ProductKind::Static
    }

    /// Cloud ceilings only mean something for optical imagery.
    pub fn applies_cloud_filter(&self) -> bool {
        self.kind == ProductKind::Optical
    }

    pub fn applies_time_filter(&self) -> bool {
        !self.is_static()
    }

    pub fn supports_tile_search(&self) -> bool {
        !self.providers.is_empty() && self.providers.iter().all(|p| p.supports_tile_search())
    }

    pub fn search_methods(&self) -> Vec<&'static str> {
        let mut methods = vec!["geometry"];
        if self.supports_tile_search() {
            methods.push("tile");
        }
        methods
    }

    pub fn binding(&self, provider: Provider) -> Option<&ProviderBinding> {
        self.providers.iter().find(|b| b.provider == provider)
    }

    pub fn alias(&self, common: &str) -> Option<&'static str> {
        self.aliases
            .iter()
            .find(|(c, _)| *c == common)
            .map(|(_, native)| *native)
    }

    pub fn has_native_band(&self, name: &str) -> bool {
        self.native_bands.iter().any(|b| *b == name)
    }

    pub fn is_categorical(&self, native: &str) -> bool {
        self.categorical_bands.iter().any(|b| *b == native)
    }
}

const S2_NATIVE: &[&str] = &[
    "B01", "B02", "B03", "B04", "B05", "B06", "B07", "B08", "B8A", "B09", "B11", "B12", "SCL",
];

const S2_ALIASES: &[(&str, &str)] = &[
    ("coastal", "B01"),
    ("blue", "B02"),
    ("green", "B03"),
    ("red", "B04"),
    ("rededge1", "B05"),
    ("rededge2", "B06"),
    ("rededge3", "B07"),
    ("nir", "B08"),
    ("nir08", "B8A"),
    ("nir09", "B09"),
    ("swir16", "B11"),
    ("swir22", "B12"),
    ("scl", "SCL"),
];

// Earth Search keys its Sentinel-2 assets by common name.
const S2_EARTH_SEARCH_KEYS: &[(&str, &str)] = &[
    ("B01", "coastal"),
    ("B02", "blue"),
    ("B03", "green"),
    ("B04", "red"),
    ("B05", "rededge1"),
    ("B06", "rededge2"),
    ("B07", "rededge3"),
    ("B08", "nir"),
    ("B8A", "nir08"),
    ("B09", "nir09"),
    ("B11", "swir16"),
    ("B12", "swir22"),
    ("SCL", "scl"),
];

const S2E84_NATIVE: &[&str] = &[
    "coastal", "blue", "green", "red", "rededge1", "rededge2", "rededge3", "nir", "nir08",
    "nir09", "swir16", "swir22", "scl",
];

const S2E84_ALIASES: &[(&str, &str)] = &[
    ("B01", "coastal"),
    ("B02", "blue"),
    ("B03", "green"),
    ("B04", "red"),
    ("B05", "rededge1"),
    ("B06", "rededge2"),
    ("B07", "rededge3"),
    ("B08", "nir"),
    ("B8A", "nir08"),
    ("B09", "nir09"),
    ("B11", "swir16"),
    ("B12", "swir22"),
    ("SCL", "scl"),
];

const LANDSAT_NATIVE: &[&str] = &[
    "coastal", "blue", "green", "red", "nir08", "swir16", "swir22", "lwir11", "qa_pixel",
];

const LANDSAT_ALIASES: &[(&str, &str)] = &[
    ("nir", "nir08"),
    ("swir1", "swir16"),
    ("swir2", "swir22"),
    ("thermal", "lwir11"),
    ("qa", "qa_pixel"),
];

fn planetary_computer(collection: &'static str) -> ProviderBinding {
    ProviderBinding {
        provider: Provider::PlanetaryComputer,
        collection,
        asset_keys: &[],
        cloud_property: None,
        server_side_cloud_filter: false,
        tile_search: None,
    }
}

fn pc_sentinel2() -> ProviderBinding {
    ProviderBinding {
        cloud_property: Some("eo:cloud_cover"),
        server_side_cloud_filter: true,
        tile_search: Some(TileScheme::Mgrs {
            property: "s2:mgrs_tile",
            prefix: "",
        }),
        ..planetary_computer("sentinel-2-l2a")
    }
}

fn earth_search_sentinel2(asset_keys: &'static [(&'static str, &'static str)]) -> ProviderBinding {
    ProviderBinding {
        provider: Provider::EarthSearch,
        collection: "sentinel-2-l2a",
        asset_keys,
        cloud_property: Some("eo:cloud_cover"),
        server_side_cloud_filter: false,
        tile_search: Some(TileScheme::Mgrs {
            property: "grid:code",
            prefix: "MGRS-",
        }),
    }
}

fn build_registry() -> BTreeMap<&'static str, SatelliteProfile> {
    let profiles = vec![
        SatelliteProfile {
            id: "S2MPC",
            description: "Sentinel-2 Level-2A from Planetary Computer",
            kind: ProductKind::Optical,
            providers: vec![pc_sentinel2()],
            native_bands: S2_NATIVE,
            aliases: S2_ALIASES,
            default_bands: &["red", "green", "blue", "nir"],
            categorical_bands: &["SCL"],
            dtype: DataType::UInt16,
            nodata: 0.0,
            resolution: 10.0,
        },
        SatelliteProfile {
            id: "S2E84",
            description: "Sentinel-2 Level-2A from Earth Search",
            kind: ProductKind::Optical,
            providers: vec![earth_search_sentinel2(&[])],
            native_bands: S2E84_NATIVE,
            aliases: S2E84_ALIASES,
            default_bands: &["red", "green", "blue", "nir"],
            categorical_bands: &["scl"],
            dtype: DataType::UInt16,
            nodata: 0.0,
            resolution: 10.0,
        },
        SatelliteProfile {
            id: "S2",
            description: "Sentinel-2 Level-2A from Planetary Computer and Earth Search",
            kind: ProductKind::Optical,
            providers: vec![pc_sentinel2(), earth_search_sentinel2(S2_EARTH_SEARCH_KEYS)],
            native_bands: S2_NATIVE,
            aliases: S2_ALIASES,
            default_bands: &["red", "green", "blue", "nir"],
            categorical_bands: &["SCL"],
            dtype: DataType::UInt16,
            nodata: 0.0,
            resolution: 10.0,
        },
        SatelliteProfile {
            id: "LANDSATMPC",
            description: "Landsat Collection 2 Level-2 from Planetary Computer",
            kind: ProductKind::Optical,
            providers: vec![ProviderBinding {
                cloud_property: Some("eo:cloud_cover"),
                server_side_cloud_filter: true,
                tile_search: Some(TileScheme::Wrs2 {
                    path_property: "landsat:wrs_path",
                    row_property: "landsat:wrs_row",
                }),
                ..planetary_computer("landsat-c2-l2")
            }],
            native_bands: LANDSAT_NATIVE,
            aliases: LANDSAT_ALIASES,
            default_bands: &["red", "green", "blue", "nir08"],
            categorical_bands: &["qa_pixel"],
            dtype: DataType::UInt16,
            nodata: 0.0,
            resolution: 30.0,
        },
        SatelliteProfile {
            id: "S1MPC",
            description: "Sentinel-1 radiometrically terrain corrected backscatter from Planetary Computer",
            kind: ProductKind::Sar,
            providers: vec![planetary_computer("sentinel-1-rtc")],
            native_bands: &["vv", "vh"],
            aliases: &[("VV", "vv"), ("VH", "vh")],
            default_bands: &["vv", "vh"],
            categorical_bands: &[],
            dtype: DataType::Float32,
            nodata: -32768.0,
            resolution: 10.0,
        },
        SatelliteProfile {
            id: "COPDEM30MPC",
            description: "Copernicus DEM GLO-30 from Planetary Computer",
            kind: ProductKind::Static,
            providers: vec![planetary_computer("cop-dem-glo-30")],
            native_bands: &["data"],
            aliases: &[("elevation", "data"), ("dem", "data")],
            default_bands: &["data"],
            categorical_bands: &[],
            dtype: DataType::Float32,
            nodata: -32767.0,
            resolution: 30.0,
        },
    ];

    profiles.into_iter().map(|p| (p.id, p)).collect()
}

static REGISTRY: Lazy<BTreeMap<&'static str, SatelliteProfile>> = Lazy::new(build_registry);

/// Look up a satellite profile by identifier.
pub fn profile(satellite_id: &str) -> AcquisitionResult<&'static SatelliteProfile> {
    REGISTRY
        .get(satellite_id)
        .ok_or_else(|| AcquisitionError::UnknownSatellite {
            satellite: satellite_id.to_string(),
            known: REGISTRY.keys().map(|k| k.to_string()).collect(),
        })
}

/// All registered profiles, ordered by identifier.
pub fn satellites() -> impl Iterator<Item = &'static SatelliteProfile> {
    REGISTRY.values()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_profile() {
        let s2 = profile("S2MPC").unwrap();
        assert_eq!(s2.kind, ProductKind::Optical);
        assert_eq!(s2.dtype, DataType::UInt16);
        assert_eq!(s2.alias("nir"), Some("B08"));
        assert!(s2.supports_tile_search());
        assert_eq!(s2.search_methods(), vec!["geometry", "tile"]);
    }

    #[test]
    fn test_unknown_satellite_lists_known() {
        match profile("MODIS") {
            Err(AcquisitionError::UnknownSatellite { satellite, known }) => {
                assert_eq!(satellite, "MODIS");
                assert!(known.contains(&"S2MPC".to_string()));
                assert!(known.contains(&"COPDEM30MPC".to_string()));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_registry_is_self_consistent() {
        for p in satellites() {
            for (_, native) in p.aliases {
                assert!(p.has_native_band(native), "{}: alias target {}", p.id, native);
            }
            for band in p.default_bands {
                assert!(
                    p.has_native_band(band) || p.alias(band).is_some(),
                    "{}: default band {}",
                    p.id,
                    band
                );
            }
            for band in p.categorical_bands {
                assert!(p.has_native_band(band), "{}: categorical {}", p.id, band);
            }
            assert!(p.dtype.can_represent(p.nodata), "{}: nodata", p.id);
            assert!(!p.providers.is_empty());
        }
    }

    #[test]
    fn test_capability_flags() {
        let s1 = profile("S1MPC").unwrap();
        assert!(!s1.applies_cloud_filter());
        assert!(s1.applies_time_filter());
        assert!(!s1.supports_tile_search());

        let dem = profile("COPDEM30MPC").unwrap();
        assert!(dem.is_static());
        assert!(!dem.applies_time_filter());
        assert_eq!(dem.alias("elevation"), Some("data"));
    }

    #[test]
    fn test_fan_out_asset_keys() {
        let s2 = profile("S2").unwrap();
        assert_eq!(s2.providers.len(), 2);
        let pc = s2.binding(Provider::PlanetaryComputer).unwrap();
        let es = s2.binding(Provider::EarthSearch).unwrap();
        assert_eq!(pc.asset_key("B08"), "B08");
        assert_eq!(es.asset_key("B08"), "nir");
        assert_eq!(es.asset_key("B8A"), "nir08");
    }
}
