//! Universal Transverse Mercator projection.
//!
//! Series expansions follow Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), pp. 60-64, on the WGS84 ellipsoid. Accuracy is well
//! below a centimetre inside a zone, which is far finer than any sensor
//! pixel handled here.
//!
//! Zone selection includes the Norway (32V) and Svalbard (31X-37X)
//! exceptions so that the chosen EPSG code matches the one providers use
//! for their granules.

use std::f64::consts::PI;

use sat_common::Epsg;

/// WGS84 semi-major axis (meters)
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// UTM central scale factor
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// A Transverse Mercator projection on the WGS84 ellipsoid.
#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    e2: f64,
    ep2: f64,
}

impl TransverseMercator {
    /// Projection for UTM zone `zone` (1-60) in the given hemisphere.
    pub fn utm(zone: u8, north: bool) -> Self {
        let lon0_deg = (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0;
        let e2 = WGS84_F * (2.0 - WGS84_F);
        Self {
            lon0: lon0_deg.to_radians(),
            k0: UTM_K0,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// Projection for a WGS84 / UTM EPSG code, if it is one.
    pub fn from_epsg(epsg: Epsg) -> Option<Self> {
        epsg.utm_zone().map(|(zone, north)| Self::utm(zone, north))
    }

    /// Meridional arc length from the equator to latitude `phi`.
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        WGS84_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Project geographic (lon, lat in degrees) to (easting, northing) meters.
    pub fn forward(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let phi = lat_deg.to_radians();

        let mut dlon = lon_deg.to_radians() - self.lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = WGS84_A / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = self.ep2 * cos_phi * cos_phi;
        let a = cos_phi * dlon;
        let m = self.meridian_arc(phi);

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let x = self.k0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a5 / 120.0);
        let y = self.k0
            * (m + n
                * tan_phi
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a6 / 720.0));

        (x + self.false_easting, y + self.false_northing)
    }

    /// Inverse projection from (easting, northing) meters to (lon, lat) degrees.
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        let m = (northing - self.false_northing) / self.k0;
        let mu = m / (WGS84_A * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin1 = phi1.sin();
        let cos1 = phi1.cos();
        let tan1 = phi1.tan();

        let c1 = self.ep2 * cos1 * cos1;
        let t1 = tan1 * tan1;
        let n1 = WGS84_A / (1.0 - e2 * sin1 * sin1).sqrt();
        let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin1 * sin1).powf(1.5);
        let d = (easting - self.false_easting) / (n1 * self.k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let phi = phi1
            - (n1 * tan1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * self.ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * self.ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);
        let lon = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * self.ep2 + 24.0 * t1 * t1)
                    * d5
                    / 120.0)
                / cos1;

        (lon.to_degrees(), phi.to_degrees())
    }
}

/// UTM zone number and hemisphere containing a geographic point.
pub fn utm_zone_for(lon: f64, lat: f64) -> (u8, bool) {
    let north = lat >= 0.0;

    // Norway
    if (56.0..64.0).contains(&lat) && (3.0..12.0).contains(&lon) {
        return (32, north);
    }

    // Svalbard
    if (72.0..=84.0).contains(&lat) && (0.0..42.0).contains(&lon) {
        let zone = if lon < 9.0 {
            31
        } else if lon < 21.0 {
            33
        } else if lon < 33.0 {
            35
        } else {
            37
        };
        return (zone, north);
    }

    let mut normalized = lon;
    while normalized >= 180.0 {
        normalized -= 360.0;
    }
    while normalized < -180.0 {
        normalized += 360.0;
    }
    let zone = (((normalized + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
    (zone, north)
}

/// WGS84 / UTM EPSG code for the zone containing a geographic point.
pub fn utm_crs_for(lon: f64, lat: f64) -> Epsg {
    let (zone, north) = utm_zone_for(lon, lat);
    Epsg::utm(zone, north)
}
