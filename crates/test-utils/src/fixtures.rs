//! Common test fixtures.

use chrono::{DateTime, TimeZone, Utc};
use sat_common::{AreaOfInterest, TimeRange};

/// Copenhagen city centre, the point used for most end-to-end scenarios.
pub mod copenhagen {
    pub const LON: f64 = 12.5683;
    pub const LAT: f64 = 55.6761;
    /// Half-side of the square AOI in degrees (~55 m north-south).
    pub const BUFFER: f64 = 0.0005;
    /// UTM zone 33N.
    pub const EPSG: u32 = 32633;
    /// Projected centre in EPSG:32633.
    pub const EASTING: f64 = 347_090.938;
    pub const NORTHING: f64 = 6_172_711.787;
    /// MGRS tile covering the city.
    pub const MGRS_TILE: &str = "33UUB";
}

/// Reference points with independently computed UTM coordinates.
pub mod utm_points {
    /// (lon, lat, epsg, easting, northing)
    pub const SAN_FRANCISCO: (f64, f64, u32, f64, f64) =
        (-122.4194, 37.7749, 32610, 551_130.768, 4_180_998.882);
    pub const RIO_DE_JANEIRO: (f64, f64, u32, f64, f64) =
        (-43.2, -22.9, 32723, 684_623.673, 7_466_421.401);
}

/// Frequently used acquisition times (June 2024, Sentinel-2 overpasses over Denmark).
pub mod times {
    pub const RANGE_START: &str = "2024-06-01";
    pub const RANGE_END: &str = "2024-06-15";
    pub const PASS_A: &str = "2024-06-03T10:36:29Z";
    /// Same orbit, next granule along track.
    pub const PASS_A_NEXT_GRANULE: &str = "2024-06-03T10:36:41Z";
    pub const PASS_B: &str = "2024-06-08T10:36:31Z";
    pub const PASS_C: &str = "2024-06-13T10:36:19Z";
}

/// Square AOI around the Copenhagen reference point.
pub fn copenhagen_aoi() -> AreaOfInterest {
    AreaOfInterest::buffered_point(copenhagen::LON, copenhagen::LAT, copenhagen::BUFFER)
}

/// Non-rectangular AOI just inside the Copenhagen square.
pub fn copenhagen_triangle() -> AreaOfInterest {
    let (lon, lat, b) = (copenhagen::LON, copenhagen::LAT, copenhagen::BUFFER);
    AreaOfInterest::from_exterior(&[(lon - b, lat - b), (lon + b, lat - b), (lon, lat + b)])
        .expect("fixture triangle is valid")
}

/// First half of June 2024.
pub fn june_2024() -> TimeRange {
    TimeRange::from_strings(times::RANGE_START, times::RANGE_END).expect("fixture range is valid")
}

/// Parse a fixture timestamp.
pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| panic!("fixture timestamp '{}' is not RFC 3339", s))
}

/// Midnight UTC of the given day.
pub fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .expect("fixture date is valid")
}
