//! Lambert Conformal Conic projection between geographic coordinates and
//! the KMA short-range forecast grid (~5 km cells).
//!
//! Projection parameters follow the grid specification published with the
//! VilageFcst API; the origin-cell offsets are calibrated so the forward
//! transform reproduces the provider's district-to-cell assignments.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Earth radius used by the KMA grid spec (km).
const RE: f64 = 6371.00877;
/// Grid spacing (km).
const GRID: f64 = 5.0;
/// First standard parallel (degrees).
const SLAT1: f64 = 30.0;
/// Second standard parallel (degrees).
const SLAT2: f64 = 60.0;
/// Origin longitude (degrees).
const OLON: f64 = 126.0;
/// Origin latitude (degrees).
const OLAT: f64 = 38.0;
/// Origin X offset in grid units, calibrated against the provider's
/// published district-to-cell table.
const XO: f64 = 43.34;
/// Origin Y offset in grid units, calibrated the same way.
const YO: f64 = 135.93;

/// Earth radius for great-circle distance (km).
const HAVERSINE_RADIUS_KM: f64 = 6371.0;

/// Integer cell address in the KMA forecast grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub gx: i32,
    pub gy: i32,
}

impl GridCell {
    pub fn new(gx: i32, gy: i32) -> Self {
        Self { gx, gy }
    }

    /// Whether the cell lies inside the published grid extent.
    pub fn is_valid(&self) -> bool {
        (1..=149).contains(&self.gx) && (1..=253).contains(&self.gy)
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.gx, self.gy)
    }
}

/// A validated geographic coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate, rejecting out-of-range latitude/longitude.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::OutOfRange(format!(
                "latitude must be within [-90, 90], got {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::OutOfRange(format!(
                "longitude must be within [-180, 180], got {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// The grid cell this coordinate projects into.
    pub fn grid(&self) -> GridCell {
        to_grid(self.latitude, self.longitude)
    }

    /// Whether the coordinate falls inside the serviceable region
    /// covered by the provider grid.
    pub fn in_service_area(&self) -> bool {
        (33.0..=43.0).contains(&self.latitude) && (124.0..=132.0).contains(&self.longitude)
    }

    /// Great-circle distance to another coordinate (haversine, km).
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        HAVERSINE_RADIUS_KM * c
    }
}

/// Projection constants derived from the fixed grid parameters.
struct Projection {
    re: f64,
    sn: f64,
    sf: f64,
    ro: f64,
    olon: f64,
}

fn projection() -> Projection {
    let degrad = PI / 180.0;
    let re = RE / GRID;
    let slat1 = SLAT1 * degrad;
    let slat2 = SLAT2 * degrad;
    let olon = OLON * degrad;
    let olat = OLAT * degrad;

    let mut sn = (PI * 0.25 + slat2 * 0.5).tan() / (PI * 0.25 + slat1 * 0.5).tan();
    sn = (slat1.cos() / slat2.cos()).ln() / sn.ln();
    let mut sf = (PI * 0.25 + slat1 * 0.5).tan();
    sf = sf.powf(sn) * slat1.cos() / sn;
    let mut ro = (PI * 0.25 + olat * 0.5).tan();
    ro = re * sf / ro.powf(sn);

    Projection {
        re,
        sn,
        sf,
        ro,
        olon,
    }
}

/// Forward transform: latitude/longitude (degrees) to grid cell.
pub fn to_grid(latitude: f64, longitude: f64) -> GridCell {
    let degrad = PI / 180.0;
    let p = projection();

    let mut ra = (PI * 0.25 + latitude * degrad * 0.5).tan();
    ra = p.re * p.sf / ra.powf(p.sn);

    let mut theta = longitude * degrad - p.olon;
    if theta > PI {
        theta -= 2.0 * PI;
    }
    if theta < -PI {
        theta += 2.0 * PI;
    }
    theta *= p.sn;

    let gx = (ra * theta.sin() + XO + 0.5) as i32;
    let gy = (p.ro - ra * theta.cos() + YO + 0.5) as i32;

    GridCell::new(gx, gy)
}

/// Inverse transform: grid cell to latitude/longitude (degrees).
pub fn to_lat_lon(cell: GridCell) -> (f64, f64) {
    let raddeg = 180.0 / PI;
    let p = projection();

    let xn = f64::from(cell.gx) - XO;
    let yn = p.ro - f64::from(cell.gy) + YO;
    let ra = (xn * xn + yn * yn).sqrt();
    let alat = 2.0 * (p.re * p.sf / ra).powf(1.0 / p.sn).atan() - PI * 0.5;

    let theta = if xn.abs() <= 0.0 {
        0.0
    } else if yn.abs() <= 0.0 {
        if xn < 0.0 {
            -PI * 0.5
        } else {
            PI * 0.5
        }
    } else {
        xn.atan2(yn)
    };

    let alon = theta / p.sn + p.olon;

    (alat * raddeg, alon * raddeg)
}
