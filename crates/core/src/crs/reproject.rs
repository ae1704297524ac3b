//! Pure-Rust WGS84 reprojection (Snyder 1987, USGS formulas).
//!
//! Vector layers arrive in WGS84 longitude/latitude and are moved into the
//! elevation grid's CRS before any spatial predicate runs. Supported targets:
//! geographic CRSs (identity), Transverse Mercator grids (UTM, national TM
//! grids, or any `tmerc` PROJ string / WKT) and Web Mercator (EPSG 3857).
//! Every target is evaluated on the WGS84 ellipsoid. No libproj dependency.

use super::{CrsKind, CRS};
use crate::error::{Error, Result};
use geo_types::{Coord, LineString};
use std::collections::HashMap;
use std::f64::consts::FRAC_PI_4;

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const UTM_K0: f64 = 0.9996; // UTM scale factor
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Latitude limit of the Web Mercator square
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Transverse Mercator projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    /// Central meridian in degrees
    pub lon0: f64,
    /// Latitude of origin in degrees
    pub lat0: f64,
    /// Scale factor on the central meridian
    pub k0: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl TransverseMercator {
    /// WGS84 / UTM zone parameters
    pub fn utm(zone: u32, north: bool) -> Self {
        Self {
            lon0: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
            lat0: 0.0,
            k0: UTM_K0,
            false_easting: UTM_FALSE_EASTING,
            false_northing: if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
        }
    }

    /// Transverse Mercator parameters of `crs`, if it is one.
    ///
    /// Recognizes UTM and a few national TM grids by EPSG code, PROJ strings
    /// with `+proj=utm` or `+proj=tmerc`, and WKT using the Transverse
    /// Mercator method. Linear units must be metres.
    pub fn from_crs(crs: &CRS) -> Option<Self> {
        crs.epsg()
            .and_then(tm_from_epsg)
            .or_else(|| crs.proj.as_deref().and_then(tm_from_proj))
            .or_else(|| crs.wkt.as_deref().and_then(tm_from_wkt))
    }

    /// Equivalent PROJ definition
    pub fn to_proj_string(&self) -> String {
        format!(
            "+proj=tmerc +lat_0={} +lon_0={} +k={} +x_0={} +y_0={} +ellps=WGS84 +units=m",
            self.lat0, self.lon0, self.k0, self.false_easting, self.false_northing
        )
    }

    fn is_valid(&self) -> bool {
        [self.lon0, self.lat0, self.k0, self.false_easting, self.false_northing]
            .iter()
            .all(|v| v.is_finite())
            && self.k0 > 0.0
            && self.lon0.abs() <= 180.0
            && self.lat0.abs() < 90.0
    }

    /// WGS84 (longitude, latitude) in degrees to (easting, northing) in metres
    fn project(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let lon = lon_deg.to_radians();
        let lon0 = self.lon0.to_radians();
        let k0 = self.k0;

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan_lat = lat.tan();

        let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
        let t = tan_lat * tan_lat;
        let c = E_PRIME2 * cos_lat * cos_lat;
        let a_coeff = cos_lat * (lon - lon0);
        let m = meridional_arc(lat);

        let a2 = a_coeff * a_coeff;
        let a4 = a2 * a2;
        let a6 = a4 * a2;

        // Snyder eq. 8-9
        let easting = k0
            * n
            * (a_coeff
                + (1.0 - t + c) * a2 * a_coeff / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2) * a4 * a_coeff / 120.0)
            + self.false_easting;

        // Snyder eq. 8-10
        let northing = k0
            * (m - meridional_arc(self.lat0.to_radians())
                + n * tan_lat
                    * (a2 / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0))
            + self.false_northing;

        (easting, northing)
    }

    /// (easting, northing) in metres back to WGS84 degrees.
    /// Snyder eqs. 8-12 to 8-25 via the footpoint latitude.
    fn unproject(&self, easting: f64, northing: f64) -> (f64, f64) {
        let k0 = self.k0;
        let x = easting - self.false_easting;
        let y = northing - self.false_northing;

        let e4 = E2 * E2;
        let e6 = e4 * E2;
        let m = meridional_arc(self.lat0.to_radians()) + y / k0;
        let mu = m / (A * (1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1_e2 = (1.0 - E2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let c1 = E_PRIME2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let denom = 1.0 - E2 * sin_phi1 * sin_phi1;
        let n1 = A / denom.sqrt();
        let r1 = A * (1.0 - E2) / denom.powf(1.5);
        let d = x / (n1 * k0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * E_PRIME2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * E_PRIME2 - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lon = self.lon0.to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * E_PRIME2 + 24.0 * t1 * t1) * d5
                    / 120.0)
                / cos_phi1;

        (lon.to_degrees(), lat.to_degrees())
    }
}



#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    Identity,
    TransverseMercator(TransverseMercator),
    WebMercator,
}

/// Transforms WGS84 (longitude, latitude) into a target CRS and back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reprojector {
    target: Target,
}

impl Reprojector {
    /// Build a reprojector from WGS84 into `crs`.
    ///
    /// Geographic targets are treated as WGS84-equivalent (datum shifts are
    /// far below raster resolution for this use). A projected CRS without a
    /// built-in projection is [`Error::UnsupportedCrs`].
    pub fn to_crs(crs: &CRS) -> Result<Self> {
        if matches!(crs.epsg(), Some(3857 | 900913)) {
            return Ok(Self { target: Target::WebMercator });
        }
        if let Some(tm) = TransverseMercator::from_crs(crs) {
            return Ok(Self { target: Target::TransverseMercator(tm) });
        }

        match crs.kind()? {
            CrsKind::Geographic => Ok(Self { target: Target::Identity }),
            CrsKind::Projected => Err(Error::UnsupportedCrs(crs.identifier())),
        }
    }

    /// Project WGS84 `(lon, lat)` in degrees into target coordinates.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        check_lon_lat(lon, lat)?;

        match self.target {
            Target::Identity => Ok((lon, lat)),
            Target::TransverseMercator(tm) => {
                if !(-80.0..=84.0).contains(&lat) {
                    return Err(Error::Reprojection {
                        lon,
                        lat,
                        reason: "outside the Transverse Mercator latitude band".into(),
                    });
                }
                Ok(tm.project(lon, lat))
            }
            Target::WebMercator => {
                if lat.abs() > MERCATOR_MAX_LAT {
                    return Err(Error::Reprojection {
                        lon,
                        lat,
                        reason: "outside the Web Mercator latitude range".into(),
                    });
                }
                let x = A * lon.to_radians();
                let y = A * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
                Ok((x, y))
            }
        }
    }

    /// Convert target coordinates back to WGS84 `(lon, lat)` in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(Error::Reprojection {
                lon: x,
                lat: y,
                reason: "non-finite coordinate".into(),
            });
        }

        match self.target {
            Target::Identity => Ok((x, y)),
            Target::TransverseMercator(tm) => Ok(tm.unproject(x, y)),
            Target::WebMercator => {
                let lon = (x / A).to_degrees();
                let lat = (2.0 * (y / A).exp().atan() - 2.0 * FRAC_PI_4).to_degrees();
                Ok((lon, lat))
            }
        }
    }

    /// Project a single coordinate
    pub fn forward_coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        let (x, y) = self.forward(coord.x, coord.y)?;
        Ok(Coord { x, y })
    }

    /// Project every vertex of a line; fails if any vertex fails.
    pub fn forward_line(&self, line: &LineString<f64>) -> Result<LineString<f64>> {
        line.0
            .iter()
            .map(|&c| self.forward_coord(c))
            .collect::<Result<Vec<_>>>()
            .map(LineString::new)
    }
}

fn check_lon_lat(lon: f64, lat: f64) -> Result<()> {
    let reason = if !lon.is_finite() || !lat.is_finite() {
        "non-finite coordinate"
    } else if lat.abs() > 90.0 {
        "latitude out of range"
    } else if lon.abs() > 180.0 {
        "longitude out of range"
    } else {
        return Ok(());
    };
    Err(Error::Reprojection {
        lon,
        lat,
        reason: reason.into(),
    })
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → WGS84 zone xx, North hemisphere
/// - EPSG 327xx → WGS84 zone xx, South hemisphere
/// - EPSG 258xx → ETRS89 zone xx (28-38)
/// - EPSG 269xx → NAD83 zone xx (1-23)
pub(crate) fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    match epsg {
        32601..=32660 => Some((epsg - 32600, true)),
        32701..=32760 => Some((epsg - 32700, false)),
        25828..=25838 => Some((epsg - 25800, true)),
        26901..=26923 => Some((epsg - 26900, true)),
        _ => None,
    }
}

fn tm_from_epsg(code: u32) -> Option<TransverseMercator> {
    if let Some((zone, north)) = parse_utm_epsg(code) {
        return Some(TransverseMercator::utm(zone, north));
    }
    let (lon0, k0, false_easting, false_northing) = match code {
        // Gulf 1970 / Bangladesh Transverse Mercator
        3106 => (90.0, 0.9996, 500_000.0, -2_000_000.0),
        // NZGD2000 / New Zealand Transverse Mercator 2000
        2193 => (173.0, 0.9996, 1_600_000.0, 10_000_000.0),
        _ => return None,
    };
    Some(TransverseMercator {
        lon0,
        lat0: 0.0,
        k0,
        false_easting,
        false_northing,
    })
}

fn tm_from_proj(proj: &str) -> Option<TransverseMercator> {
    let params: HashMap<&str, &str> = proj
        .split_whitespace()
        .filter_map(|token| {
            let token = token.strip_prefix('+')?;
            Some(token.split_once('=').unwrap_or((token, "")))
        })
        .collect();
    if params.get("units").is_some_and(|u| *u != "m") {
        return None;
    }
    let number = |key: &str| params.get(key).and_then(|v| v.parse::<f64>().ok());

    let tm = match *params.get("proj")? {
        "utm" => {
            let zone = params.get("zone")?.parse::<u32>().ok().filter(|z| (1..=60).contains(z))?;
            TransverseMercator::utm(zone, !params.contains_key("south"))
        }
        "tmerc" => TransverseMercator {
            lon0: number("lon_0").unwrap_or(0.0),
            lat0: number("lat_0").unwrap_or(0.0),
            k0: number("k").or_else(|| number("k_0")).unwrap_or(1.0),
            false_easting: number("x_0").unwrap_or(0.0),
            false_northing: number("y_0").unwrap_or(0.0),
        },
        _ => return None,
    };
    tm.is_valid().then_some(tm)
}

/// Numeric `PARAMETER["name", value, ...]` entries of a WKT definition,
/// keyed by lowercase name with underscores as spaces
fn wkt_parameters(wkt: &str) -> HashMap<String, f64> {
    wkt.split("PARAMETER[")
        .skip(1)
        .filter_map(|entry| {
            let entry = entry.trim_start().strip_prefix('"')?;
            let (name, rest) = entry.split_once('"')?;
            let value = rest
                .trim_start()
                .strip_prefix(',')?
                .split(|c: char| c == ',' || c == ']')
                .next()?
                .trim()
                .parse::<f64>()
                .ok()?;
            Some((name.to_ascii_lowercase().replace('_', " "), value))
        })
        .collect()
}

fn tm_from_wkt(wkt: &str) -> Option<TransverseMercator> {
    let upper = wkt.to_ascii_uppercase();
    if !upper.contains("TRANSVERSE_MERCATOR") && !upper.contains("TRANSVERSE MERCATOR") {
        return None;
    }
    let params = wkt_parameters(wkt);
    let any = |names: &[&str]| names.iter().find_map(|n| params.get(*n).copied());

    let tm = TransverseMercator {
        lon0: any(&["central meridian", "longitude of natural origin"])?,
        lat0: any(&["latitude of origin", "latitude of natural origin"]).unwrap_or(0.0),
        k0: any(&["scale factor", "scale factor at natural origin"]).unwrap_or(1.0),
        false_easting: any(&["false easting"]).unwrap_or(0.0),
        false_northing: any(&["false northing"]).unwrap_or(0.0),
    };
    tm.is_valid().then_some(tm)
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e4 = E2 * E2;
    let e6 = e4 * E2;

    A * ((1.0 - E2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * E2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}
