//! CRS/Area reconciliation
//!
//! Converts cell counts into real-world units. The grid's reference system
//! must classify as geographic or projected; a missing or unclassifiable CRS
//! is an error, never a silent default.
//!
//! - Geographic: angular cell size × 111.32 km per degree, longitude axis
//!   scaled by cos(mid-latitude)
//! - Projected: cell dimensions are already metres

use jolchobi_core::raster::{CellValue, GeoTransform, Raster};
use jolchobi_core::{CrsKind, Error, Reprojector, Result, CRS};

/// Kilometres per degree of latitude
pub const KM_PER_DEGREE: f64 = 111.32;

/// Metres per degree of latitude
pub const M_PER_DEGREE: f64 = 111_320.0;

fn check_latitude(mid_latitude: f64) -> Result<f64> {
    if !mid_latitude.is_finite() || mid_latitude.abs() > 90.0 {
        return Err(Error::invalid_parameter(
            "mid_latitude",
            mid_latitude,
            "latitude must be finite and within [-90, 90]",
        ));
    }
    Ok(mid_latitude.to_radians().cos())
}

fn classify(crs: Option<&CRS>) -> Result<CrsKind> {
    crs.ok_or(Error::MissingCrs)?.kind()
}

/// Area of one cell in km².
///
/// `mid_latitude` (degrees) is only consulted for geographic grids.
///
/// # Errors
/// - [`Error::MissingCrs`] / [`Error::UnclassifiedCrs`] when the reference
///   system cannot be classified
/// - [`Error::InvalidParameter`] for an unusable mid-latitude on a
///   geographic grid
pub fn pixel_area_km2(
    transform: &GeoTransform,
    crs: Option<&CRS>,
    mid_latitude: f64,
) -> Result<f64> {
    let (width, height) = transform.pixel_size();
    match classify(crs)? {
        CrsKind::Geographic => {
            let cos_lat = check_latitude(mid_latitude)?;
            let lon_km = width * KM_PER_DEGREE * cos_lat;
            let lat_km = height * KM_PER_DEGREE;
            Ok(lon_km * lat_km)
        }
        CrsKind::Projected => Ok(width * height / 1e6),
    }
}

/// Representative edge length of one cell in metres.
///
/// Geographic grids average the cos-scaled longitude size with the latitude
/// size; projected grids use the geometric mean of both axes.
pub fn pixel_size_m(transform: &GeoTransform, crs: Option<&CRS>, mid_latitude: f64) -> Result<f64> {
    let (width, height) = transform.pixel_size();
    match classify(crs)? {
        CrsKind::Geographic => {
            let cos_lat = check_latitude(mid_latitude)?;
            let lon_m = width * M_PER_DEGREE * cos_lat;
            let lat_m = height * M_PER_DEGREE;
            Ok((lon_m + lat_m) / 2.0)
        }
        CrsKind::Projected => Ok((width * height).sqrt()),
    }
}

/// Flooded area in km²: number of mask cells equal to 1 times the cell area.
///
/// Uses the mask's own transform and CRS. Errors surface even for an empty
/// mask, since the caller asked for real-world units.
pub fn calculate_flood_area_km2(mask: &Raster<u8>, mid_latitude: f64) -> Result<f64> {
    let cell_area = pixel_area_km2(mask.transform(), mask.crs(), mid_latitude)?;
    let flooded = mask.count(1);
    Ok(flooded as f64 * cell_area)
}

/// Latitude (degrees) of the grid centre.
///
/// Geographic grids read it straight from the transform; projected grids
/// inverse-project the centre to WGS84.
pub fn grid_mid_latitude<T: CellValue>(raster: &Raster<T>) -> Result<f64> {
    let crs = raster.require_crs()?;
    let (x, y) = raster
        .transform()
        .corner_to_geo(raster.cols() as f64 / 2.0, raster.rows() as f64 / 2.0);
    match crs.kind()? {
        CrsKind::Geographic => Ok(y),
        CrsKind::Projected => {
            let (_, lat) = Reprojector::to_crs(crs)?.inverse(x, y)?;
            Ok(lat)
        }
    }
}

/// Mid-latitude to use for `raster`: `explicit` when given, otherwise the
/// grid centre on geographic grids. Projected grids never consult it, so
/// they get 0 without reprojecting anything.
pub fn effective_mid_latitude<T: CellValue>(raster: &Raster<T>, explicit: Option<f64>) -> Result<f64> {
    if let Some(lat) = explicit {
        return Ok(lat);
    }
    match raster.require_crs()?.kind()? {
        CrsKind::Geographic => grid_mid_latitude(raster),
        CrsKind::Projected => Ok(0.0),
    }
}
