//! Drainage-proxy inundation ("HAND-approx")
//!
//! A cheap stand-in for Height Above Nearest Drainage: the lowest cells of
//! the grid play the drainage network, and each cell's pseudo height above
//! drainage is its straight-line distance to the nearest such cell, scaled
//! to metres by the cell size. Cells within `level` of the network flood.
//!
//! This is an approximation for rapid scenarios, not a hydrologic ground
//! truth. When an exact distance surface cannot be built the model degrades
//! to a binary surface (0 on drainage cells, 1 elsewhere) instead of failing.

use ndarray::Zip;
use serde::{Deserialize, Serialize};

use jolchobi_core::raster::Raster;
use jolchobi_core::{Algorithm, Error, Result};

use super::distance::euclidean_distance;
use super::{flood_from_surface, FloodResult};
use crate::area::{effective_mid_latitude, pixel_size_m};
use crate::elevation::{percentile_of_sorted, sorted_finite, validate_percentile};

/// How distance to the drainage cells is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceTransform {
    /// Exact Euclidean distance in metres
    #[default]
    Euclidean,
    /// Degenerate surface: 0 on drainage cells, 1 elsewhere
    Binary,
}

/// Parameters for the drainage proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainageProxyParams {
    /// Cells at or below this elevation percentile form the drainage network.
    /// Default: 10.0
    pub low_percentile: f64,
    /// Latitude (degrees) used to scale longitude cell size on geographic
    /// grids. `None` uses the grid centre.
    pub mid_latitude: Option<f64>,
    /// Distance surface to build
    pub distance: DistanceTransform,
}

impl Default for DrainageProxyParams {
    fn default() -> Self {
        Self {
            low_percentile: 10.0,
            mid_latitude: None,
            distance: DistanceTransform::Euclidean,
        }
    }
}

/// Drainage-proxy flood model at a level above drainage (metres)
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainageProxy {
    pub level: f64,
}

impl Algorithm for DrainageProxy {
    type Input = Raster<f64>;
    type Output = FloodResult;
    type Params = DrainageProxyParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Drainage Proxy"
    }

    fn description(&self) -> &'static str {
        "Flood cells within a relative level of the lowest-lying cells, by distance to them"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        drainage_proxy(&input, self.level, &params)
    }
}

/// Edge length of one cell in metres, or `None` when it is unusable
fn cell_size_m(dem: &Raster<f64>, params: &DrainageProxyParams) -> Result<Option<f64>> {
    let mid_latitude = effective_mid_latitude(dem, params.mid_latitude)?;
    let size = pixel_size_m(dem.transform(), dem.crs(), mid_latitude)?;
    Ok((size.is_finite() && size > 0.0).then_some(size))
}

/// Pseudo height above drainage for every cell, in metres.
///
/// NaN elevation cells get a NaN surface value.
///
/// # Errors
/// - [`Error::InvalidParameter`] for a percentile outside (0, 100]
/// - [`Error::NoValidCells`] when the grid has no finite cell
/// - [`Error::MissingCrs`] / [`Error::UnclassifiedCrs`] when the cell size
///   cannot be expressed in metres
pub fn hand_surface(dem: &Raster<f64>, params: &DrainageProxyParams) -> Result<Raster<f64>> {
    validate_percentile("low_percentile", params.low_percentile)?;

    let sorted = sorted_finite(dem);
    let threshold =
        percentile_of_sorted(&sorted, params.low_percentile).ok_or(Error::NoValidCells)?;
    let low = dem.data().mapv(|v| v.is_finite() && v <= threshold);

    let binary = || low.mapv(|l| if l { 0.0 } else { 1.0 });
    let surface = match params.distance {
        DistanceTransform::Binary => binary(),
        DistanceTransform::Euclidean => match cell_size_m(dem, params)? {
            Some(size) => euclidean_distance(&low).mapv_into(|d| d * size),
            None => {
                tracing::warn!(
                    transform = ?dem.transform(),
                    "cell size in metres is unusable, falling back to binary drainage surface"
                );
                binary()
            }
        },
    };

    let surface = Zip::from(&surface)
        .and(dem.data())
        .map_collect(|&h, &z| if z.is_finite() { h } else { f64::NAN });

    let mut hand = dem.derive(surface)?;
    hand.set_nodata(Some(f64::NAN));
    Ok(hand)
}

/// Flood every cell whose height above the drainage proxy is `<= level`.
///
/// `level` is relative (metres above drainage), not an absolute elevation.
pub fn drainage_proxy(
    dem: &Raster<f64>,
    level: f64,
    params: &DrainageProxyParams,
) -> Result<FloodResult> {
    let hand = hand_surface(dem, params)?;
    flood_from_surface(&hand, level)
}
