//! Flood simulators
//!
//! Two interchangeable, stateless models that turn an elevation grid and a
//! water level into a flood mask (1 = flooded) and a depth grid:
//!
//! - **Bathtub**: every finite cell at or below an absolute water surface
//! - **Drainage proxy**: every cell whose pseudo height above drainage is at
//!   or below a relative level; keeps water attached to the low-lying
//!   network instead of filling isolated pits
//!
//! Both share [`flood_from_surface`]: threshold a surface, depth is the
//! positive difference, zero outside the mask.

mod bathtub;
mod distance;
mod drainage_proxy;

use std::fmt;
use std::str::FromStr;

use ndarray::Zip;
use serde::{Deserialize, Serialize};

use jolchobi_core::raster::Raster;
use jolchobi_core::{Error, Result};

pub use bathtub::{bathtub, Bathtub};
pub use drainage_proxy::{
    drainage_proxy, hand_surface, DistanceTransform, DrainageProxy, DrainageProxyParams,
};

/// Flood simulation output. Both grids share the elevation grid's shape,
/// transform and CRS.
#[derive(Debug, Clone)]
pub struct FloodResult {
    /// 1 where flooded, 0 elsewhere
    pub mask: Raster<u8>,
    /// Water depth in metres; 0 wherever the mask is 0
    pub depth: Raster<f64>,
}

impl FloodResult {
    /// Number of flooded cells
    pub fn flooded_cells(&self) -> usize {
        self.mask.count(1)
    }

    /// Deepest flooded cell, 0 for a dry grid
    pub fn max_depth(&self) -> f64 {
        self.depth.data().iter().copied().fold(0.0, f64::max)
    }

    /// Mean depth over flooded cells, 0 for a dry grid
    pub fn mean_depth(&self) -> f64 {
        let flooded = self.flooded_cells();
        if flooded == 0 {
            return 0.0;
        }
        let total: f64 = Zip::from(self.mask.data())
            .and(self.depth.data())
            .fold(0.0, |acc, &m, &d| if m == 1 { acc + d } else { acc });
        total / flooded as f64
    }
}

/// Flood model selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FloodMethod {
    /// Absolute water surface over the whole grid
    #[default]
    Bathtub,
    /// Relative level above the approximated drainage network
    DrainageProxy,
}

impl FloodMethod {
    /// Stable identifier, matching the serde and CLI spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            FloodMethod::Bathtub => "bathtub",
            FloodMethod::DrainageProxy => "drainage-proxy",
        }
    }
}

impl fmt::Display for FloodMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FloodMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bathtub" => Ok(FloodMethod::Bathtub),
            "drainage-proxy" | "drainage_proxy" | "hand" | "hand-approx" => {
                Ok(FloodMethod::DrainageProxy)
            }
            other => Err(Error::invalid_parameter(
                "method",
                other,
                "expected 'bathtub' or 'drainage-proxy'",
            )),
        }
    }
}

/// Threshold `surface` at `level`.
///
/// `mask = 1` where the surface is finite and `<= level`; depth is
/// `level - surface` on flooded cells and 0 elsewhere. NaN cells are never
/// flooded.
///
/// # Errors
/// [`Error::InvalidParameter`] for a non-finite level.
pub fn flood_from_surface(surface: &Raster<f64>, level: f64) -> Result<FloodResult> {
    if !level.is_finite() {
        return Err(Error::invalid_parameter("level", level, "water level must be finite"));
    }

    let mask_data = surface
        .data()
        .mapv(|v| u8::from(v.is_finite() && v <= level));
    let depth_data = Zip::from(surface.data())
        .and(&mask_data)
        .map_collect(|&v, &m| if m == 1 { (level - v).max(0.0) } else { 0.0 });

    Ok(FloodResult {
        mask: surface.derive(mask_data)?,
        depth: surface.derive(depth_data)?,
    })
}

/// Run the selected model.
///
/// `level` is an absolute elevation for [`FloodMethod::Bathtub`] and a
/// height above drainage for [`FloodMethod::DrainageProxy`]; `params` is
/// only consulted by the latter.
pub fn simulate(
    dem: &Raster<f64>,
    method: FloodMethod,
    level: f64,
    params: &DrainageProxyParams,
) -> Result<FloodResult> {
    tracing::debug!(%method, level, rows = dem.rows(), cols = dem.cols(), "simulating flood");
    match method {
        FloodMethod::Bathtub => bathtub(dem, level),
        FloodMethod::DrainageProxy => drainage_proxy(dem, level, params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flood_from_surface() {
        let hand = Raster::from_vec(
            vec![8.0, 8.0, 8.0, 3.0, 0.0, 3.0, 8.0, 8.0, f64::NAN],
            3,
            3,
        )
        .unwrap();
        let result = flood_from_surface(&hand, 4.0).unwrap();
        assert_eq!(result.mask.get(1, 0).unwrap(), 1);
        assert_eq!(result.mask.get(1, 1).unwrap(), 1);
        assert_eq!(result.mask.get(1, 2).unwrap(), 1);
        assert_eq!(result.mask.get(0, 0).unwrap(), 0);
        assert_eq!(result.mask.get(2, 2).unwrap(), 0);
        assert_relative_eq!(result.depth.get(1, 1).unwrap(), 4.0);
        assert_relative_eq!(result.depth.get(1, 0).unwrap(), 1.0);
        assert_eq!(result.depth.get(2, 2).unwrap(), 0.0);
        assert_eq!(result.flooded_cells(), 3);
        assert_relative_eq!(result.max_depth(), 4.0);
        assert_relative_eq!(result.mean_depth(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_level_rejected() {
        let surface = Raster::filled(2, 2, 1.0);
        assert!(flood_from_surface(&surface, f64::NAN).is_err());
        assert!(flood_from_surface(&surface, f64::INFINITY).is_err());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("bathtub".parse::<FloodMethod>().unwrap(), FloodMethod::Bathtub);
        assert_eq!(
            "Drainage-Proxy".parse::<FloodMethod>().unwrap(),
            FloodMethod::DrainageProxy
        );
        assert!("hydrodynamic".parse::<FloodMethod>().is_err());
        assert_eq!(FloodMethod::DrainageProxy.to_string(), "drainage-proxy");
    }

    #[test]
    fn test_method_serde_spelling() {
        let json = serde_json::to_string(&FloodMethod::DrainageProxy).unwrap();
        assert_eq!(json, "\"drainage-proxy\"");
        let parsed: FloodMethod = serde_json::from_str("\"bathtub\"").unwrap();
        assert_eq!(parsed, FloodMethod::Bathtub);
    }
}
