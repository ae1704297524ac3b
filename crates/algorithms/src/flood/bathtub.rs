//! Bathtub inundation
//!
//! Every finite cell at or below an absolute water surface is flooded,
//! regardless of whether it is hydraulically connected to anything.

use jolchobi_core::raster::Raster;
use jolchobi_core::{Algorithm, Error, Result};

use super::{flood_from_surface, FloodResult};

/// Bathtub flood model at a fixed absolute water surface (metres)
#[derive(Debug, Clone, Copy, Default)]
pub struct Bathtub {
    pub target_level: f64,
}

impl Algorithm for Bathtub {
    type Input = Raster<f64>;
    type Output = FloodResult;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Bathtub"
    }

    fn description(&self) -> &'static str {
        "Flood every cell at or below an absolute water surface elevation"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        bathtub(&input, self.target_level)
    }
}

/// Flood `dem` up to the absolute elevation `target_level`.
///
/// A level below every finite cell yields an all-zero mask and depth, not
/// an error.
pub fn bathtub(dem: &Raster<f64>, target_level: f64) -> Result<FloodResult> {
    flood_from_surface(dem, target_level)
}
