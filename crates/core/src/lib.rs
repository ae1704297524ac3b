//! # Jolchobi Core
//!
//! Core types, traits and I/O for flood inundation and exposure analysis.
//!
//! This crate provides:
//! - `Raster<T>`: Georeferenced raster grid (elevation, flood mask, depth)
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS` / `CrsKind`: Coordinate reference system with explicit
//!   geographic/projected classification
//! - `Reprojector`: WGS84 to grid CRS reprojection
//! - Vector feature types for roads and facilities
//! - GeoTIFF I/O for the command-line front end

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::{CrsKind, Reprojector, TransverseMercator, CRS};
pub use error::{Error, ErrorClass, Result};
pub use raster::{CellValue, GeoTransform, Raster};
pub use vector::{PointFeature, RoadFeature};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{CrsKind, Reprojector, CRS};
    pub use crate::error::{Error, ErrorClass, Result};
    pub use crate::raster::{CellValue, GeoTransform, Raster};
    pub use crate::vector::{PointFeature, RoadFeature};
    pub use crate::Algorithm;
}

/// Core trait for the interchangeable simulation algorithms.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
