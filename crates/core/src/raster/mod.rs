//! Raster data structures: elevation grids, flood masks, depth grids

mod cell;
mod geotransform;
mod grid;

pub use cell::CellValue;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
