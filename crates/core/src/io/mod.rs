//! GeoTIFF reading and writing for the command-line front end.
//!
//! The analysis code never touches the filesystem; these helpers only
//! materialize grids for it and persist its outputs.

mod native;

pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
    GeoTiffOptions,
};
