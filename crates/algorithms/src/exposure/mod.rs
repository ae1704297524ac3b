//! Exposure analysis
//!
//! Overlays vector features on a flood mask:
//! - [`build_flood_polygons`]: dissolved flood region in world coordinates
//! - [`calculate_point_exposure`]: facilities strictly inside the region
//! - [`calculate_flooded_roads_km`]: flooded road length, per category
//! - [`sample_mask_at_point`]: single-point cell lookup that never fails
//!
//! Features arrive in WGS84 lon/lat and are reprojected into the grid's
//! reference system. A feature that cannot be reprojected or intersected is
//! logged and skipped; the rest of the collection is still counted.

mod points;
mod polygonize;
mod roads;
mod sample;

use geo::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use jolchobi_core::{CrsKind, CRS};

pub use points::{calculate_point_exposure, calculate_point_exposure_in_region};
pub use polygonize::build_flood_polygons;
pub use roads::{calculate_flooded_roads_km, calculate_flooded_roads_km_in_region};
pub use sample::sample_mask_at_point;

/// Dissolved flood region of a mask
#[derive(Debug, Clone)]
pub struct FloodRegion {
    /// Flooded area in the grid's world coordinates (exteriors
    /// counter-clockwise, holes clockwise)
    pub geometry: MultiPolygon<f64>,
    /// Reference system of `geometry`
    pub crs: CRS,
    /// Classification of `crs`, decides how lengths are measured
    pub kind: CrsKind,
}

impl FloodRegion {
    /// True for a mask without flooded cells
    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }
}

/// Flooded road length in kilometres
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadExposure {
    /// All flooded road length, categorized or not
    pub total_km: f64,
    /// Flooded length per known road category
    pub by_category: BTreeMap<String, f64>,
}
