//! # Jolchobi Algorithms
//!
//! Flood inundation and exposure analysis over elevation grids.
//!
//! ## Modules
//!
//! - **elevation**: missing-value normalization, percentiles, base elevation
//! - **flood**: bathtub and drainage-proxy simulators
//! - **area**: CRS-aware cell and flood areas
//! - **exposure**: flood polygons, facility counts, flooded road length
//! - **scenario**: end-to-end pipeline and water-level recommendation
//!
//! Nothing here performs I/O or keeps state between calls.

pub(crate) mod maybe_rayon;

pub mod area;
pub mod elevation;
pub mod exposure;
pub mod flood;
pub mod scenario;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::area::{calculate_flood_area_km2, grid_mid_latitude, pixel_area_km2};
    pub use crate::elevation::{estimate_base_elevation, normalize_elevation, percentile};
    pub use crate::exposure::{
        build_flood_polygons, calculate_flooded_roads_km, calculate_point_exposure,
        sample_mask_at_point, FloodRegion, RoadExposure,
    };
    pub use crate::flood::{
        bathtub, drainage_proxy, hand_surface, simulate, Bathtub, DistanceTransform,
        DrainageProxy, DrainageProxyParams, FloodMethod, FloodResult,
    };
    pub use crate::scenario::{
        recommend_water_level, run_scenario, ExposureLayers, PointLayer, ScenarioConfig,
        ScenarioContext, ScenarioOutput, ScenarioReport,
    };
    pub use jolchobi_core::prelude::*;
}
