//! Scenario pipeline
//!
//! One call runs the whole what-if chain for a configuration:
//! base elevation → target level → flood simulation → area → one dissolve
//! → road and facility exposure. The pipeline is pure: identical inputs
//! give identical reports, and nothing is cached between calls. Anything a
//! caller wants to carry across runs lives in an explicit
//! [`ScenarioContext`] it owns.

mod recommendation;

use serde::{Deserialize, Serialize};

use jolchobi_core::raster::Raster;
use jolchobi_core::{Error, PointFeature, Result, RoadFeature};

use crate::area::{calculate_flood_area_km2, effective_mid_latitude};
use crate::elevation::{estimate_base_elevation, validate_percentile};
use crate::exposure::{
    build_flood_polygons, calculate_flooded_roads_km_in_region,
    calculate_point_exposure_in_region, RoadExposure,
};
use crate::flood::{simulate, DistanceTransform, DrainageProxyParams, FloodMethod, FloodResult};

pub use recommendation::{
    recommend_water_level, ForecastSummary, HydrologySummary, PrecipitationSummary,
    RecommendationComponent, WaterLevelRecommendation, MAX_SUGGESTED_EXTRA,
};

fn default_low_percentile() -> f64 {
    10.0
}

/// Configuration of one scenario run.
///
/// There is no default `base_percentile`: earlier revisions of the workflow
/// used both 5 and 15, so callers state it explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Flood model
    #[serde(default)]
    pub method: FloodMethod,
    /// Water depth above the base elevation, metres
    pub extra_depth: f64,
    /// Elevation percentile whose cells define the base ("river") elevation
    pub base_percentile: f64,
    /// Elevation percentile of the drainage proxy's low cells
    #[serde(default = "default_low_percentile")]
    pub low_percentile: f64,
    /// Distance surface of the drainage proxy
    #[serde(default)]
    pub distance: DistanceTransform,
    /// Latitude for geographic cell sizes; `None` uses the grid centre
    #[serde(default)]
    pub mid_latitude: Option<f64>,
}

impl ScenarioConfig {
    pub fn new(method: FloodMethod, extra_depth: f64, base_percentile: f64) -> Self {
        Self {
            method,
            extra_depth,
            base_percentile,
            low_percentile: default_low_percentile(),
            distance: DistanceTransform::default(),
            mid_latitude: None,
        }
    }

    /// Reject unusable settings before anything is simulated
    pub fn validate(&self) -> Result<()> {
        if !self.extra_depth.is_finite() || self.extra_depth < 0.0 {
            return Err(Error::invalid_parameter(
                "extra_depth",
                self.extra_depth,
                "must be >= 0",
            ));
        }
        validate_percentile("base_percentile", self.base_percentile)?;
        validate_percentile("low_percentile", self.low_percentile)?;
        if let Some(lat) = self.mid_latitude {
            if !lat.is_finite() || lat.abs() > 90.0 {
                return Err(Error::invalid_parameter(
                    "mid_latitude",
                    lat,
                    "latitude must be finite and within [-90, 90]",
                ));
            }
        }
        Ok(())
    }

    /// Drainage-proxy parameters implied by this configuration
    pub fn drainage_params(&self) -> DrainageProxyParams {
        DrainageProxyParams {
            low_percentile: self.low_percentile,
            mid_latitude: self.mid_latitude,
            distance: self.distance,
        }
    }
}

/// A named collection of facilities (schools, clinics, ...)
#[derive(Debug, Clone, Default)]
pub struct PointLayer {
    pub name: String,
    pub features: Vec<PointFeature>,
}

impl PointLayer {
    pub fn new(name: impl Into<String>, features: Vec<PointFeature>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }
}

/// Vector layers overlaid on the flood, all in WGS84
#[derive(Debug, Clone, Default)]
pub struct ExposureLayers {
    pub roads: Vec<RoadFeature>,
    pub points: Vec<PointLayer>,
}

impl ExposureLayers {
    pub fn is_empty(&self) -> bool {
        self.roads.is_empty() && self.points.iter().all(|l| l.features.is_empty())
    }
}

/// Exposed facilities of one layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityExposure {
    pub layer: String,
    pub total: usize,
    pub exposed: usize,
}

/// Serializable summary of one scenario run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub method: FloodMethod,
    pub extra_depth: f64,
    pub base_percentile: f64,
    /// Estimated base ("river") elevation, metres
    pub base_elevation: f64,
    /// Absolute water surface, base elevation + extra depth
    pub target_level: f64,
    pub flooded_cells: usize,
    pub flooded_area_km2: f64,
    pub max_depth_m: f64,
    pub mean_depth_m: f64,
    pub roads: RoadExposure,
    pub facilities: Vec<FacilityExposure>,
    /// Grid CRS identifier
    pub crs: String,
    /// Grid bounds `[min_x, min_y, max_x, max_y]` in CRS units
    pub bounds: [f64; 4],
}

/// Grids and summary of one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioOutput {
    pub flood: FloodResult,
    pub report: ScenarioReport,
}

/// Run a complete scenario over a normalized elevation grid.
///
/// The bathtub model floods up to the absolute target level; the drainage
/// proxy floods up to `extra_depth` above its drainage cells.
///
/// # Errors
/// Configuration errors are reported before any computation. Input-data
/// errors (no finite cells, missing or unclassifiable CRS) abort the run.
/// Single features that fail are skipped inside the exposure step.
pub fn run_scenario(
    dem: &Raster<f64>,
    config: &ScenarioConfig,
    layers: &ExposureLayers,
) -> Result<ScenarioOutput> {
    config.validate()?;
    let crs = dem.require_crs()?;

    let base_elevation = estimate_base_elevation(dem, config.base_percentile)?;
    let target_level = base_elevation + config.extra_depth;
    let level = match config.method {
        FloodMethod::Bathtub => target_level,
        FloodMethod::DrainageProxy => config.extra_depth,
    };
    tracing::debug!(base_elevation, target_level, method = %config.method, "scenario levels");

    let flood = simulate(dem, config.method, level, &config.drainage_params())?;

    let mid_latitude = effective_mid_latitude(dem, config.mid_latitude)?;
    let flooded_area_km2 = calculate_flood_area_km2(&flood.mask, mid_latitude)?;

    let (roads, facilities) = if layers.is_empty() {
        (RoadExposure::default(), facility_totals(layers, |_| Ok(0))?)
    } else {
        let region = build_flood_polygons(&flood.mask)?;
        let roads = calculate_flooded_roads_km_in_region(&layers.roads, &region)?;
        let facilities = facility_totals(layers, |features| {
            calculate_point_exposure_in_region(features, &region)
        })?;
        (roads, facilities)
    };

    let (min_x, min_y, max_x, max_y) = dem.bounds();
    let report = ScenarioReport {
        method: config.method,
        extra_depth: config.extra_depth,
        base_percentile: config.base_percentile,
        base_elevation,
        target_level,
        flooded_cells: flood.flooded_cells(),
        flooded_area_km2,
        max_depth_m: flood.max_depth(),
        mean_depth_m: flood.mean_depth(),
        roads,
        facilities,
        crs: crs.identifier(),
        bounds: [min_x, min_y, max_x, max_y],
    };

    tracing::info!(
        method = %report.method,
        flooded_cells = report.flooded_cells,
        area_km2 = report.flooded_area_km2,
        roads_km = report.roads.total_km,
        "scenario complete"
    );
    Ok(ScenarioOutput { flood, report })
}

fn facility_totals(
    layers: &ExposureLayers,
    mut exposed: impl FnMut(&[PointFeature]) -> Result<usize>,
) -> Result<Vec<FacilityExposure>> {
    layers
        .points
        .iter()
        .map(|layer| {
            Ok(FacilityExposure {
                layer: layer.name.clone(),
                total: layer.features.len(),
                exposed: exposed(&layer.features)?,
            })
        })
        .collect()
}

/// Caller-owned state carried between scenario runs: the latest outlooks
/// and the last simulated water surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioContext {
    pub forecast: Option<ForecastSummary>,
    pub precipitation: Option<PrecipitationSummary>,
    pub hydrology: Option<HydrologySummary>,
    /// Target level of the last recorded run
    pub last_target_level: Option<f64>,
}

impl ScenarioContext {
    /// Recommendation from whichever outlooks are present
    pub fn recommendation(&self) -> Option<WaterLevelRecommendation> {
        recommend_water_level(
            self.forecast.as_ref(),
            self.precipitation.as_ref(),
            self.hydrology.as_ref(),
        )
    }

    /// Config for the next run, taking the recommended extra depth when one
    /// exists and `template`'s otherwise
    pub fn recommended_config(&self, template: &ScenarioConfig) -> ScenarioConfig {
        let mut config = template.clone();
        if let Some(rec) = self.recommendation() {
            config.extra_depth = rec.suggested_extra;
        }
        config
    }

    /// Remember the outcome of a run
    pub fn record(&mut self, report: &ScenarioReport) {
        self.last_target_level = Some(report.target_level);
    }
}
