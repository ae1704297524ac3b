//! Vector infrastructure features.
//!
//! Features are supplied by the caller in WGS84 longitude/latitude and are
//! only read by the analysis code, never mutated or cached.

use geo_types::{Coord, LineString};

/// Category value treated as "no category" by per-category breakdowns
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// A point asset such as a health facility or a cyclone shelter
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    pub name: String,
    pub category: Option<String>,
    /// WGS84 (lon, lat)
    pub position: Coord<f64>,
}

impl PointFeature {
    pub fn new(name: impl Into<String>, lon: f64, lat: f64) -> Self {
        Self {
            name: name.into(),
            category: None,
            position: Coord { x: lon, y: lat },
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A linear asset, typically a road segment tagged with its highway class
#[derive(Debug, Clone, PartialEq)]
pub struct RoadFeature {
    pub name: String,
    pub category: Option<String>,
    /// WGS84 (lon, lat) vertices
    pub path: LineString<f64>,
}

impl RoadFeature {
    pub fn new(name: impl Into<String>, category: Option<String>, path: LineString<f64>) -> Self {
        Self {
            name: name.into(),
            category,
            path,
        }
    }

    /// Category usable as a breakdown key: present and not `"unknown"`
    pub fn known_category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != UNKNOWN_CATEGORY)
    }
}
