//! GeoJSON loading for road and facility layers

use anyhow::{Context, Result};
use geojson::{Feature, GeoJson, Value};
use std::path::Path;
use tracing::{debug, warn};

use jolchobi_core::{PointFeature, RoadFeature};

fn read_features(path: &Path) -> Result<Vec<Feature>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let geojson: GeoJson = text
        .parse()
        .with_context(|| format!("Invalid GeoJSON in {}", path.display()))?;
    Ok(match geojson {
        GeoJson::FeatureCollection(fc) => fc.features,
        GeoJson::Feature(f) => vec![f],
        GeoJson::Geometry(g) => vec![Feature::from(g)],
    })
}

fn text_property(feature: &Feature, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| feature.property(k))
        .find_map(|v| v.as_str().map(str::to_string))
}

fn position(coords: &[f64]) -> Option<(f64, f64)> {
    match coords {
        [lon, lat, ..] => Some((*lon, *lat)),
        _ => None,
    }
}

fn polyline(coords: &[Vec<f64>]) -> Option<Vec<(f64, f64)>> {
    coords.iter().map(|c| position(c)).collect()
}

/// Load roads from LineString / MultiLineString features.
///
/// The category comes from `highway` (OpenStreetMap) or `category`; each
/// part of a MultiLineString becomes its own road.
pub fn load_roads(path: &Path) -> Result<Vec<RoadFeature>> {
    let mut roads = Vec::new();
    for (i, feature) in read_features(path)?.iter().enumerate() {
        let name = text_property(feature, &["name"]).unwrap_or_else(|| format!("road {i}"));
        let category = text_property(feature, &["highway", "category"]);
        let parts = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::LineString(line)) => vec![polyline(line)],
            Some(Value::MultiLineString(lines)) => lines.iter().map(|l| polyline(l)).collect(),
            _ => {
                warn!(%name, "skipping road without line geometry");
                continue;
            }
        };
        for part in parts {
            match part {
                Some(coords) if coords.len() >= 2 => {
                    roads.push(RoadFeature::new(name.clone(), category.clone(), coords.into()))
                }
                _ => warn!(%name, "skipping malformed road geometry"),
            }
        }
    }
    debug!(count = roads.len(), path = %path.display(), "roads loaded");
    Ok(roads)
}

/// Load facilities from Point / MultiPoint features.
///
/// The category comes from `amenity` (OpenStreetMap) or `category`.
pub fn load_points(path: &Path) -> Result<Vec<PointFeature>> {
    let mut points = Vec::new();
    for (i, feature) in read_features(path)?.iter().enumerate() {
        let name = text_property(feature, &["name"]).unwrap_or_else(|| format!("point {i}"));
        let category = text_property(feature, &["amenity", "category"]);
        let positions: Vec<Option<(f64, f64)>> = match feature.geometry.as_ref().map(|g| &g.value) {
            Some(Value::Point(p)) => vec![position(p)],
            Some(Value::MultiPoint(ps)) => ps.iter().map(|p| position(p)).collect(),
            _ => {
                warn!(%name, "skipping facility without point geometry");
                continue;
            }
        };
        for pos in positions {
            let Some((lon, lat)) = pos else {
                warn!(%name, "skipping malformed facility position");
                continue;
            };
            let mut point = PointFeature::new(name.clone(), lon, lat);
            if let Some(c) = &category {
                point = point.with_category(c.clone());
            }
            points.push(point);
        }
    }
    debug!(count = points.len(), path = %path.display(), "facilities loaded");
    Ok(points)
}
