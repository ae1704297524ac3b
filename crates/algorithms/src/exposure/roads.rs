//! Road exposure: flooded length of road polylines

use geo::{BooleanOps, Euclidean, Haversine, Length, LineString, MultiLineString};

use jolchobi_core::raster::Raster;
use jolchobi_core::{CrsKind, Error, Reprojector, Result, RoadFeature};

use super::{build_flood_polygons, FloodRegion, RoadExposure};
use crate::maybe_rayon::*;

/// Total length in metres of `lines` in a reference of the given kind
fn length_m(lines: &MultiLineString<f64>, kind: CrsKind) -> f64 {
    lines
        .0
        .iter()
        .map(|ls| match kind {
            CrsKind::Projected => ls.length::<Euclidean>(),
            CrsKind::Geographic => ls.length::<Haversine>(),
        })
        .sum()
}

fn check_path(road: &RoadFeature) -> Result<()> {
    let coords = &road.path.0;
    if coords.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
        return Err(Error::InvalidGeometry(format!("road '{}' has non-finite vertices", road.name)));
    }
    if coords.windows(2).all(|w| w[0] == w[1]) {
        return Err(Error::InvalidGeometry(format!("road '{}' has no extent", road.name)));
    }
    Ok(())
}

/// Flooded length of one road in metres
fn flooded_length_m(road: &RoadFeature, reprojector: &Reprojector, region: &FloodRegion) -> Result<f64> {
    check_path(road)?;
    let path: LineString<f64> = reprojector.forward_line(&road.path)?;
    let inside = region.geometry.clip(&MultiLineString::new(vec![path]), false);
    Ok(length_m(&inside, region.kind))
}

/// Flooded road length of `roads` over the flooded cells of `mask`.
///
/// Roads without a category, or with `"unknown"`, count toward the total
/// only. Returns zero and no categories for no roads or a dry mask.
pub fn calculate_flooded_roads_km(roads: &[RoadFeature], mask: &Raster<u8>) -> Result<RoadExposure> {
    if roads.is_empty() {
        return Ok(RoadExposure::default());
    }
    let region = build_flood_polygons(mask)?;
    calculate_flooded_roads_km_in_region(roads, &region)
}

/// [`calculate_flooded_roads_km`] against a region that is already built.
///
/// Lengths are planar on projected grids and great-circle on geographic
/// grids, so the result is in kilometres either way. A road that cannot be
/// reprojected or intersected is skipped with a warning.
pub fn calculate_flooded_roads_km_in_region(
    roads: &[RoadFeature],
    region: &FloodRegion,
) -> Result<RoadExposure> {
    if roads.is_empty() || region.is_empty() {
        return Ok(RoadExposure::default());
    }
    let reprojector = Reprojector::to_crs(&region.crs)?;

    let measured: Vec<(Option<&str>, f64)> = roads
        .into_par_iter()
        .filter_map(|road| match flooded_length_m(road, &reprojector, region) {
            Ok(m) => Some((road.known_category(), m / 1000.0)),
            Err(e) => {
                tracing::warn!(name = %road.name, error = %e, "skipping road");
                None
            }
        })
        .collect();

    let mut exposure = RoadExposure::default();
    for (category, km) in measured {
        exposure.total_km += km;
        if let Some(category) = category {
            *exposure.by_category.entry(category.to_string()).or_insert(0.0) += km;
        }
    }

    tracing::debug!(
        roads = roads.len(),
        total_km = exposure.total_km,
        categories = exposure.by_category.len(),
        "road exposure"
    );
    Ok(exposure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use jolchobi_core::{GeoTransform, CRS};
    use ndarray::{s, Array2};

    const ORIGIN_X: f64 = 500_000.0;
    const ORIGIN_Y: f64 = 2_800_500.0;

    /// 5x5 grid of 100 m cells in UTM 45N, flooded 3x3 block in the middle
    fn utm_mask() -> Raster<u8> {
        let mut data = Array2::zeros((5, 5));
        data.slice_mut(s![1..4, 1..4]).fill(1);
        Raster::from_array(data)
            .with_transform(GeoTransform::new(ORIGIN_X, ORIGIN_Y, 100.0, -100.0))
            .with_crs(CRS::from_epsg(32645))
    }

    /// Road between two UTM positions, expressed in lon/lat
    fn road(name: &str, category: Option<&str>, from: (f64, f64), to: (f64, f64)) -> RoadFeature {
        let utm = Reprojector::to_crs(&CRS::from_epsg(32645)).unwrap();
        let a = utm.inverse(ORIGIN_X + from.0, ORIGIN_Y - from.1).unwrap();
        let b = utm.inverse(ORIGIN_X + to.0, ORIGIN_Y - to.1).unwrap();
        RoadFeature::new(name, category.map(String::from), LineString::from(vec![a, b]))
    }

    #[test]
    fn test_road_crossing_three_cells() {
        let roads = vec![road("main", Some("primary"), (50.0, 250.0), (450.0, 250.0))];
        let exposure = calculate_flooded_roads_km(&roads, &utm_mask()).unwrap();
        assert_relative_eq!(exposure.total_km, 0.3, epsilon = 1e-6);
        assert_relative_eq!(exposure.by_category["primary"], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_road_outside() {
        let roads = vec![road("ring", Some("secondary"), (50.0, 450.0), (450.0, 450.0))];
        let exposure = calculate_flooded_roads_km(&roads, &utm_mask()).unwrap();
        assert_relative_eq!(exposure.total_km, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_road_fully_inside_counts_full_length() {
        let roads = vec![road("lane", None, (150.0, 150.0), (350.0, 350.0))];
        let exposure = calculate_flooded_roads_km(&roads, &utm_mask()).unwrap();
        assert_relative_eq!(exposure.total_km, (2.0f64 * 200.0 * 200.0).sqrt() / 1000.0, epsilon = 1e-6);
        assert!(exposure.by_category.is_empty());
    }

    #[test]
    fn test_unknown_category_in_total_only() {
        let roads = vec![
            road("a", Some("primary"), (50.0, 250.0), (450.0, 250.0)),
            road("b", Some("unknown"), (250.0, 50.0), (250.0, 450.0)),
            road("c", None, (150.0, 150.0), (150.0, 350.0)),
        ];
        let exposure = calculate_flooded_roads_km(&roads, &utm_mask()).unwrap();
        assert_relative_eq!(exposure.total_km, 0.8, epsilon = 1e-6);
        assert_eq!(exposure.by_category.len(), 1);
        assert_relative_eq!(exposure.by_category["primary"], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_empty_inputs() {
        let exposure = calculate_flooded_roads_km(&[], &utm_mask()).unwrap();
        assert_eq!(exposure, RoadExposure::default());

        let dry = Raster::<u8>::new(5, 5)
            .with_transform(GeoTransform::new(ORIGIN_X, ORIGIN_Y, 100.0, -100.0))
            .with_crs(CRS::from_epsg(32645));
        let roads = vec![road("main", Some("primary"), (50.0, 250.0), (450.0, 250.0))];
        assert_eq!(calculate_flooded_roads_km(&roads, &dry).unwrap(), RoadExposure::default());
    }

    #[test]
    fn test_broken_road_is_skipped() {
        let roads = vec![
            RoadFeature::new("point-like", Some("track".into()), LineString::from(vec![(90.0, 25.0), (90.0, 25.0)])),
            RoadFeature::new("nan", Some("track".into()), LineString::from(vec![(f64::NAN, 25.0), (90.0, 25.0)])),
            road("main", Some("primary"), (50.0, 250.0), (450.0, 250.0)),
        ];
        let exposure = calculate_flooded_roads_km(&roads, &utm_mask()).unwrap();
        assert_relative_eq!(exposure.total_km, 0.3, epsilon = 1e-6);
        assert!(!exposure.by_category.contains_key("track"));
    }

    #[test]
    fn test_geographic_grid_measures_metres() {
        // one 0.01 degree cell at the equator, road across its full width
        let mask = Raster::from_array(ndarray::array![[1u8]])
            .with_transform(GeoTransform::new(0.0, 0.01, 0.01, -0.01))
            .with_crs(CRS::wgs84());
        let roads = vec![RoadFeature::new(
            "equator",
            Some("primary".into()),
            LineString::from(vec![(-0.01, 0.005), (0.02, 0.005)]),
        )];
        let exposure = calculate_flooded_roads_km(&roads, &mask).unwrap();
        // about 1.11 km per 0.01 degree
        assert!((exposure.total_km - 1.112).abs() < 0.01, "{}", exposure.total_km);
    }
}
