//! End-to-end flood scenarios through the public API.

use approx::assert_relative_eq;
use geo::LineString;
use jolchobi_algorithms::area::{calculate_flood_area_km2, pixel_area_km2};
use jolchobi_algorithms::elevation::{estimate_base_elevation, normalize_elevation};
use jolchobi_algorithms::exposure::{
    calculate_flooded_roads_km, calculate_point_exposure, sample_mask_at_point,
};
use jolchobi_algorithms::flood::{bathtub, FloodMethod};
use jolchobi_algorithms::scenario::{run_scenario, ExposureLayers, PointLayer, ScenarioConfig};
use jolchobi_core::{Error, GeoTransform, PointFeature, Raster, Reprojector, RoadFeature, CRS};

const UTM_X: f64 = 500_000.0;
const UTM_Y: f64 = 2_800_500.0;

fn utm_45n() -> CRS {
    CRS::from_epsg(32645)
}

/// Bangladesh Transverse Mercator, the national grid around Sylhet
fn btm() -> CRS {
    CRS::from_epsg(3106)
}

/// 5x5 grid of 100 m cells: 1 m floodplain block in the middle, 10 m banks
fn floodplain_at(crs: CRS, x: f64, y: f64) -> Raster<f64> {
    let mut dem = Raster::filled(5, 5, 10.0)
        .with_transform(GeoTransform::new(x, y, 100.0, -100.0))
        .with_crs(crs);
    for row in 1..4 {
        for col in 1..4 {
            dem.set(row, col, 1.0).unwrap();
        }
    }
    dem
}

fn floodplain() -> Raster<f64> {
    floodplain_at(utm_45n(), UTM_X, UTM_Y)
}

/// WGS84 position of a point given as metres east/south of a grid origin
fn lonlat_from(crs: &CRS, x: f64, y: f64, east: f64, south: f64) -> (f64, f64) {
    Reprojector::to_crs(crs)
        .unwrap()
        .inverse(x + east, y - south)
        .unwrap()
}

fn lonlat(east: f64, south: f64) -> (f64, f64) {
    lonlat_from(&utm_45n(), UTM_X, UTM_Y, east, south)
}

#[test]
fn valley_bathtub() {
    let dem = Raster::from_vec(
        vec![10.0, 10.0, 10.0, 5.0, 2.0, 5.0, 10.0, 10.0, 10.0],
        3,
        3,
    )
    .unwrap();
    let flood = bathtub(&dem, 6.0).unwrap();
    assert_eq!(
        flood.mask.data().as_slice().unwrap(),
        &[0, 0, 0, 1, 1, 1, 0, 0, 0]
    );
    assert_relative_eq!(flood.depth.get(1, 1).unwrap(), 4.0);
    assert_relative_eq!(flood.depth.get(1, 0).unwrap(), 1.0);
    assert_relative_eq!(flood.depth.get(1, 2).unwrap(), 1.0);
}

#[test]
fn dry_mask_has_no_area_and_no_exposure() {
    let mask = Raster::<u8>::new(4, 4)
        .with_transform(GeoTransform::new(90.0, 25.0, 0.001, -0.001))
        .with_crs(CRS::wgs84());
    assert_eq!(calculate_flood_area_km2(&mask, 25.0).unwrap(), 0.0);
    let points = vec![PointFeature::new("school", 90.0005, 24.9995)];
    assert_eq!(calculate_point_exposure(&points, &mask).unwrap(), 0);
}

#[test]
fn facilities_in_flooded_block() {
    let mut mask = Raster::<u8>::new(5, 5)
        .with_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0))
        .with_crs(CRS::wgs84());
    for row in 1..4 {
        for col in 1..4 {
            mask.set(row, col, 1).unwrap();
        }
    }
    let points = vec![
        PointFeature::new("Inside 1", 1.5, 3.5),
        PointFeature::new("Inside 2", 2.5, 2.5),
        PointFeature::new("Outside", 0.5, 0.5),
    ];
    assert_eq!(calculate_point_exposure(&points, &mask).unwrap(), 2);
    assert_eq!(sample_mask_at_point(&mask, 2.5, 2.5), 1);
    assert_eq!(sample_mask_at_point(&mask, 0.5, 0.5), 0);
}

#[test]
fn road_across_three_cells() {
    let flood = bathtub(&floodplain(), 2.0).unwrap();
    let road = |from: (f64, f64), to: (f64, f64)| {
        LineString::from(vec![lonlat(from.0, from.1), lonlat(to.0, to.1)])
    };
    let roads = vec![
        RoadFeature::new("crossing", Some("primary".into()), road((0.0, 250.0), (500.0, 250.0))),
        RoadFeature::new("bank", Some("primary".into()), road((0.0, 50.0), (500.0, 50.0))),
    ];
    let exposure = calculate_flooded_roads_km(&roads, &flood.mask).unwrap();
    assert_relative_eq!(exposure.total_km, 0.3, epsilon = 1e-6);
    assert_relative_eq!(exposure.by_category["primary"], 0.3, epsilon = 1e-6);
}

#[test]
fn geographic_pixel_area_sanity() {
    let gt = GeoTransform::new(90.0, 25.0, 0.001, -0.001);
    let area = pixel_area_km2(&gt, Some(&CRS::wgs84()), 25.0).unwrap();
    assert!(area > 0.0 && area < 0.02);
    let expected = 0.001 * 0.001 * 111.32 * 111.32 * 25f64.to_radians().cos();
    assert_relative_eq!(area, expected, epsilon = 1e-15);
}

#[test]
fn sentinel_cells_do_not_enter_base_elevation() {
    let mut dem = floodplain();
    dem.set(0, 0, -9999.0).unwrap();
    dem.set(4, 4, -32768.0).unwrap();
    normalize_elevation(&mut dem, Some(-9999.0));
    // 9 floodplain cells of 1 m out of 23 finite cells
    let base = estimate_base_elevation(&dem, 5.0).unwrap();
    assert_relative_eq!(base, 1.0);
}

#[test]
fn full_scenario_with_layers() {
    let dem = floodplain();
    let layers = ExposureLayers {
        roads: vec![RoadFeature::new(
            "crossing",
            Some("secondary".into()),
            LineString::from(vec![lonlat(0.0, 250.0), lonlat(500.0, 250.0)]),
        )],
        points: vec![
            PointLayer::new(
                "schools",
                vec![
                    PointFeature::new("flooded", lonlat(250.0, 250.0).0, lonlat(250.0, 250.0).1),
                    PointFeature::new("dry", lonlat(50.0, 50.0).0, lonlat(50.0, 50.0).1),
                ],
            ),
            PointLayer::new("clinics", vec![]),
        ],
    };

    let config = ScenarioConfig::new(FloodMethod::Bathtub, 1.5, 5.0);
    let out = run_scenario(&dem, &config, &layers).unwrap();
    let report = &out.report;
    assert_relative_eq!(report.base_elevation, 1.0);
    assert_relative_eq!(report.target_level, 2.5);
    assert_eq!(report.flooded_cells, 9);
    assert_relative_eq!(report.flooded_area_km2, 0.09, epsilon = 1e-12);
    assert_relative_eq!(report.max_depth_m, 1.5);
    assert_relative_eq!(report.roads.total_km, 0.3, epsilon = 1e-6);
    assert_eq!(report.facilities.len(), 2);
    assert_eq!(report.facilities[0].layer, "schools");
    assert_eq!(report.facilities[0].total, 2);
    assert_eq!(report.facilities[0].exposed, 1);
    assert_eq!(report.facilities[1].exposed, 0);
}

#[test]
fn national_grid_scenario_with_layers() {
    let (x, y) = (640_000.0, 775_000.0);
    let dem = floodplain_at(btm(), x, y);
    let at = |east: f64, south: f64| lonlat_from(&btm(), x, y, east, south);
    let layers = ExposureLayers {
        roads: vec![RoadFeature::new(
            "embankment road",
            Some("primary".into()),
            LineString::from(vec![at(0.0, 150.0), at(500.0, 150.0)]),
        )],
        points: vec![PointLayer::new(
            "shelters",
            vec![
                PointFeature::new("inside", at(350.0, 350.0).0, at(350.0, 350.0).1),
                PointFeature::new("outside", at(450.0, 50.0).0, at(450.0, 50.0).1),
            ],
        )],
    };

    let config = ScenarioConfig::new(FloodMethod::Bathtub, 1.0, 5.0);
    let out = run_scenario(&dem, &config, &layers).unwrap();
    let report = &out.report;
    assert_eq!(report.flooded_cells, 9);
    assert_relative_eq!(report.flooded_area_km2, 0.09, epsilon = 1e-12);
    assert_relative_eq!(report.roads.total_km, 0.3, epsilon = 1e-6);
    assert_relative_eq!(report.roads.by_category["primary"], 0.3, epsilon = 1e-6);
    assert_eq!(report.facilities[0].total, 2);
    assert_eq!(report.facilities[0].exposed, 1);
}

#[test]
fn all_nan_grid_is_rejected() {
    let dem = Raster::filled(3, 3, f64::NAN).with_crs(utm_45n());
    let config = ScenarioConfig::new(FloodMethod::Bathtub, 1.0, 5.0);
    let err = run_scenario(&dem, &config, &ExposureLayers::default()).unwrap_err();
    assert!(matches!(err, Error::NoValidCells));
}
