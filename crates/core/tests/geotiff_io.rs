//! GeoTIFF file round trips through the filesystem.

use jolchobi_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use jolchobi_core::{CrsKind, GeoTransform, Raster, CRS};

#[test]
fn mask_written_as_float_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mask.tif");

    let mask = Raster::from_vec(vec![0u8, 1, 1, 0], 2, 2)
        .unwrap()
        .with_transform(GeoTransform::new(90.0, 25.0, 0.001, -0.001))
        .with_crs(CRS::wgs84());
    write_geotiff(&mask, &path, &GeoTiffOptions::default()).unwrap();

    let back: Raster<u8> = read_geotiff(&path).unwrap();
    assert_eq!(back.data(), mask.data());
    assert_eq!(back.transform(), mask.transform());
    let crs = back.crs().unwrap();
    assert_eq!(crs.epsg(), Some(4326));
    assert_eq!(crs.kind().unwrap(), CrsKind::Geographic);
    assert_eq!(back.nodata(), None);
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result: jolchobi_core::Result<Raster<f64>> = read_geotiff(dir.path().join("absent.tif"));
    assert!(matches!(result, Err(jolchobi_core::Error::Io(_))));
}

#[test]
fn albers_grid_reads_back_projected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("conus.tif");

    let dem = Raster::from_vec(vec![12.0, 14.5, 9.0, 11.0], 2, 2)
        .unwrap()
        .with_transform(GeoTransform::new(-2_000_000.0, 3_000_000.0, 30.0, -30.0))
        .with_crs(CRS::from_epsg(5070));
    write_geotiff(&dem, &path, &GeoTiffOptions::default()).unwrap();

    let back: Raster<f64> = read_geotiff(&path).unwrap();
    let crs = back.crs().unwrap();
    assert_eq!(crs.epsg(), Some(5070));
    assert_eq!(crs.kind().unwrap(), CrsKind::Projected);
}

#[test]
fn user_defined_projection_keeps_model_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local.tif");

    let dem = Raster::from_vec(vec![3.0, 4.0, 5.0, 6.0], 2, 2)
        .unwrap()
        .with_transform(GeoTransform::new(1_000.0, 2_000.0, 10.0, -10.0))
        .with_crs(CRS::user_defined(CrsKind::Projected));
    write_geotiff(&dem, &path, &GeoTiffOptions::default()).unwrap();

    let back: Raster<f64> = read_geotiff(&path).unwrap();
    let crs = back.crs().expect("model type should yield a CRS");
    assert_eq!(crs.epsg(), None);
    assert_eq!(crs.kind().unwrap(), CrsKind::Projected);
}

#[test]
fn grid_without_crs_reads_back_without_crs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.tif");

    let dem = Raster::from_vec(vec![1.0, 2.0], 1, 2).unwrap();
    write_geotiff(&dem, &path, &GeoTiffOptions::default()).unwrap();

    let back: Raster<f64> = read_geotiff(&path).unwrap();
    assert!(back.crs().is_none());
}
