//! Facility exposure: points strictly inside the flood region

use geo::{Contains, Point};

use jolchobi_core::raster::Raster;
use jolchobi_core::{PointFeature, Reprojector, Result};

use super::{build_flood_polygons, FloodRegion};
use crate::maybe_rayon::*;

/// Count `points` falling strictly inside the flooded cells of `mask`.
///
/// Coincident points are counted individually. Points on the region
/// boundary are not inside. Returns 0 for no points or a dry mask.
pub fn calculate_point_exposure(points: &[PointFeature], mask: &Raster<u8>) -> Result<usize> {
    if points.is_empty() {
        return Ok(0);
    }
    let region = build_flood_polygons(mask)?;
    calculate_point_exposure_in_region(points, &region)
}

/// [`calculate_point_exposure`] against a region that is already built.
///
/// # Errors
/// [`jolchobi_core::Error::UnsupportedCrs`] when WGS84 points cannot be
/// reprojected into the region's CRS at all. Single points that fail to
/// reproject are skipped with a warning.
pub fn calculate_point_exposure_in_region(
    points: &[PointFeature],
    region: &FloodRegion,
) -> Result<usize> {
    if points.is_empty() || region.is_empty() {
        return Ok(0);
    }
    let reprojector = Reprojector::to_crs(&region.crs)?;

    let exposed = points
        .into_par_iter()
        .filter(|point| match reprojector.forward_coord(point.position) {
            Ok(xy) => region.geometry.contains(&Point::from(xy)),
            Err(e) => {
                tracing::warn!(name = %point.name, error = %e, "skipping point");
                false
            }
        })
        .count();

    tracing::debug!(points = points.len(), exposed, "point exposure");
    Ok(exposed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolchobi_core::{GeoTransform, CRS};
    use ndarray::{s, Array2};

    fn block_mask() -> Raster<u8> {
        let mut data = Array2::zeros((5, 5));
        data.slice_mut(s![1..4, 1..4]).fill(1);
        Raster::from_array(data)
            .with_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0))
            .with_crs(CRS::wgs84())
    }

    #[test]
    fn test_points_in_flood() {
        let points = vec![
            PointFeature::new("Inside 1", 1.5, 3.5),
            PointFeature::new("Inside 2", 2.5, 2.5),
            PointFeature::new("Outside", 0.5, 0.5),
        ];
        assert_eq!(calculate_point_exposure(&points, &block_mask()).unwrap(), 2);
    }

    #[test]
    fn test_empty_points() {
        assert_eq!(calculate_point_exposure(&[], &block_mask()).unwrap(), 0);
    }

    #[test]
    fn test_dry_mask() {
        let mask = Raster::<u8>::new(5, 5)
            .with_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0))
            .with_crs(CRS::wgs84());
        let points = vec![PointFeature::new("a", 2.5, 2.5)];
        assert_eq!(calculate_point_exposure(&points, &mask).unwrap(), 0);
    }

    #[test]
    fn test_coincident_points_count_individually() {
        let points = vec![
            PointFeature::new("clinic", 2.5, 2.5),
            PointFeature::new("clinic annex", 2.5, 2.5),
        ];
        assert_eq!(calculate_point_exposure(&points, &block_mask()).unwrap(), 2);
    }

    #[test]
    fn test_boundary_point_not_inside() {
        let points = vec![PointFeature::new("edge", 1.0, 2.5)];
        assert_eq!(calculate_point_exposure(&points, &block_mask()).unwrap(), 0);
    }

    #[test]
    fn test_bad_point_is_skipped() {
        let points = vec![
            PointFeature::new("broken", f64::NAN, 2.5),
            PointFeature::new("off the globe", 2.5, 95.0),
            PointFeature::new("good", 2.5, 2.5),
        ];
        assert_eq!(calculate_point_exposure(&points, &block_mask()).unwrap(), 1);
    }

    #[test]
    fn test_utm_grid() {
        // 3x3 flooded block of 100 m cells in UTM 45N
        let mut data = Array2::zeros((5, 5));
        data.slice_mut(s![1..4, 1..4]).fill(1);
        let mask = Raster::from_array(data)
            .with_transform(GeoTransform::new(500_000.0, 2_800_500.0, 100.0, -100.0))
            .with_crs(CRS::from_epsg(32645));
        let inverse = Reprojector::to_crs(&CRS::from_epsg(32645)).unwrap();
        let (lon_in, lat_in) = inverse.inverse(500_250.0, 2_800_250.0).unwrap();
        let (lon_out, lat_out) = inverse.inverse(500_050.0, 2_800_450.0).unwrap();
        let points = vec![
            PointFeature::new("in", lon_in, lat_in),
            PointFeature::new("out", lon_out, lat_out),
        ];
        assert_eq!(calculate_point_exposure(&points, &mask).unwrap(), 1);
    }
}
