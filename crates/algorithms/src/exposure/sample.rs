//! Single-point mask lookup

use jolchobi_core::raster::Raster;
use jolchobi_core::Reprojector;

/// Mask value of the cell containing WGS84 `(lon, lat)`.
///
/// Returns 0 when the mask has no usable CRS, the point cannot be
/// reprojected, or it falls outside the grid. Never fails, so one malformed
/// coordinate cannot abort a batch.
pub fn sample_mask_at_point(mask: &Raster<u8>, lon: f64, lat: f64) -> u8 {
    let Some(crs) = mask.crs() else {
        return 0;
    };
    let xy = Reprojector::to_crs(crs).and_then(|r| r.forward(lon, lat));
    let Ok((x, y)) = xy else {
        return 0;
    };
    mask.geo_to_cell(x, y)
        .and_then(|(row, col)| mask.get(row, col).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jolchobi_core::{GeoTransform, CRS};
    use ndarray::array;

    fn mask() -> Raster<u8> {
        Raster::from_array(array![[0, 1], [1, 0]])
            .with_transform(GeoTransform::new(10.0, 20.0, 1.0, -1.0))
            .with_crs(CRS::wgs84())
    }

    #[test]
    fn test_inside() {
        assert_eq!(sample_mask_at_point(&mask(), 11.5, 19.5), 1);
        assert_eq!(sample_mask_at_point(&mask(), 10.5, 19.5), 0);
        assert_eq!(sample_mask_at_point(&mask(), 10.2, 18.1), 1);
    }

    #[test]
    fn test_outside_is_zero() {
        // just left of the grid: truncation toward zero would land in column 0
        assert_eq!(sample_mask_at_point(&mask(), 9.5, 18.5), 0);
        assert_eq!(sample_mask_at_point(&mask(), 30.0, 19.5), 0);
    }

    #[test]
    fn test_failures_are_zero() {
        assert_eq!(sample_mask_at_point(&mask(), f64::NAN, 19.5), 0);
        assert_eq!(sample_mask_at_point(&mask(), 11.5, 91.0), 0);

        let mut no_crs = mask();
        no_crs.set_crs(None);
        assert_eq!(sample_mask_at_point(&no_crs, 11.5, 19.5), 0);

        let mut unsupported = mask();
        unsupported.set_crs(Some(CRS::from_epsg(2154)));
        assert_eq!(sample_mask_at_point(&unsupported, 11.5, 19.5), 0);
    }
}
