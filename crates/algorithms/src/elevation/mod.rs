//! Elevation model preparation
//!
//! - Normalization: sentinel and implausible cells become NaN
//! - Percentile over finite cells (linear interpolation between ranks)
//! - Base elevation: mean of the lowest-lying fraction of the grid, a cheap
//!   stand-in for channel cells in rapid what-if scenarios

use jolchobi_core::raster::Raster;
use jolchobi_core::{Error, Result};

/// Values below this are treated as missing, never as real bathymetry
pub const ELEVATION_FLOOR: f64 = -1000.0;

/// Replace missing cells with NaN in place.
///
/// A cell is missing when it is below [`ELEVATION_FLOOR`], equals `sentinel`
/// (or the raster's own declared nodata), or is not finite. The raster's
/// nodata is reset to NaN afterwards. Returns the number of cells changed.
pub fn normalize_elevation(dem: &mut Raster<f64>, sentinel: Option<f64>) -> usize {
    let declared = dem.nodata();
    let is_sentinel = |v: f64| {
        [sentinel, declared]
            .into_iter()
            .flatten()
            .any(|nd| !nd.is_nan() && (v - nd).abs() < f64::EPSILON * 100.0)
    };

    let mut changed = 0;
    for v in dem.data_mut().iter_mut() {
        if v.is_nan() {
            continue;
        }
        if !v.is_finite() || *v < ELEVATION_FLOOR || is_sentinel(*v) {
            *v = f64::NAN;
            changed += 1;
        }
    }
    dem.set_nodata(Some(f64::NAN));
    changed
}

/// Check that `percentile` lies in (0, 100]
pub fn validate_percentile(name: &'static str, percentile: f64) -> Result<()> {
    if !(percentile > 0.0 && percentile <= 100.0) {
        return Err(Error::invalid_parameter(
            name,
            percentile,
            "percentile must be in (0, 100]",
        ));
    }
    Ok(())
}

/// Finite cell values of a raster, sorted ascending
pub(crate) fn sorted_finite(dem: &Raster<f64>) -> Vec<f64> {
    let mut values: Vec<f64> = dem.data().iter().copied().filter(|v| v.is_finite()).collect();
    values.sort_by(f64::total_cmp);
    values
}

/// Percentile of an ascending, NaN-free slice using linear interpolation
/// between the closest ranks. `None` for an empty slice.
pub(crate) fn percentile_of_sorted(sorted: &[f64], percentile: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (percentile / 100.0).clamp(0.0, 1.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Percentile of all finite cells of `dem`.
///
/// # Errors
/// - [`Error::InvalidParameter`] when `percentile` is outside (0, 100]
/// - [`Error::NoValidCells`] when the grid has no finite cell
pub fn percentile(dem: &Raster<f64>, percentile: f64) -> Result<f64> {
    validate_percentile("percentile", percentile)?;
    percentile_of_sorted(&sorted_finite(dem), percentile).ok_or(Error::NoValidCells)
}

/// Estimate the reference "river" elevation of a grid.
///
/// Selects the finite cells at or below the given percentile and returns
/// their mean elevation. NaN cells take part in neither step.
///
/// # Errors
/// - [`Error::InvalidParameter`] when `percentile` is outside (0, 100]
/// - [`Error::NoValidCells`] when the grid has no finite cell; nothing
///   downstream can run without a base elevation
pub fn estimate_base_elevation(dem: &Raster<f64>, percentile: f64) -> Result<f64> {
    validate_percentile("base_percentile", percentile)?;

    let sorted = sorted_finite(dem);
    let threshold = percentile_of_sorted(&sorted, percentile).ok_or(Error::NoValidCells)?;

    // sorted ascending: the selected subset is a prefix
    let end = sorted.partition_point(|&v| v <= threshold);
    let low = &sorted[..end];
    let base = low.iter().sum::<f64>() / low.len() as f64;

    tracing::debug!(percentile, threshold, cells = low.len(), base, "base elevation");
    Ok(base)
}
