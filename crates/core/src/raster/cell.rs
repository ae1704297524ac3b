//! Cell value trait for raster grids

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Elevation and depth grids are `f64`; flood masks are `u8`.
pub trait CellValue:
    Copy + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Value used for missing cells when none is declared
    fn default_nodata() -> Self;

    /// Whether this value is missing, given an optional declared sentinel.
    /// NaN is always missing for float types.
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }
}

macro_rules! impl_cell_value_int {
    ($($t:ty),*) => {$(
        impl CellValue for $t {
            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata == Some(*self)
            }
        }
    )*};
}

macro_rules! impl_cell_value_float {
    ($($t:ty),*) => {$(
        impl CellValue for $t {
            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                match nodata {
                    Some(nd) => (self - nd).abs() < <$t>::EPSILON * 100.0,
                    None => false,
                }
            }
        }
    )*};
}

impl_cell_value_int!(u8, i16, i32);
impl_cell_value_float!(f32, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_nan_is_always_nodata() {
        assert!(f64::NAN.is_nodata(None));
        assert!(!1.0f64.is_nodata(None));
        assert!((-9999.0f64).is_nodata(Some(-9999.0)));
    }

    #[test]
    fn test_int_nodata_requires_sentinel() {
        assert!(!0u8.is_nodata(None));
        assert!(255u8.is_nodata(Some(255)));
    }
}
