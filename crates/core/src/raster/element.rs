//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

/// Trait for types that can be stored in a raster cell.
///
/// Bounds the numeric types usable as raster values and provides the
/// widening/narrowing conversions classification algorithms rely on:
/// every cell can be read as `f64` and written back from `f64` with
/// clamping to the representable range.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Minimum value representable by this type
    fn min_value() -> Self;

    /// Maximum value representable by this type
    fn max_value() -> Self;

    /// Default no-data value for this type
    fn default_nodata() -> Self;

    /// Check if this value represents no-data
    fn is_nodata(&self, nodata: Option<Self>) -> bool;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Convert self to f64
    fn to_f64(self) -> Option<f64> {
        NumCast::from(self)
    }

    /// Convert an f64 to this type, rounding and clamping to the
    /// representable range. Integer targets saturate instead of wrapping.
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_element_int {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn default_nodata() -> Self {
                <$t>::MIN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                nodata.map_or(false, |nd| *self == nd)
            }

            fn is_float() -> bool {
                false
            }

            fn from_f64(value: f64) -> Self {
                if value.is_nan() {
                    return 0;
                }
                let rounded = value.round();
                if rounded <= <$t>::MIN as f64 {
                    <$t>::MIN
                } else if rounded >= <$t>::MAX as f64 {
                    <$t>::MAX
                } else {
                    rounded as $t
                }
            }
        }
    };
}

macro_rules! impl_element_float {
    ($t:ty) => {
        impl RasterElement for $t {
            fn min_value() -> Self {
                <$t>::MIN
            }

            fn max_value() -> Self {
                <$t>::MAX
            }

            fn default_nodata() -> Self {
                <$t>::NAN
            }

            fn is_nodata(&self, nodata: Option<Self>) -> bool {
                if self.is_nan() {
                    return true;
                }
                nodata.map_or(false, |nd| (self - nd).abs() < <$t>::EPSILON * 100.0)
            }

            fn is_float() -> bool {
                true
            }

            fn from_f64(value: f64) -> Self {
                value as $t
            }
        }
    };
}

impl_element_int!(i8);
impl_element_int!(i16);
impl_element_int!(i32);
impl_element_int!(i64);
impl_element_int!(u8);
impl_element_int!(u16);
impl_element_int!(u32);
impl_element_float!(f32);
impl_element_float!(f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_from_f64_saturates() {
        assert_eq!(<i8 as RasterElement>::from_f64(300.0), i8::MAX);
        assert_eq!(<i8 as RasterElement>::from_f64(-300.0), i8::MIN);
        assert_eq!(<i8 as RasterElement>::from_f64(7.4), 7);
        assert_eq!(<i8 as RasterElement>::from_f64(7.6), 8);
    }

    #[test]
    fn float_nodata_is_nan() {
        assert!(f64::NAN.is_nodata(None));
        assert!(!1.0f64.is_nodata(None));
        assert!(1.0f64.is_nodata(Some(1.0)));
    }
}
