//! Vector and quaternion algebra used by the filters.
//!
//! All types are plain `Copy` values on `f32`. Nothing here allocates.

mod euler;
mod quaternion;
mod vector;

pub use euler::{AxisAngle, EulerAngles};
pub use quaternion::Quaternion;
pub use vector::Vector3;

pub(crate) use vector::DEGENERATE_NORM_SQUARED;

/// PI, f32
pub const PI: f32 = core::f32::consts::PI;

/// PI / 180, for conversion to radians
pub const PI_180: f32 = PI / 180.0;

/// Fast approximation of `1 / sqrt(x)`.
///
/// `micromath` gives the bit-level initial guess (up to ~5% off); one
/// Newton-Raphson step brings the relative error under 2e-3.
#[inline]
pub fn inv_sqrt(x: f32) -> f32 {
    let y = micromath::F32Ext::invsqrt(x);
    y * (1.5 - 0.5 * x * y * y)
}

/// Wraps an angle in radians into (-PI, PI]
pub fn wrap_pi(angle: f32) -> f32 {
    if !angle.is_finite() {
        return angle;
    }
    let two_pi = 2.0 * PI;
    let mut wrapped = angle % two_pi;
    if wrapped > PI {
        wrapped -= two_pi;
    } else if wrapped <= -PI {
        wrapped += two_pi;
    }
    wrapped
}
