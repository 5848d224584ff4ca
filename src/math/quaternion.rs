use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
#[cfg(not(test))]
use num_traits::Float;
use num_traits::{One, Zero};

use super::{AxisAngle, EulerAngles, Vector3, DEGENERATE_NORM_SQUARED};
use crate::error::FusionError;

/// Below this angle (rad) slerp falls back to a normalized lerp
const SLERP_THRESHOLD: f32 = 1e-5;

/// Quaternion `w + xi + yj + zk`, scalar first.
///
/// Values used as an orientation are kept at unit norm by the filters and
/// map the body (sensor) frame to the Earth frame. `q` and `-q` describe the
/// same rotation, so comparing components is not the same as comparing
/// rotations; use [`Quaternion::dot`] for that.
///
/// `*` between quaternions is the Hamilton product and does not commute.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// No rotation
    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    pub const fn from_scalar_vector(w: f32, v: Vector3) -> Self {
        Self::new(w, v.x, v.y, v.z)
    }

    /// `[0, v]`, a vector embedded as a pure quaternion
    pub const fn pure(v: Vector3) -> Self {
        Self::from_scalar_vector(0.0, v)
    }

    pub const fn scalar(&self) -> f32 {
        self.w
    }

    pub const fn vector(&self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm_squared(&self) -> f32 {
        self.dot(self)
    }

    pub fn norm(&self) -> f32 {
        self.norm_squared().sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.w.is_finite() && self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// `None` if the norm is (near) zero or not finite
    pub fn try_normalize(&self) -> Option<Self> {
        let norm_squared = self.norm_squared();
        if !norm_squared.is_finite() || norm_squared <= DEGENERATE_NORM_SQUARED {
            return None;
        }
        Some(*self / norm_squared.sqrt())
    }

    /// Unit quaternion in the same direction, or the identity if the norm is (near) zero
    pub fn normalize(&self) -> Self {
        self.try_normalize().unwrap_or_else(Self::identity)
    }

    /// [`Self::normalize`] using the fast inverse square root
    pub fn fast_normalize(&self) -> Self {
        let norm_squared = self.norm_squared();
        if !norm_squared.is_finite() || norm_squared <= DEGENERATE_NORM_SQUARED {
            return Self::identity();
        }
        *self * super::inv_sqrt(norm_squared)
    }

    /// Multiplicative inverse.
    ///
    /// Unit quaternions return their conjugate; a (near) zero quaternion has
    /// no inverse and returns the identity.
    pub fn inverse(&self) -> Self {
        self.checked_inverse().unwrap_or_else(|_| Self::identity())
    }

    pub fn checked_inverse(&self) -> Result<Self, FusionError> {
        let norm_squared = self.norm_squared();
        if !norm_squared.is_finite() || norm_squared <= DEGENERATE_NORM_SQUARED {
            return Err(FusionError::NumericalDegeneracy);
        }
        if (norm_squared - 1.0).abs() < f32::EPSILON {
            return Ok(self.conjugate());
        }
        Ok(self.conjugate() / norm_squared)
    }

    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        *self + (*other - *self) * t
    }

    pub fn nlerp(&self, other: &Self, t: f32) -> Self {
        self.lerp(other, t).normalize()
    }

    /// Spherical linear interpolation along the shorter arc.
    ///
    /// Both ends are normalized, so `slerp(a, b, 0) == a.normalize()` and
    /// `slerp(a, b, 1)` is `b.normalize()` up to sign.
    pub fn slerp(&self, other: &Self, t: f32) -> Self {
        let from = self.normalize();
        let mut to = other.normalize();

        let mut cos_theta = from.dot(&to);
        if cos_theta < 0.0 {
            to = -to;
            cos_theta = -cos_theta;
        }

        let theta = cos_theta.min(1.0).acos();
        if theta < SLERP_THRESHOLD {
            return from.nlerp(&to, t);
        }

        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        from * a + to * b
    }

    /// Spherical cubic interpolation between `q0` and `q1` with inner control
    /// points `s0` and `s1`
    pub fn squad(q0: &Self, q1: &Self, s0: &Self, s1: &Self, t: f32) -> Self {
        let outer = q0.slerp(q1, t);
        let inner = s0.slerp(s1, t);
        outer.slerp(&inner, 2.0 * t * (1.0 - t))
    }

    /// Vector part of `q * [0, v] * q⁻¹`
    pub fn rotate_vector(&self, v: &Vector3) -> Vector3 {
        (*self * Self::pure(*v) * self.inverse()).vector()
    }

    /// Rotation of `angle` radians about `axis`. A zero axis gives the identity.
    pub fn from_axis_angle(axis: &Vector3, angle: f32) -> Self {
        if !axis.has_data() {
            return Self::identity();
        }
        let half = angle * 0.5;
        Self::from_scalar_vector(half.cos(), axis.normalize() * half.sin())
    }

    /// Exponential map of a rotation vector (axis times angle in radians)
    pub fn from_scaled_axis(v: &Vector3) -> Self {
        let theta_squared = v.norm_squared();
        if theta_squared <= DEGENERATE_NORM_SQUARED {
            return Self::from_scalar_vector(1.0, *v * 0.5).normalize();
        }
        let theta = theta_squared.sqrt();
        let half = theta * 0.5;
        Self::from_scalar_vector(half.cos(), *v * (half.sin() / theta))
    }

    /// Axis and angle (0..=2π) of the rotation. For a zero rotation the axis
    /// is the zero vector.
    pub fn to_axis_angle(&self) -> AxisAngle {
        let q = self.normalize();
        let w = q.w.clamp(-1.0, 1.0);
        let sin_half = (1.0 - w * w).sqrt();
        if sin_half < 1e-6 {
            return AxisAngle::new(Vector3::zeros(), 0.0);
        }
        AxisAngle::new(q.vector() / sin_half, 2.0 * w.acos())
    }

    /// Tait-Bryan angles (Z-Y-X). Lossy; pitch saturates at ±90°.
    pub fn to_euler_angles(&self) -> EulerAngles {
        let Self { w, x, y, z } = *self;

        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

        EulerAngles::new(roll, pitch, yaw)
    }

    pub fn from_euler_angles(angles: &EulerAngles) -> Self {
        let (sr, cr) = (angles.roll * 0.5).sin_cos();
        let (sp, cp) = (angles.pitch * 0.5).sin_cos();
        let (sy, cy) = (angles.yaw * 0.5).sin_cos();

        Self::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        )
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Zero for Quaternion {
    fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    fn is_zero(&self) -> bool {
        self.w == 0.0 && self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl One for Quaternion {
    fn one() -> Self {
        Self::identity()
    }
}

/// Hamilton product `[s0 s1 - v0·v1, s0 v1 + s1 v0 + v0 × v1]`
impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let (s0, v0) = (self.w, self.vector());
        let (s1, v1) = (rhs.w, rhs.vector());
        Self::from_scalar_vector(s0 * s1 - v0.dot(&v1), v1 * s0 + v0 * s1 + v0.cross(&v1))
    }
}

impl Mul<f32> for Quaternion {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.w * rhs, self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Quaternion> for f32 {
    type Output = Quaternion;

    fn mul(self, rhs: Quaternion) -> Quaternion {
        rhs * self
    }
}

impl Div<f32> for Quaternion {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.w / rhs, self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Add for Quaternion {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.w + rhs.w, self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Quaternion {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.w - rhs.w, self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Quaternion {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.w, -self.x, -self.y, -self.z)
    }
}

impl MulAssign for Quaternion {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl MulAssign<f32> for Quaternion {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl DivAssign<f32> for Quaternion {
    fn div_assign(&mut self, rhs: f32) {
        *self = *self / rhs;
    }
}

impl AddAssign for Quaternion {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Quaternion {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl From<[f32; 4]> for Quaternion {
    fn from([w, x, y, z]: [f32; 4]) -> Self {
        Self::new(w, x, y, z)
    }
}

impl From<Quaternion> for [f32; 4] {
    fn from(q: Quaternion) -> Self {
        [q.w, q.x, q.y, q.z]
    }
}

impl From<nalgebra::Quaternion<f32>> for Quaternion {
    fn from(q: nalgebra::Quaternion<f32>) -> Self {
        Self::new(q.w, q.i, q.j, q.k)
    }
}

impl From<Quaternion> for nalgebra::Quaternion<f32> {
    fn from(q: Quaternion) -> Self {
        nalgebra::Quaternion::new(q.w, q.x, q.y, q.z)
    }
}

impl From<nalgebra::UnitQuaternion<f32>> for Quaternion {
    fn from(q: nalgebra::UnitQuaternion<f32>) -> Self {
        q.into_inner().into()
    }
}

impl From<Quaternion> for nalgebra::UnitQuaternion<f32> {
    fn from(q: Quaternion) -> Self {
        nalgebra::UnitQuaternion::new_unchecked(q.normalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::PI;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-4;

    fn assert_quat_eq(a: Quaternion, b: Quaternion) {
        assert!(
            (a.w - b.w).abs() < EPSILON
                && (a.x - b.x).abs() < EPSILON
                && (a.y - b.y).abs() < EPSILON
                && (a.z - b.z).abs() < EPSILON,
            "{a:?} != {b:?}"
        );
    }

    fn samples() -> [Quaternion; 4] {
        [
            Quaternion::new(0.3, -1.2, 2.5, 0.7),
            Quaternion::new(-4.0, 0.1, 0.0, 2.0),
            Quaternion::new(0.0, 0.0, 0.0, 1e-3),
            Quaternion::from_axis_angle(&Vector3::new(1.0, 1.0, 0.0), 0.8),
        ]
    }

    #[test]
    fn test_normalize_has_unit_norm() {
        for q in samples() {
            for k in [1e-3_f32, 0.5, 7.0, -3.0] {
                assert_abs_diff_eq!((q * k).normalize().norm(), 1.0, epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn test_normalize_zero_is_identity() {
        assert_eq!(Quaternion::zero().normalize(), Quaternion::identity());
        assert_eq!(Quaternion::zero().fast_normalize(), Quaternion::identity());
        assert!(Quaternion::zero().try_normalize().is_none());
    }

    #[test]
    fn test_conjugate_is_involution() {
        for q in samples() {
            assert_eq!(q.conjugate().conjugate(), q);
        }
    }

    #[test]
    fn test_identity_is_neutral() {
        let id = Quaternion::identity();
        for q in samples() {
            assert_eq!(q * id, q);
            assert_eq!(id * q, q);
        }
    }

    #[test]
    fn test_hamilton_product_basis() {
        let i = Quaternion::new(0.0, 1.0, 0.0, 0.0);
        let j = Quaternion::new(0.0, 0.0, 1.0, 0.0);
        let k = Quaternion::new(0.0, 0.0, 0.0, 1.0);
        assert_eq!(i * j, k);
        assert_eq!(j * i, -k);
        assert_eq!(i * i, -Quaternion::identity());
    }

    #[test]
    fn test_inverse_times_q_is_identity() {
        for q in samples() {
            assert_quat_eq(q.inverse() * q, Quaternion::identity());
            assert_quat_eq(q * q.inverse(), Quaternion::identity());
        }
    }

    #[test]
    fn test_inverse_fallbacks() {
        assert_eq!(Quaternion::zero().inverse(), Quaternion::identity());
        assert_eq!(
            Quaternion::zero().checked_inverse(),
            Err(FusionError::NumericalDegeneracy)
        );

        let unit = Quaternion::new(0.0, 1.0, 0.0, 0.0);
        assert_eq!(unit.inverse(), unit.conjugate());
    }

    #[test]
    fn test_slerp_endpoints() {
        let q0 = Quaternion::new(2.0, 0.0, 0.0, 0.0);
        let q1 = Quaternion::from_axis_angle(&Vector3::new(0.0, 0.0, 1.0), PI / 2.0) * 3.0;

        assert_quat_eq(q0.slerp(&q1, 0.0), q0.normalize());
        assert_quat_eq(q0.slerp(&q1, 1.0), q1.normalize());

        let half = q0.slerp(&q1, 0.5);
        let expected = Quaternion::from_axis_angle(&Vector3::new(0.0, 0.0, 1.0), PI / 4.0);
        assert_quat_eq(half, expected);
    }

    #[test]
    fn test_lerp_and_nlerp() {
        let q0 = Quaternion::identity();
        let q1 = Quaternion::new(0.0, 0.0, 0.0, 1.0);

        assert_eq!(q0.lerp(&q1, 0.0), q0);
        assert_eq!(q0.lerp(&q1, 1.0), q1);
        assert_quat_eq(q0.lerp(&q1, 0.5), Quaternion::new(0.5, 0.0, 0.0, 0.5));

        let half = core::f32::consts::FRAC_1_SQRT_2;
        let mid = q0.nlerp(&q1, 0.5);
        assert_quat_eq(mid, Quaternion::new(half, 0.0, 0.0, half));
        assert_abs_diff_eq!(mid.norm(), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_slerp_nearly_equal_falls_back() {
        let q0 = Quaternion::identity();
        let q1 = Quaternion::from_axis_angle(&Vector3::new(0.0, 0.0, 1.0), 1e-6);

        let mid = q0.slerp(&q1, 0.5);
        assert!(mid.is_finite());
        assert_abs_diff_eq!(mid.norm(), 1.0, epsilon = EPSILON);
        assert_quat_eq(mid, Quaternion::identity());

        let same = q0.slerp(&(q0 * 4.0), 0.3);
        assert_quat_eq(same, Quaternion::identity());
    }

    #[test]
    fn test_slerp_takes_shorter_arc() {
        let q0 = Quaternion::identity();
        let q1 = -Quaternion::from_axis_angle(&Vector3::new(1.0, 0.0, 0.0), 0.2);
        let mid = q0.slerp(&q1, 0.5);
        assert!(mid.w > 0.99);
    }

    #[test]
    fn test_squad_endpoints() {
        let q0 = Quaternion::identity();
        let q1 = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, 0.0), 1.0);
        let s0 = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, 0.0), 0.3);
        let s1 = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, 0.0), 0.7);

        assert_quat_eq(Quaternion::squad(&q0, &q1, &s0, &s1, 0.0), q0);
        assert_quat_eq(Quaternion::squad(&q0, &q1, &s0, &s1, 1.0), q1);
    }

    #[test]
    fn test_rotate_vector() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.0, 0.0, 1.0), PI / 2.0);
        let rotated = q.rotate_vector(&Vector3::new(1.0, 0.0, 0.0));
        assert_abs_diff_eq!(rotated.x, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(rotated.y, 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(rotated.z, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_axis_angle_round_trip() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.0, 0.0, 2.0), PI / 2.0);
        let AxisAngle { axis, angle } = q.to_axis_angle();
        assert_abs_diff_eq!(angle, PI / 2.0, epsilon = EPSILON);
        assert_abs_diff_eq!(axis.z, 1.0, epsilon = EPSILON);

        let zero = Quaternion::identity().to_axis_angle();
        assert_eq!(zero.axis, Vector3::zeros());
        assert_eq!(zero.angle, 0.0);
    }

    #[test]
    fn test_scaled_axis_matches_axis_angle() {
        let axis = Vector3::new(1.0, -2.0, 0.5).normalize();
        let angle = 1.3;
        assert_quat_eq(
            Quaternion::from_scaled_axis(&(axis * angle)),
            Quaternion::from_axis_angle(&axis, angle),
        );
        assert_quat_eq(
            Quaternion::from_scaled_axis(&Vector3::zeros()),
            Quaternion::identity(),
        );
    }

    #[test]
    fn test_euler_round_trip() {
        for (roll, pitch, yaw) in [
            (0.0, 0.0, 0.0),
            (0.3, -0.2, 1.0),
            (-2.5, 1.2, -3.0),
            (1.0, -1.4, 2.9),
        ] {
            let angles = EulerAngles::new(roll, pitch, yaw);
            let back = Quaternion::from_euler_angles(&angles).to_euler_angles();
            assert_abs_diff_eq!(back.roll, roll, epsilon = EPSILON);
            assert_abs_diff_eq!(back.pitch, pitch, epsilon = EPSILON);
            assert_abs_diff_eq!(back.yaw, yaw, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_euler_of_yaw_rotation() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.0, 0.0, 1.0), PI / 2.0);
        let angles = q.to_euler_angles();
        assert_abs_diff_eq!(angles.roll, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(angles.pitch, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(angles.yaw, PI / 2.0, epsilon = EPSILON);
    }

    #[test]
    fn test_euler_pitch_clamped_at_gimbal_lock() {
        let q = Quaternion::from_axis_angle(&Vector3::new(0.0, 1.0, 0.0), PI / 2.0) * 1.0001;
        let angles = q.to_euler_angles();
        assert!(angles.pitch.is_finite());
        assert_abs_diff_eq!(angles.pitch, PI / 2.0, epsilon = 1e-2);
    }

    #[test]
    fn test_nalgebra_conversions_agree() {
        let axis = nalgebra::Vector3::new(0.2, -0.4, 0.9);
        let unit_axis = nalgebra::Unit::new_normalize(axis);
        let unit = nalgebra::UnitQuaternion::from_axis_angle(&unit_axis, 0.7);
        let ours: Quaternion = unit.into();
        let expected = Quaternion::from_axis_angle(&Vector3::from(axis), 0.7);
        assert_quat_eq(ours, expected);

        let v = nalgebra::Vector3::new(1.0, 2.0, 3.0);
        let rotated = ours.rotate_vector(&v.into());
        let theirs = unit * v;
        assert_abs_diff_eq!(rotated.x, theirs.x, epsilon = EPSILON);
        assert_abs_diff_eq!(rotated.y, theirs.y, epsilon = EPSILON);
        assert_abs_diff_eq!(rotated.z, theirs.z, epsilon = EPSILON);
    }
}
