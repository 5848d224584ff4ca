use core::cmp::Ordering;
use core::ops::{
    Add, AddAssign, Div, DivAssign, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};
#[cfg(not(test))]
use num_traits::Float;
use num_traits::Zero;

/// Squared norms at or below this are treated as "no reading".
pub(crate) const DEGENERATE_NORM_SQUARED: f32 = 1e-12;

/// Below this angle (rad) slerp falls back to lerp
const SLERP_THRESHOLD: f32 = 1e-5;

/// A 3D vector of `f32`, used for sensor readings and quaternion vector parts.
///
/// `*` between two vectors is the cross product.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zeros() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm_squared(&self) -> f32 {
        self.dot(self)
    }

    pub fn norm(&self) -> f32 {
        self.norm_squared().sqrt()
    }

    /// Unit vector in the same direction. The zero vector stays zero.
    pub fn normalize(&self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            return Self::zeros();
        }
        *self / norm
    }

    /// Like [`Self::normalize`] but uses the fast inverse square root.
    /// The result is unit length to within 2e-3.
    pub fn fast_normalize(&self) -> Self {
        let norm_squared = self.norm_squared();
        if norm_squared == 0.0 {
            return Self::zeros();
        }
        *self * super::inv_sqrt(norm_squared)
    }

    /// True if this reading is usable: finite and not (near) zero length
    pub fn has_data(&self) -> bool {
        self.is_finite() && self.norm_squared() > DEGENERATE_NORM_SQUARED
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        *self + (*other - *self) * t
    }

    pub fn nlerp(&self, other: &Self, t: f32) -> Self {
        self.lerp(other, t).normalize()
    }

    /// Spherical interpolation between the directions of `self` and `other`.
    ///
    /// Both ends are normalized first, so the result is always unit length
    /// (or zero if an end is zero).
    pub fn slerp(&self, other: &Self, t: f32) -> Self {
        let from = self.normalize();
        let to = other.normalize();

        let cos_theta = from.dot(&to).clamp(-1.0, 1.0);
        let theta = cos_theta.acos();

        if theta < SLERP_THRESHOLD {
            return from.lerp(&to, t);
        }

        // Antiparallel: sin(theta) ~ 0, so rotate about any axis orthogonal to `from`
        if core::f32::consts::PI - theta < SLERP_THRESHOLD {
            let axis = from.any_orthogonal();
            let angle = theta * t;
            return from * angle.cos() + axis * angle.sin();
        }

        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        from * a + to * b
    }

    /// Scalar triple product `a · (b × c)`
    pub fn triple_product(a: &Self, b: &Self, c: &Self) -> f32 {
        a.dot(&b.cross(c))
    }

    /// Compares by length only.
    ///
    /// Vectors of equal length compare `Equal` here even when they are not `==`,
    /// which is why this is not a `PartialOrd` impl.
    pub fn cmp_norm(&self, other: &Self) -> Option<Ordering> {
        self.norm_squared().partial_cmp(&other.norm_squared())
    }

    pub fn is_shorter_than(&self, other: &Self) -> bool {
        self.cmp_norm(other) == Some(Ordering::Less)
    }

    /// Some unit vector perpendicular to `self` (assumed unit length)
    fn any_orthogonal(&self) -> Self {
        let helper = if self.x.abs() < 0.9 {
            Self::new(1.0, 0.0, 0.0)
        } else {
            Self::new(0.0, 1.0, 0.0)
        };
        self.cross(&helper).normalize()
    }
}

impl Zero for Vector3 {
    fn zero() -> Self {
        Self::zeros()
    }

    fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vector3> for f32 {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Vector3 {
        rhs * self
    }
}

/// Cross product
impl Mul for Vector3 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        self.cross(&rhs)
    }
}

impl Div<f32> for Vector3 {
    type Output = Self;

    fn div(self, rhs: f32) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign<f32> for Vector3 {
    fn mul_assign(&mut self, rhs: f32) {
        *self = *self * rhs;
    }
}

impl MulAssign for Vector3 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.cross(&rhs);
    }
}

impl DivAssign<f32> for Vector3 {
    fn div_assign(&mut self, rhs: f32) {
        *self = *self / rhs;
    }
}

impl Index<usize> for Vector3 {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3 index out of range: {index}"),
        }
    }
}

impl IndexMut<usize> for Vector3 {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vector3 index out of range: {index}"),
        }
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl From<nalgebra::Vector3<f32>> for Vector3 {
    fn from(v: nalgebra::Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for nalgebra::Vector3<f32> {
    fn from(v: Vector3) -> Self {
        nalgebra::Vector3::new(v.x, v.y, v.z)
    }
}
