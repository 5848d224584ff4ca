use super::{Vector3, PI_180};

/// Tait-Bryan angles in radians, applied in Z-Y-X order (yaw, then pitch, then roll).
///
/// Display only: the conversion from a quaternion is lossy and degenerates
/// near pitch = ±90°.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EulerAngles {
    /// Rotation about x
    pub roll: f32,
    /// Rotation about y
    pub pitch: f32,
    /// Rotation about z
    pub yaw: f32,
}

impl EulerAngles {
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }

    pub fn from_degrees(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self::new(roll * PI_180, pitch * PI_180, yaw * PI_180)
    }

    /// (roll, pitch, yaw) in degrees
    pub fn to_degrees(&self) -> (f32, f32, f32) {
        (self.roll / PI_180, self.pitch / PI_180, self.yaw / PI_180)
    }
}

/// Rotation of `angle` radians about the unit `axis`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisAngle {
    pub axis: Vector3,
    pub angle: f32,
}

impl AxisAngle {
    pub const fn new(axis: Vector3, angle: f32) -> Self {
        Self { axis, angle }
    }
}
