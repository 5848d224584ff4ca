use core::ops::Neg;
use log::{debug, trace, warn};
#[cfg(not(test))]
use num_traits::Float;

use super::OrientationFilter;
use crate::config::{is_valid_alpha, is_valid_sample_period, ComplementaryConfig, DEFAULT_ALPHA};
use crate::error::FusionError;
use crate::math::{wrap_pi, EulerAngles, Quaternion, Vector3};

/// Per-axis blend of integrated gyro rates with accelerometer tilt and
/// magnetometer heading.
///
/// Angles are kept as roll, pitch and yaw in radians with no cross-axis
/// coupling, so the estimate degrades near pitch = ±90°. Without a
/// magnetometer yaw is pure gyro integration and drifts.
#[derive(Debug, Clone)]
pub struct ComplementaryFilter {
    angles: EulerAngles,
    /// Weight of the integrated angle
    alpha: f32,
    sample_period: f32,
}

impl Default for ComplementaryFilter {
    fn default() -> Self {
        Self::new(ComplementaryConfig::default())
    }
}

impl ComplementaryFilter {
    /// An out of range alpha falls back to the default, a non-positive sample
    /// period leaves the filter disabled
    pub fn new(config: ComplementaryConfig) -> Self {
        let mut filter = Self {
            angles: EulerAngles::default(),
            alpha: DEFAULT_ALPHA,
            sample_period: 0.0,
        };
        filter.set_sample_period(config.sample_period);
        filter.set_alpha(config.alpha);
        filter
    }

    pub fn try_new(config: ComplementaryConfig) -> Result<Self, FusionError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Values outside `[0, 1]` are ignored
    pub fn set_alpha(&mut self, alpha: f32) {
        if !is_valid_alpha(alpha) {
            warn!("Ignoring complementary alpha {alpha} outside [0, 1], keeping {}", self.alpha);
            return;
        }
        self.alpha = alpha;
        debug!("Complementary filter alpha = {alpha}");
    }

    pub fn sample_period(&self) -> f32 {
        self.sample_period
    }

    pub fn set_sample_period(&mut self, sample_period: f32) {
        if !is_valid_sample_period(sample_period) {
            warn!("Invalid sample period {sample_period}, complementary filter disabled");
        } else {
            debug!("Complementary filter sample period set to {sample_period}s");
        }
        self.sample_period = sample_period;
    }

    pub fn is_enabled(&self) -> bool {
        is_valid_sample_period(self.sample_period)
    }

    pub fn euler_angles(&self) -> EulerAngles {
        self.angles
    }

    pub fn orientation(&self) -> Quaternion {
        Quaternion::from_euler_angles(&self.angles)
    }

    pub fn set_orientation(&mut self, orientation: Quaternion) {
        self.angles = orientation.normalize().to_euler_angles();
    }

    pub fn reset(&mut self) {
        self.angles = EulerAngles::default();
    }

    pub fn update(
        &mut self,
        gyro: Vector3,
        accel: Vector3,
        mag: Option<Vector3>,
    ) -> Option<Quaternion> {
        if !self.is_enabled() {
            trace!("Complementary filter disabled, dropping sample");
            return None;
        }

        if !gyro.is_finite() || (!gyro.has_data() && !accel.has_data()) {
            trace!("Dropping sample without data");
            return None;
        }

        let dt = self.sample_period;
        let mut roll = self.angles.roll + gyro.x * dt;
        let mut pitch = self.angles.pitch + gyro.y * dt;
        let mut yaw = self.angles.yaw + gyro.z * dt;

        if accel.has_data() {
            let (acc_roll, acc_pitch) = tilt_angles(&accel);
            roll = self.blend(roll, acc_roll);
            pitch = self.blend(pitch, acc_pitch);
        } else {
            trace!("Degenerate accelerometer reading, roll and pitch from gyro only");
        }

        if let Some(mag) = mag.filter(Vector3::has_data) {
            yaw = self.blend(yaw, heading(&mag));
        }

        self.angles = EulerAngles::new(wrap_pi(roll), wrap_pi(pitch), wrap_pi(yaw));

        Some(self.orientation())
    }

    /// `alpha * integrated + (1 - alpha) * measured`, taken along the shorter
    /// way around the circle
    fn blend(&self, integrated: f32, measured: f32) -> f32 {
        measured + self.alpha * wrap_pi(integrated - measured)
    }
}

/// Roll and pitch of the gravity direction in `acc`
fn tilt_angles(acc: &Vector3) -> (f32, f32) {
    let roll = acc.y.atan2(acc.z);
    let pitch = acc.x.neg().atan2((acc.y * acc.y + acc.z * acc.z).sqrt());
    (roll, pitch)
}

/// Heading of a level magnetometer reading
fn heading(mag: &Vector3) -> f32 {
    mag.y.neg().atan2(mag.x)
}

impl OrientationFilter for ComplementaryFilter {
    fn update(
        &mut self,
        gyro: Vector3,
        accel: Vector3,
        mag: Option<Vector3>,
    ) -> Option<Quaternion> {
        ComplementaryFilter::update(self, gyro, accel, mag)
    }

    fn orientation(&self) -> Quaternion {
        ComplementaryFilter::orientation(self)
    }

    fn euler_angles(&self) -> EulerAngles {
        self.angles
    }

    fn sample_period(&self) -> f32 {
        self.sample_period
    }

    fn reset(&mut self) {
        ComplementaryFilter::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::PI;
    use approx::assert_abs_diff_eq;

    const EPSILON: f32 = 1e-3;

    #[test]
    fn test_no_data_keeps_identity() {
        let mut filter = ComplementaryFilter::new(ComplementaryConfig::new(0.01));
        assert_eq!(filter.update(Vector3::zeros(), Vector3::zeros(), None), None);
        assert_eq!(filter.orientation(), Quaternion::identity());
    }

    #[test]
    fn test_quarter_turn_without_magnetometer() {
        let mut filter = ComplementaryFilter::new(ComplementaryConfig::new(1.0));

        let q = filter
            .update(
                Vector3::new(0.0, 0.0, 1.570796),
                Vector3::new(0.0, 0.0, 9.82),
                None,
            )
            .unwrap();

        assert_abs_diff_eq!(q.w.abs(), 0.7071, epsilon = EPSILON);
        assert_abs_diff_eq!(q.x.abs(), 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(q.y.abs(), 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(q.z.abs(), 0.7071, epsilon = EPSILON);
    }

    #[test]
    fn test_blend_weights() {
        let config = ComplementaryConfig::new(0.1).with_alpha(0.75);
        let mut filter = ComplementaryFilter::new(config);

        // Gyro says +0.1 rad about x, accel says level
        filter.update(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0), None);
        assert_abs_diff_eq!(filter.euler_angles().roll, 0.075, epsilon = 1e-6);
    }

    #[test]
    fn test_converges_to_accelerometer_tilt() {
        let mut filter = ComplementaryFilter::new(ComplementaryConfig::new(0.01));
        let (roll, pitch) = (0.3_f32, -0.2_f32);
        // Gravity seen by a body rolled then pitched
        let accel = Vector3::new(-pitch.sin(), roll.sin() * pitch.cos(), roll.cos() * pitch.cos());

        for _ in 0..1000 {
            filter.update(Vector3::zeros(), accel, None);
        }

        let angles = filter.euler_angles();
        assert_abs_diff_eq!(angles.roll, roll, epsilon = EPSILON);
        assert_abs_diff_eq!(angles.pitch, pitch, epsilon = EPSILON);
    }

    #[test]
    fn test_heading_blend_wraps_around_pi() {
        let mut filter = ComplementaryFilter::new(ComplementaryConfig::new(0.01).with_alpha(0.5));
        let level = Vector3::new(0.0, 0.0, 1.0);

        // Heading close to +PI
        let mag = Vector3::new((PI - 0.05).cos(), -(PI - 0.05).sin(), -0.5);
        for _ in 0..50 {
            filter.update(Vector3::zeros(), level, Some(mag));
        }
        assert_abs_diff_eq!(filter.euler_angles().yaw, PI - 0.05, epsilon = EPSILON);

        // Now just past -PI, must not swing through zero
        let mag = Vector3::new((PI + 0.05).cos(), -(PI + 0.05).sin(), -0.5);
        filter.update(Vector3::zeros(), level, Some(mag));
        assert!(filter.euler_angles().yaw.abs() > PI - 0.1);
    }

    #[test]
    fn test_invalid_alpha_ignored() {
        let mut filter = ComplementaryFilter::new(ComplementaryConfig::new(0.01).with_alpha(2.0));
        assert_eq!(filter.alpha(), DEFAULT_ALPHA);

        filter.set_alpha(0.5);
        filter.set_alpha(-0.1);
        filter.set_alpha(f32::NAN);
        assert_eq!(filter.alpha(), 0.5);
    }

    #[test]
    fn test_disabled_filter_is_noop() {
        let mut filter = ComplementaryFilter::new(ComplementaryConfig::new(0.0));
        let result = filter.update(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0), None);
        assert_eq!(result, None);
        assert_eq!(filter.euler_angles(), EulerAngles::default());
    }

    #[test]
    fn test_reset() {
        let mut filter = ComplementaryFilter::new(ComplementaryConfig::new(0.1));
        filter.update(Vector3::new(0.5, 0.5, 0.5), Vector3::zeros(), None);
        assert_ne!(filter.euler_angles(), EulerAngles::default());

        filter.reset();
        assert_eq!(filter.orientation(), Quaternion::identity());
    }
}
