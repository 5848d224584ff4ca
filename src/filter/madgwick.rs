use log::{debug, trace, warn};
use nalgebra::{Matrix3x4, Vector4};
#[cfg(not(test))]
use num_traits::Float;
use num_traits::Zero;

use super::OrientationFilter;
use crate::config::{
    beta_from_gyro_error, is_valid_sample_period, zeta_from_gyro_drift, GradientDescentConfig,
    IntegrationMethod,
};
use crate::error::FusionError;
use crate::math::{AxisAngle, EulerAngles, Quaternion, Vector3, DEGENERATE_NORM_SQUARED};

/// Gravity direction in the Earth frame, `[0, 0, 0, 1]`
const EARTH_GRAVITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

/// Initial reference flux, magnetic north along Earth x
const DEFAULT_REFERENCE_FLUX: Quaternion = Quaternion::new(0.0, 1.0, 0.0, 0.0);

/// Gradient-descent orientation filter for IMU (gyro + accel) and MARG
/// (gyro + accel + mag) sensors.
///
/// Every tick the estimate is compared with the measured gravity (and
/// magnetic field) directions. The analytic gradient of that error is
/// subtracted, scaled by `beta`, from the gyro-integrated orientation. With a
/// magnetometer the filter also tracks gyro bias (gain `zeta`) and the
/// horizontal/vertical split of the local magnetic field.
#[derive(Debug, Clone)]
pub struct GradientDescentFilter {
    /// Orientation estimate, body to Earth
    q: Quaternion,
    /// Estimated gyro bias, rad/s
    gyro_bias: Vector3,
    /// Earth magnetic field direction `[0, bx, 0, bz]`
    reference_flux: Quaternion,
    beta: f32,
    zeta: f32,
    sample_period: f32,
    integration: IntegrationMethod,
}

impl Default for GradientDescentFilter {
    fn default() -> Self {
        Self::new(GradientDescentConfig::default())
    }
}

impl GradientDescentFilter {
    /// A filter with a non-positive sample period is created disabled
    pub fn new(config: GradientDescentConfig) -> Self {
        let mut filter = Self {
            q: Quaternion::identity(),
            gyro_bias: Vector3::zeros(),
            reference_flux: DEFAULT_REFERENCE_FLUX,
            beta: 0.0,
            zeta: 0.0,
            sample_period: 0.0,
            integration: config.integration,
        };
        filter.set_sample_period(config.sample_period);
        filter.set_gyro_error_gain(config.gyro_error);
        filter.set_gyro_drift_gain(config.gyro_drift);
        filter
    }

    pub fn try_new(config: GradientDescentConfig) -> Result<Self, FusionError> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Starts from `orientation` instead of the identity
    pub fn with_orientation(mut self, orientation: Quaternion) -> Self {
        self.set_orientation(orientation);
        self
    }

    pub fn orientation(&self) -> Quaternion {
        self.q
    }

    pub fn gyro_bias(&self) -> Vector3 {
        self.gyro_bias
    }

    pub fn reference_flux(&self) -> Quaternion {
        self.reference_flux
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }

    pub fn zeta(&self) -> f32 {
        self.zeta
    }

    pub fn sample_period(&self) -> f32 {
        self.sample_period
    }

    pub fn integration(&self) -> IntegrationMethod {
        self.integration
    }

    pub fn is_enabled(&self) -> bool {
        is_valid_sample_period(self.sample_period)
    }

    pub fn euler_angles(&self) -> EulerAngles {
        self.q.to_euler_angles()
    }

    pub fn axis_angle(&self) -> AxisAngle {
        self.q.to_axis_angle()
    }

    /// Seconds between samples. A non-positive or non-finite value disables the filter.
    pub fn set_sample_period(&mut self, sample_period: f32) {
        if !is_valid_sample_period(sample_period) {
            warn!("Invalid sample period {sample_period}, gradient descent filter disabled");
        } else {
            debug!("Gradient descent filter sample period set to {sample_period}s");
        }
        self.sample_period = sample_period;
    }

    /// Sets `beta` from the expected gyro measurement error (rad/s).
    /// Negative or non-finite values are ignored.
    pub fn set_gyro_error_gain(&mut self, gyro_error: f32) {
        if !gyro_error.is_finite() || gyro_error < 0.0 {
            warn!("Ignoring invalid gyro error {gyro_error}, keeping beta = {}", self.beta);
            return;
        }
        self.beta = beta_from_gyro_error(gyro_error);
        debug!("Gradient descent filter beta = {}", self.beta);
    }

    /// Sets `zeta` from the expected gyro drift (rad/s²).
    /// Negative or non-finite values are ignored.
    pub fn set_gyro_drift_gain(&mut self, gyro_drift: f32) {
        if !gyro_drift.is_finite() || gyro_drift < 0.0 {
            warn!("Ignoring invalid gyro drift {gyro_drift}, keeping zeta = {}", self.zeta);
            return;
        }
        self.zeta = zeta_from_gyro_drift(gyro_drift);
        debug!("Gradient descent filter zeta = {}", self.zeta);
    }

    pub fn set_integration(&mut self, integration: IntegrationMethod) {
        self.integration = integration;
    }

    /// Overwrites the estimate. Normalized on entry; a degenerate quaternion
    /// becomes the identity.
    pub fn set_orientation(&mut self, orientation: Quaternion) {
        self.q = orientation.normalize();
    }

    /// Identity orientation, zero bias, default reference flux
    pub fn reset(&mut self) {
        self.q = Quaternion::identity();
        self.gyro_bias = Vector3::zeros();
        self.reference_flux = DEFAULT_REFERENCE_FLUX;
    }

    /// 6DOF update, gyroscope and accelerometer only
    pub fn update_imu(&mut self, gyro: Vector3, accel: Vector3) -> Option<Quaternion> {
        self.update(gyro, accel, None)
    }

    /// 9DOF update with magnetometer
    pub fn update_marg(
        &mut self,
        gyro: Vector3,
        accel: Vector3,
        mag: Vector3,
    ) -> Option<Quaternion> {
        self.update(gyro, accel, Some(mag))
    }

    /// Advances the estimate by one sample period.
    ///
    /// Returns `None` and leaves the state untouched when the filter is
    /// disabled or the sample has neither a gyro nor an accelerometer reading.
    /// A zero accelerometer only skips the correction step, the gyro is still
    /// integrated. A zero magnetometer is treated as absent.
    pub fn update(
        &mut self,
        gyro: Vector3,
        accel: Vector3,
        mag: Option<Vector3>,
    ) -> Option<Quaternion> {
        if !self.is_enabled() {
            trace!("Gradient descent filter disabled, dropping sample");
            return None;
        }

        if !gyro.is_finite() || (!gyro.has_data() && !accel.has_data()) {
            trace!("Dropping sample without data");
            return None;
        }

        let dt = self.sample_period;
        let q = self.q;

        let accel = accel.has_data().then(|| accel.fast_normalize());
        let mag = match (accel, mag) {
            (Some(_), Some(mag)) if mag.has_data() => Some(mag.fast_normalize()),
            _ => None,
        };

        if accel.is_none() {
            trace!("Degenerate accelerometer reading, integrating gyro only");
        }

        let gradient = match accel {
            Some(accel) => self.gradient(&accel, mag.as_ref()),
            None => Quaternion::zero(),
        };

        if mag.is_some() {
            // Gyro error rate in the body frame
            let error_rate = (q.conjugate() * 2.0 * gradient).vector();
            self.gyro_bias += error_rate * (self.zeta * dt);
        }

        let rate = gyro - self.gyro_bias;
        let correction = gradient * (self.beta * dt);

        let integrated = match self.integration {
            IntegrationMethod::Exponential => {
                q * Quaternion::from_scaled_axis(&(rate * dt)) - correction
            }
            IntegrationMethod::FirstOrder => {
                q + q * Quaternion::pure(rate) * (0.5 * dt) - correction
            }
        };

        self.q = integrated.normalize();

        if let Some(mag) = mag {
            self.update_reference_flux(&mag);
        }

        Some(self.q)
    }

    /// Normalized `Jᵗ f` for the gravity and, if present, magnetic field objective
    fn gradient(&self, accel: &Vector3, mag: Option<&Vector3>) -> Quaternion {
        let Quaternion {
            w: q1,
            x: q2,
            y: q3,
            z: q4,
        } = self.q;

        let f_g = self.objective(&EARTH_GRAVITY, accel);
        #[rustfmt::skip]
        let j_g = Matrix3x4::new(
            -2.0 * q3, 2.0 * q4, -2.0 * q1, 2.0 * q2,
            2.0 * q2, 2.0 * q1, 2.0 * q4, 2.0 * q3,
            0.0, -4.0 * q2, -4.0 * q3, 0.0,
        );

        let mut gradient: Vector4<f32> = j_g.tr_mul(&f_g);

        if let Some(mag) = mag {
            let Quaternion { x: bx, z: bz, .. } = self.reference_flux;

            let f_b = self.objective(&self.reference_flux, mag);
            #[rustfmt::skip]
            let j_b = Matrix3x4::new(
                -2.0 * bz * q3,
                2.0 * bz * q4,
                -4.0 * bx * q3 - 2.0 * bz * q1,
                -4.0 * bx * q4 + 2.0 * bz * q2,

                -2.0 * bx * q4 + 2.0 * bz * q2,
                2.0 * bx * q3 + 2.0 * bz * q1,
                2.0 * bx * q2 + 2.0 * bz * q4,
                -2.0 * bx * q1 + 2.0 * bz * q3,

                2.0 * bx * q3,
                2.0 * bx * q4 - 4.0 * bz * q2,
                2.0 * bx * q1 - 4.0 * bz * q3,
                2.0 * bx * q2,
            );

            gradient += j_b.tr_mul(&f_b);
        }

        // Already aligned with the measurement
        let norm_squared = gradient.norm_squared();
        if !norm_squared.is_finite() || norm_squared <= DEGENERATE_NORM_SQUARED {
            return Quaternion::zero();
        }

        Quaternion::from(<[f32; 4]>::from(gradient)).fast_normalize()
    }

    /// Earth-frame reference `reference` seen from the body, minus the measured direction
    fn objective(&self, reference: &Quaternion, measured: &Vector3) -> nalgebra::Vector3<f32> {
        let predicted = (self.q.conjugate() * *reference * self.q).vector();
        (predicted - *measured).into()
    }

    /// Rotates the measured field into the Earth frame and drops its east component
    fn update_reference_flux(&mut self, mag: &Vector3) {
        let h = (self.q * Quaternion::pure(*mag) * self.q.conjugate()).vector();
        self.reference_flux = Quaternion::new(0.0, (h.x * h.x + h.y * h.y).sqrt(), 0.0, h.z);
    }
}

impl OrientationFilter for GradientDescentFilter {
    fn update(
        &mut self,
        gyro: Vector3,
        accel: Vector3,
        mag: Option<Vector3>,
    ) -> Option<Quaternion> {
        GradientDescentFilter::update(self, gyro, accel, mag)
    }

    fn orientation(&self) -> Quaternion {
        self.q
    }

    fn euler_angles(&self) -> EulerAngles {
        GradientDescentFilter::euler_angles(self)
    }

    fn sample_period(&self) -> f32 {
        self.sample_period
    }

    fn is_enabled(&self) -> bool {
        GradientDescentFilter::is_enabled(self)
    }

    fn reset(&mut self) {
        GradientDescentFilter::reset(self)
    }
}
