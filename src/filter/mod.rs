//! Orientation filters.
//!
//! Both filters take one `{gyro, accel, [mag]}` sample per call and keep
//! their whole state inline. [`Estimator`] wraps either one when the variant
//! is chosen at runtime from an [`EstimatorConfig`].

use crate::config::{is_valid_sample_period, EstimatorConfig};
use crate::error::FusionError;
use crate::math::{EulerAngles, Quaternion, Vector3};

mod complementary;
mod madgwick;

pub use complementary::ComplementaryFilter;
pub use madgwick::GradientDescentFilter;

/// Common interface of the orientation filters.
///
/// `update` never fails: a tick that cannot be used leaves the state
/// untouched and returns `None`.
pub trait OrientationFilter {
    /// Feeds one sample. Gyro in rad/s, accelerometer and magnetometer in any
    /// unit. Returns the new orientation, or `None` if the tick was dropped.
    fn update(&mut self, gyro: Vector3, accel: Vector3, mag: Option<Vector3>)
        -> Option<Quaternion>;

    /// Current estimate, body frame to Earth frame
    fn orientation(&self) -> Quaternion;

    fn euler_angles(&self) -> EulerAngles {
        self.orientation().to_euler_angles()
    }

    fn sample_period(&self) -> f32;

    /// `false` while the sample period is invalid; updates are no-ops then
    fn is_enabled(&self) -> bool {
        is_valid_sample_period(self.sample_period())
    }

    /// Back to the initial state, keeping the configuration
    fn reset(&mut self);
}

/// One of the available filters
#[derive(Debug, Clone)]
pub enum Estimator {
    GradientDescent(GradientDescentFilter),
    Complementary(ComplementaryFilter),
}

impl Estimator {
    pub fn new(config: EstimatorConfig) -> Self {
        match config {
            EstimatorConfig::GradientDescent(config) => {
                Self::GradientDescent(GradientDescentFilter::new(config))
            }
            EstimatorConfig::Complementary(config) => {
                Self::Complementary(ComplementaryFilter::new(config))
            }
        }
    }

    pub fn try_new(config: EstimatorConfig) -> Result<Self, FusionError> {
        config.validate()?;
        Ok(Self::new(config))
    }
}

impl Default for Estimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl From<GradientDescentFilter> for Estimator {
    fn from(filter: GradientDescentFilter) -> Self {
        Self::GradientDescent(filter)
    }
}

impl From<ComplementaryFilter> for Estimator {
    fn from(filter: ComplementaryFilter) -> Self {
        Self::Complementary(filter)
    }
}

impl OrientationFilter for Estimator {
    fn update(
        &mut self,
        gyro: Vector3,
        accel: Vector3,
        mag: Option<Vector3>,
    ) -> Option<Quaternion> {
        match self {
            Self::GradientDescent(filter) => filter.update(gyro, accel, mag),
            Self::Complementary(filter) => filter.update(gyro, accel, mag),
        }
    }

    fn orientation(&self) -> Quaternion {
        match self {
            Self::GradientDescent(filter) => filter.orientation(),
            Self::Complementary(filter) => filter.orientation(),
        }
    }

    fn euler_angles(&self) -> EulerAngles {
        match self {
            Self::GradientDescent(filter) => filter.euler_angles(),
            Self::Complementary(filter) => filter.euler_angles(),
        }
    }

    fn sample_period(&self) -> f32 {
        match self {
            Self::GradientDescent(filter) => filter.sample_period(),
            Self::Complementary(filter) => filter.sample_period(),
        }
    }

    fn is_enabled(&self) -> bool {
        match self {
            Self::GradientDescent(filter) => filter.is_enabled(),
            Self::Complementary(filter) => filter.is_enabled(),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::GradientDescent(filter) => filter.reset(),
            Self::Complementary(filter) => filter.reset(),
        }
    }
}
