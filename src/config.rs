//! Filter configuration.
//!
//! Configs are plain values built with `with_*` methods and handed to a
//! filter constructor. A filter accepts any config: an invalid sample period
//! only leaves it disabled. Use [`GradientDescentConfig::validate`] (or the
//! filters' `try_new`) to reject bad values up front instead.

use crate::error::FusionError;
use crate::math::PI_180;

/// Default sample period, 100 Hz
pub const DEFAULT_SAMPLE_PERIOD: f32 = 0.01;

/// Default gyroscope measurement error, 5 °/s
pub const DEFAULT_GYRO_ERROR: f32 = 5.0 * PI_180;

/// Default gyroscope drift, 0.2 °/s²
pub const DEFAULT_GYRO_DRIFT: f32 = 0.2 * PI_180;

/// Default weight of the integrated gyro angle in the complementary blend
pub const DEFAULT_ALPHA: f32 = 0.98;

/// sqrt(3/4), maps a per-axis gyro error to the quaternion-derivative gain
const GAIN_FACTOR: f32 = 0.866_025_4;

/// Gain `beta` for a gyroscope measurement error in rad/s
pub fn beta_from_gyro_error(gyro_error: f32) -> f32 {
    GAIN_FACTOR * gyro_error
}

/// Gain `zeta` for a gyroscope drift rate in rad/s²
pub fn zeta_from_gyro_drift(gyro_drift: f32) -> f32 {
    GAIN_FACTOR * gyro_drift
}

/// How the gyroscope rate is integrated into the orientation each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IntegrationMethod {
    /// Closed form `q ⊗ exp(½ ω dt)`, exact for a constant rate
    #[default]
    Exponential,
    /// Euler step `q + ½ q ⊗ [0, ω] dt`
    FirstOrder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GradientDescentConfig {
    /// Seconds between samples. `<= 0` disables the filter.
    pub sample_period: f32,
    /// Expected gyroscope measurement error, rad/s
    pub gyro_error: f32,
    /// Expected gyroscope bias drift, rad/s²
    pub gyro_drift: f32,
    pub integration: IntegrationMethod,
}

impl Default for GradientDescentConfig {
    fn default() -> Self {
        Self {
            sample_period: DEFAULT_SAMPLE_PERIOD,
            gyro_error: DEFAULT_GYRO_ERROR,
            gyro_drift: DEFAULT_GYRO_DRIFT,
            integration: IntegrationMethod::default(),
        }
    }
}

impl GradientDescentConfig {
    pub fn new(sample_period: f32) -> Self {
        Self::default().with_sample_period(sample_period)
    }

    pub fn with_sample_period(mut self, sample_period: f32) -> Self {
        self.sample_period = sample_period;
        self
    }

    pub fn with_sample_rate_hz(self, rate: f32) -> Self {
        self.with_sample_period(1.0 / rate)
    }

    pub fn with_gyro_error(mut self, gyro_error: f32) -> Self {
        self.gyro_error = gyro_error;
        self
    }

    pub fn with_gyro_error_deg(self, gyro_error: f32) -> Self {
        self.with_gyro_error(gyro_error * PI_180)
    }

    pub fn with_gyro_drift(mut self, gyro_drift: f32) -> Self {
        self.gyro_drift = gyro_drift;
        self
    }

    pub fn with_gyro_drift_deg(self, gyro_drift: f32) -> Self {
        self.with_gyro_drift(gyro_drift * PI_180)
    }

    pub fn with_integration(mut self, integration: IntegrationMethod) -> Self {
        self.integration = integration;
        self
    }

    pub fn beta(&self) -> f32 {
        beta_from_gyro_error(self.gyro_error)
    }

    pub fn zeta(&self) -> f32 {
        zeta_from_gyro_drift(self.gyro_drift)
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        validate_sample_period(self.sample_period)?;
        if !is_non_negative(self.gyro_error) || !is_non_negative(self.gyro_drift) {
            return Err(FusionError::InvalidConfiguration);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComplementaryConfig {
    /// Seconds between samples. `<= 0` disables the filter.
    pub sample_period: f32,
    /// Weight of the gyro-integrated angle, in `[0, 1]`
    pub alpha: f32,
}

impl Default for ComplementaryConfig {
    fn default() -> Self {
        Self {
            sample_period: DEFAULT_SAMPLE_PERIOD,
            alpha: DEFAULT_ALPHA,
        }
    }
}

impl ComplementaryConfig {
    pub fn new(sample_period: f32) -> Self {
        Self::default().with_sample_period(sample_period)
    }

    pub fn with_sample_period(mut self, sample_period: f32) -> Self {
        self.sample_period = sample_period;
        self
    }

    pub fn with_sample_rate_hz(self, rate: f32) -> Self {
        self.with_sample_period(1.0 / rate)
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        validate_sample_period(self.sample_period)?;
        if !is_valid_alpha(self.alpha) {
            return Err(FusionError::InvalidConfiguration);
        }
        Ok(())
    }
}

/// Selects one of the filter variants, see [`crate::filter::Estimator`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EstimatorConfig {
    GradientDescent(GradientDescentConfig),
    Complementary(ComplementaryConfig),
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::GradientDescent(GradientDescentConfig::default())
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), FusionError> {
        match self {
            Self::GradientDescent(config) => config.validate(),
            Self::Complementary(config) => config.validate(),
        }
    }
}

impl From<GradientDescentConfig> for EstimatorConfig {
    fn from(config: GradientDescentConfig) -> Self {
        Self::GradientDescent(config)
    }
}

impl From<ComplementaryConfig> for EstimatorConfig {
    fn from(config: ComplementaryConfig) -> Self {
        Self::Complementary(config)
    }
}

pub(crate) fn is_valid_sample_period(sample_period: f32) -> bool {
    sample_period.is_finite() && sample_period > 0.0
}

pub(crate) fn is_valid_alpha(alpha: f32) -> bool {
    (0.0..=1.0).contains(&alpha)
}

fn is_non_negative(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

fn validate_sample_period(sample_period: f32) -> Result<(), FusionError> {
    if is_valid_sample_period(sample_period) {
        Ok(())
    } else {
        Err(FusionError::InvalidConfiguration)
    }
}
