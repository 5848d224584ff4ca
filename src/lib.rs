//! Orientation estimation from gyroscope, accelerometer and (optionally)
//! magnetometer readings.
//!
//! The caller owns the sampling loop: read the sensors, convert the gyro to
//! rad/s and feed one sample per sample period to a filter. The filter keeps
//! a unit quaternion mapping the sensor (body) frame to the Earth frame.
//!
//! ```
//! use ahrs_fusion::{GradientDescentConfig, GradientDescentFilter, Vector3};
//!
//! let config = GradientDescentConfig::new(0.01).with_gyro_error_deg(5.0);
//! let mut filter = GradientDescentFilter::new(config);
//!
//! let gyro = Vector3::new(0.0, 0.0, 0.1);
//! let accel = Vector3::new(0.0, 0.0, 9.81);
//! let mag = Vector3::new(0.3, 0.0, -0.4);
//!
//! let q = filter.update(gyro, accel, Some(mag)).unwrap();
//! let angles = q.to_euler_angles();
//! assert!(angles.yaw.abs() < 0.1);
//! ```

#![no_std]

pub mod config;
pub mod error;
pub mod filter;
pub mod math;

pub use config::{ComplementaryConfig, EstimatorConfig, GradientDescentConfig, IntegrationMethod};
pub use error::FusionError;
pub use filter::{ComplementaryFilter, Estimator, GradientDescentFilter, OrientationFilter};
pub use math::{AxisAngle, EulerAngles, Quaternion, Vector3};
