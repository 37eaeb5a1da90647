//! Immutable sensor sample types.
//!
//! Samples are created at sensor-event time, written once to the durable
//! store, and never mutated or deleted afterwards. Timestamps are
//! floating-point epoch seconds as delivered by the sensor sources.

use serde::{Deserialize, Serialize};

/// One location fix from the location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Course over ground in degrees.
    pub heading: f64,
    /// Ground speed in meters per second.
    pub speed: f64,
    /// Altitude in meters.
    pub altitude: f64,
    pub epoch_seconds: f64,
}

/// One accelerometer reading from the motion source (~60Hz nominal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
    pub epoch_seconds: f64,
}

impl MotionSample {
    /// Magnitude of the net acceleration vector.
    pub fn magnitude(&self) -> f64 {
        (self.accel_x.powi(2) + self.accel_y.powi(2) + self.accel_z.powi(2)).sqrt()
    }
}

/// One power-state reading, delivered on level or state change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySample {
    /// Charge fraction in `[0, 1]`.
    pub charge: f64,
    pub unplugged: bool,
    pub epoch_seconds: f64,
}
