//! Running statistics and periodic rollups over the sample streams.
//!
//! The [`accumulator`] owns the mutable running state and serializes
//! every mutation and read behind a single lock. The [`scheduler`]
//! snapshots that state on a fixed cadence and publishes it on the
//! event bus.

pub mod accumulator;
pub mod scheduler;

use serde::Serialize;

/// Running aggregate over the location stream.
///
/// `top_speed` is a lifetime maximum and is never reset;
/// `top_speed_batch` is the maximum within the most recent ingestion
/// batch and resets to zero at the start of every delivery. The
/// invariant `top_speed >= top_speed_batch` holds at all times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationStats {
    /// Mirror of the accumulator's running acceleration peak, updated
    /// on every motion ingest.
    pub peak_acceleration: f64,
    pub top_speed: f64,
    pub top_speed_batch: f64,
    pub num_locations: u64,
    pub latest_lat: f64,
    pub latest_lon: f64,
    pub latest_altitude: f64,
}

impl Default for LocationStats {
    fn default() -> Self {
        Self {
            peak_acceleration: 0.0,
            top_speed: 0.0,
            top_speed_batch: 0.0,
            num_locations: 0,
            latest_lat: 0.0,
            latest_lon: 0.0,
            latest_altitude: 0.0,
        }
    }
}

/// Last observed power state of the device.
///
/// `battery_level` of `-1.0` is a sentinel meaning "no reading yet",
/// distinguishable from a real 0% reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceStats {
    pub battery_level: f64,
    pub unplugged: bool,
}

impl Default for DeviceStats {
    fn default() -> Self {
        Self {
            battery_level: -1.0,
            unplugged: true,
        }
    }
}

/// Immutable point-in-time rollup published once per reporting interval.
///
/// Recipients must not assume consecutive snapshots are spaced exactly
/// one interval apart; the cadence is best-effort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub location: LocationStats,
    pub device: DeviceStats,
    /// Lifetime peak of motion magnitude; `-1.0` before the first
    /// motion sample arrives.
    pub acceleration_peak: f64,
}
