//! Running statistic accumulation over incoming sample streams.

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::metrics::{DeviceStats, LocationStats, MetricsSnapshot};
use crate::samples::{BatterySample, LocationSample, MotionSample};

/// Acceleration peak before any motion sample has been observed.
const ACCELERATION_UNSET: f64 = -1.0;

#[derive(Debug, Default)]
struct AccumulatorState {
    location: LocationStats,
    device: DeviceStats,
    acceleration_peak: f64,
}

/// Owns the running statistics for all sample categories.
///
/// Every `ingest_*` call and every `snapshot` call acquires the same
/// lock, so mutations are mutually exclusive and a snapshot can never
/// observe a half-applied update (e.g. `top_speed_batch > top_speed`).
///
/// Samples are forwarded to the storage writer tasks through unbounded
/// channels; ingestion never waits on the durable store.
pub struct StatAccumulator {
    state: Mutex<AccumulatorState>,
    location_tx: Mutex<Option<mpsc::UnboundedSender<LocationSample>>>,
    motion_tx: Mutex<Option<mpsc::UnboundedSender<MotionSample>>>,
    battery_tx: Mutex<Option<mpsc::UnboundedSender<BatterySample>>>,
}

impl StatAccumulator {
    /// Create an accumulator forwarding samples to the given writer
    /// channels (one per category, FIFO per stream).
    pub fn new(
        location_tx: mpsc::UnboundedSender<LocationSample>,
        motion_tx: mpsc::UnboundedSender<MotionSample>,
        battery_tx: mpsc::UnboundedSender<BatterySample>,
    ) -> Self {
        let state = AccumulatorState {
            acceleration_peak: ACCELERATION_UNSET,
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            location_tx: Mutex::new(Some(location_tx)),
            motion_tx: Mutex::new(Some(motion_tx)),
            battery_tx: Mutex::new(Some(battery_tx)),
        }
    }

    /// Ingest one delivery of zero or more location samples.
    ///
    /// `top_speed_batch` resets to zero at the start of every delivery,
    /// including an empty one, so the reset is visible in the next
    /// snapshot even when no new samples arrived.
    ///
    /// Returns the updated location statistics.
    pub fn ingest_location_batch(&self, samples: &[LocationSample]) -> LocationStats {
        let updated = {
            let mut state = self.state.lock();
            state.location.top_speed_batch = 0.0;
            for sample in samples {
                state.location.top_speed = state.location.top_speed.max(sample.speed);
                state.location.top_speed_batch = state.location.top_speed_batch.max(sample.speed);
                state.location.num_locations += 1;
                state.location.latest_lat = sample.latitude;
                state.location.latest_lon = sample.longitude;
                state.location.latest_altitude = sample.altitude;
            }
            state.location
        };

        if let Some(tx) = self.location_tx.lock().as_ref() {
            for sample in samples {
                if tx.send(*sample).is_err() {
                    debug!("location writer closed, sample not persisted");
                }
            }
        }

        updated
    }

    /// Ingest one motion sample, tracking the lifetime peak of the
    /// acceleration magnitude.
    pub fn ingest_motion_sample(&self, sample: &MotionSample) -> f64 {
        let magnitude = sample.magnitude();
        let peak = {
            let mut state = self.state.lock();
            state.acceleration_peak = state.acceleration_peak.max(magnitude);
            // Mirrored into the location aggregate for consumers that
            // only watch location stats updates.
            state.location.peak_acceleration = state.acceleration_peak;
            state.acceleration_peak
        };

        if let Some(tx) = self.motion_tx.lock().as_ref() {
            if tx.send(*sample).is_err() {
                debug!("motion writer closed, sample not persisted");
            }
        }

        peak
    }

    /// Ingest one battery sample. Power state is a level, not a peak:
    /// the previous reading is overwritten unconditionally.
    pub fn ingest_battery_sample(&self, sample: &BatterySample) -> DeviceStats {
        let updated = {
            let mut state = self.state.lock();
            state.device.battery_level = sample.charge;
            state.device.unplugged = sample.unplugged;
            state.device
        };

        if let Some(tx) = self.battery_tx.lock().as_ref() {
            if tx.send(*sample).is_err() {
                debug!("battery writer closed, sample not persisted");
            }
        }

        updated
    }

    /// Take a consistent, independent copy of the running state.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock();
        MetricsSnapshot {
            location: state.location,
            device: state.device,
            acceleration_peak: state.acceleration_peak,
        }
    }

    /// Close the writer channels so the storage writer tasks drain and
    /// exit. Ingestion after this point still updates in-memory state.
    pub fn close_writers(&self) {
        self.location_tx.lock().take();
        self.motion_tx.lock().take();
        self.battery_tx.lock().take();
    }
}
