//! Timer-driven rollup publisher.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::events::TelemetryBus;
use crate::metrics::accumulator::StatAccumulator;

/// Default reporting interval in milliseconds.
const DEFAULT_INTERVAL_MILLIS: u64 = 10_000;

/// Periodically snapshots the accumulator and publishes the rollup on
/// the bus's metrics channel.
///
/// The loop is self-rescheduling: each firing publishes, then sleeps
/// for the interval in effect at that moment, so jitter accumulates in
/// proportion to publish latency. Changing the interval takes effect
/// at the next scheduling point, never retroactively.
///
/// Stopping only suppresses future firings: a publish already in
/// flight completes, and the loop exits no later than the next tick
/// boundary. Restarting creates a fresh loop (with a fresh immediate
/// first firing); it does not resume the old one.
pub struct ReportScheduler {
    accumulator: Arc<StatAccumulator>,
    bus: TelemetryBus,
    interval_millis: Arc<AtomicU64>,
    /// Stop flag for the currently running loop, if any. Each `start`
    /// installs a new flag so a stale loop from a previous run can
    /// never outlive its own stop.
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl ReportScheduler {
    pub fn new(accumulator: Arc<StatAccumulator>, bus: TelemetryBus) -> Self {
        Self {
            accumulator,
            bus,
            interval_millis: Arc::new(AtomicU64::new(DEFAULT_INTERVAL_MILLIS)),
            current: Mutex::new(None),
        }
    }

    /// Set the reporting interval in seconds. Takes effect on the next
    /// scheduled firing.
    pub fn set_interval(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(Error::Config(format!(
                "reporting interval must be a positive number of seconds, got {}",
                seconds
            )));
        }
        let millis = ((seconds * 1000.0) as u64).max(1);
        self.interval_millis.store(millis, Ordering::Relaxed);
        debug!(interval_millis = millis, "reporting interval updated");
        Ok(())
    }

    /// Current reporting interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_millis.load(Ordering::Relaxed))
    }

    /// Whether a reporting loop is currently installed.
    pub fn is_running(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Start the reporting loop. The first firing happens immediately;
    /// subsequent firings follow the configured interval. Calling
    /// `start` while already running is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut current = self.current.lock();
        if current.is_some() {
            return;
        }

        let stopped = Arc::new(AtomicBool::new(false));
        *current = Some(stopped.clone());

        let accumulator = self.accumulator.clone();
        let bus = self.bus.clone();
        let interval_millis = self.interval_millis.clone();

        info!("metric reporting started");
        tokio::spawn(async move {
            loop {
                let snapshot = accumulator.snapshot();
                bus.publish_metrics(snapshot);

                // Interval is sampled fresh at schedule time so a
                // runtime change affects the very next tick.
                let interval = Duration::from_millis(interval_millis.load(Ordering::Relaxed));
                time::sleep(interval).await;

                if stopped.load(Ordering::Acquire) {
                    break;
                }
            }
            info!("metric reporting stopped");
        });
    }

    /// Stop the reporting loop. Does not clear any accumulated state;
    /// a snapshot taken after stopping still returns the last computed
    /// statistics.
    pub fn stop(&self) {
        if let Some(stopped) = self.current.lock().take() {
            stopped.store(true, Ordering::Release);
        }
    }
}
