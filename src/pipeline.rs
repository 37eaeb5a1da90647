//! Top-level telemetry pipeline.
//!
//! Owns the storage backend, the stat accumulator, the event bus, and
//! the report scheduler as one explicitly constructed context instead
//! of ambient global state. Sensor sources hand deliveries to the
//! `deliver_*` methods; storage writes happen on dedicated tasks (one
//! per sample category) so no sensor callback ever waits on the
//! durable store.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::TelemetryConfig;
use crate::error::{Error, Result};
use crate::events::{SampleEvent, StatsEvent, TelemetryBus};
use crate::metrics::accumulator::StatAccumulator;
use crate::metrics::scheduler::ReportScheduler;
use crate::samples::{BatterySample, LocationSample, MotionSample};
use crate::storage::duckdb::DuckDbBackend;
use crate::storage::StorageBackend;

/// The assembled telemetry pipeline.
pub struct TelemetryPipeline {
    storage: Arc<DuckDbBackend>,
    accumulator: Arc<StatAccumulator>,
    scheduler: ReportScheduler,
    bus: TelemetryBus,
    writers: Mutex<Vec<JoinHandle<()>>>,
}

impl TelemetryPipeline {
    /// Open the durable store and assemble the pipeline. Fails before
    /// any tracking begins if the store cannot be initialized.
    ///
    /// Must be called from within a tokio runtime (the storage writer
    /// tasks are spawned here).
    pub fn new(config: &TelemetryConfig) -> Result<Arc<Self>> {
        let storage = Arc::new(DuckDbBackend::open(
            &config.storage.path,
            &config.storage.device_id,
        )?);

        let bus = TelemetryBus::with_capacity(config.reporting.channel_capacity);

        let (location_tx, location_rx) = mpsc::unbounded_channel();
        let (motion_tx, motion_rx) = mpsc::unbounded_channel();
        let (battery_tx, battery_rx) = mpsc::unbounded_channel();

        let accumulator = Arc::new(StatAccumulator::new(location_tx, motion_tx, battery_tx));

        let writers = vec![
            spawn_writer("location", location_rx, storage.clone(), |s, sample| {
                Box::pin(async move { s.append_location(&sample).await })
            }),
            spawn_writer("motion", motion_rx, storage.clone(), |s, sample| {
                Box::pin(async move { s.append_motion(&sample).await })
            }),
            spawn_writer("battery", battery_rx, storage.clone(), |s, sample| {
                Box::pin(async move { s.append_battery(&sample).await })
            }),
        ];

        let scheduler = ReportScheduler::new(accumulator.clone(), bus.clone());
        scheduler.set_interval(config.reporting.interval_secs)?;

        Ok(Arc::new(Self {
            storage,
            accumulator,
            scheduler,
            bus,
            writers: Mutex::new(writers),
        }))
    }

    pub fn bus(&self) -> &TelemetryBus {
        &self.bus
    }

    pub fn scheduler(&self) -> &ReportScheduler {
        &self.scheduler
    }

    pub fn accumulator(&self) -> &StatAccumulator {
        &self.accumulator
    }

    pub fn storage(&self) -> &DuckDbBackend {
        &self.storage
    }

    /// Handle one delivery from the location source (zero or more
    /// samples). A failed delivery is logged and ignored; the
    /// accumulator is left untouched for it.
    pub fn deliver_locations(&self, delivery: Result<Vec<LocationSample>>) {
        let samples = match delivery {
            Ok(samples) => samples,
            Err(e) => {
                warn!(error = %e, "location delivery failed, skipping");
                return;
            }
        };

        let stats = self.accumulator.ingest_location_batch(&samples);
        self.bus
            .publish_sample(SampleEvent::LocationBatch(samples.into()));
        self.bus
            .publish_stats(StatsEvent::LocationStatsUpdated(stats));
    }

    /// Handle one motion sample from the motion source.
    pub fn deliver_motion(&self, delivery: Result<MotionSample>) {
        let sample = match delivery {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "motion delivery failed, skipping");
                return;
            }
        };

        self.accumulator.ingest_motion_sample(&sample);
        self.bus.publish_sample(SampleEvent::Motion(sample));
    }

    /// Handle one battery sample from the power source.
    pub fn deliver_battery(&self, delivery: Result<BatterySample>) {
        let sample = match delivery {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, "battery delivery failed, skipping");
                return;
            }
        };

        let stats = self.accumulator.ingest_battery_sample(&sample);
        self.bus.publish_sample(SampleEvent::Battery(sample));
        self.bus.publish_stats(StatsEvent::DeviceStatsUpdated(stats));
    }

    /// Start the periodic rollup publisher.
    pub fn start_reporting(&self) {
        self.scheduler.start();
    }

    /// Stop reporting, close the writer channels, and wait for queued
    /// appends to drain.
    pub async fn shutdown(&self) {
        self.scheduler.stop();
        self.accumulator.close_writers();

        let handles: Vec<_> = self.writers.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "storage writer task failed");
            }
        }
        info!("telemetry pipeline shut down");
    }
}

type AppendFuture = std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>>;

/// Spawn a writer task that drains one sample stream into storage in
/// submission order. An append failure is fatal for that record only:
/// it is reported and the stream continues.
fn spawn_writer<T: Send + 'static>(
    stream: &'static str,
    mut rx: mpsc::UnboundedReceiver<T>,
    storage: Arc<DuckDbBackend>,
    append: impl Fn(Arc<DuckDbBackend>, T) -> AppendFuture + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(sample) = rx.recv().await {
            if let Err(e) = append(storage.clone(), sample).await {
                match e {
                    Error::Append(msg) => warn!(stream, "dropping record: {}", msg),
                    other => warn!(stream, error = %other, "dropping record"),
                }
            }
        }
    })
}
