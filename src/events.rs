//! Typed event bus decoupling sample producers, the accumulator, and
//! snapshot consumers.
//!
//! Built on broadcast channels, one per event category. Payloads are
//! tagged enum variants, so consumers never downcast. Subscribing
//! returns an ordinary broadcast receiver; dropping it unsubscribes at
//! any point (including from inside a consumer's own handler task)
//! without affecting other subscriptions.
//!
//! Publishing is non-blocking and infallible from the producer's point
//! of view: a publish with no live subscribers is simply discarded.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::metrics::{DeviceStats, LocationStats, MetricsSnapshot};
use crate::samples::{BatterySample, LocationSample, MotionSample};

/// Default per-channel buffer depth before slow subscribers start
/// observing lag.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A sample arrived from one of the sensor sources.
#[derive(Debug, Clone)]
pub enum SampleEvent {
    /// One delivery of location samples (possibly empty).
    LocationBatch(Arc<[LocationSample]>),
    Motion(MotionSample),
    Battery(BatterySample),
}

/// Running statistics changed after an ingest.
#[derive(Debug, Clone, Copy)]
pub enum StatsEvent {
    LocationStatsUpdated(LocationStats),
    DeviceStatsUpdated(DeviceStats),
}

/// Many-producer/many-consumer pub/sub for telemetry events.
#[derive(Clone)]
pub struct TelemetryBus {
    samples_tx: broadcast::Sender<SampleEvent>,
    stats_tx: broadcast::Sender<StatsEvent>,
    metrics_tx: broadcast::Sender<MetricsSnapshot>,
}

impl TelemetryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (samples_tx, _) = broadcast::channel(capacity);
        let (stats_tx, _) = broadcast::channel(capacity);
        let (metrics_tx, _) = broadcast::channel(capacity);
        Self {
            samples_tx,
            stats_tx,
            metrics_tx,
        }
    }

    /// Subscribe to raw sample arrivals.
    pub fn subscribe_samples(&self) -> broadcast::Receiver<SampleEvent> {
        self.samples_tx.subscribe()
    }

    /// Subscribe to running-statistics updates.
    pub fn subscribe_stats(&self) -> broadcast::Receiver<StatsEvent> {
        self.stats_tx.subscribe()
    }

    /// Subscribe to the periodic metric rollups.
    pub fn subscribe_metrics(&self) -> broadcast::Receiver<MetricsSnapshot> {
        self.metrics_tx.subscribe()
    }

    /// Publish a sample arrival. Discarded if nobody is listening.
    pub fn publish_sample(&self, event: SampleEvent) {
        let _ = self.samples_tx.send(event);
    }

    /// Publish a statistics update. Discarded if nobody is listening.
    pub fn publish_stats(&self, event: StatsEvent) {
        let _ = self.stats_tx.send(event);
    }

    /// Publish a metric rollup. Discarded if nobody is listening.
    pub fn publish_metrics(&self, snapshot: MetricsSnapshot) {
        let _ = self.metrics_tx.send(snapshot);
    }

    /// Check if any rollup subscribers are active.
    pub fn has_metrics_subscribers(&self) -> bool {
        self.metrics_tx.receiver_count() > 0
    }
}

impl Default for TelemetryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery(charge: f64) -> BatterySample {
        BatterySample {
            charge,
            unplugged: true,
            epoch_seconds: 0.0,
        }
    }

    #[test]
    fn publish_without_subscribers_is_discarded() {
        let bus = TelemetryBus::new();
        assert!(!bus.has_metrics_subscribers());
        bus.publish_sample(SampleEvent::Battery(battery(0.5)));
        bus.publish_metrics(MetricsSnapshot {
            location: LocationStats::default(),
            device: DeviceStats::default(),
            acceleration_peak: -1.0,
        });
    }

    #[tokio::test]
    async fn each_subscriber_receives_every_event() {
        let bus = TelemetryBus::new();
        let mut rx1 = bus.subscribe_samples();
        let mut rx2 = bus.subscribe_samples();

        bus.publish_sample(SampleEvent::Battery(battery(0.8)));

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                SampleEvent::Battery(sample) => assert_eq!(sample.charge, 0.8),
                other => panic!("unexpected event: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_affect_others() {
        let bus = TelemetryBus::new();
        let rx1 = bus.subscribe_stats();
        let mut rx2 = bus.subscribe_stats();

        // Unsubscribe one consumer mid-stream.
        drop(rx1);
        bus.publish_stats(StatsEvent::DeviceStatsUpdated(DeviceStats::default()));

        match rx2.recv().await.unwrap() {
            StatsEvent::DeviceStatsUpdated(stats) => assert_eq!(stats.battery_level, -1.0),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
