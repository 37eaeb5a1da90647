use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use blackbox_core::{
    LocationSample, MetricsSnapshot, ReportScheduler, StatAccumulator, TelemetryBus,
};

fn fixture() -> (Arc<StatAccumulator>, TelemetryBus, ReportScheduler) {
    let (location_tx, _location_rx) = mpsc::unbounded_channel();
    let (motion_tx, _motion_rx) = mpsc::unbounded_channel();
    let (battery_tx, _battery_rx) = mpsc::unbounded_channel();
    let accumulator = Arc::new(StatAccumulator::new(location_tx, motion_tx, battery_tx));
    let bus = TelemetryBus::new();
    let scheduler = ReportScheduler::new(accumulator.clone(), bus.clone());
    (accumulator, bus, scheduler)
}

async fn recv_within(
    rx: &mut tokio::sync::broadcast::Receiver<MetricsSnapshot>,
    millis: u64,
) -> Option<MetricsSnapshot> {
    timeout(Duration::from_millis(millis), rx.recv())
        .await
        .ok()
        .and_then(|r| r.ok())
}

#[tokio::test]
async fn start_fires_immediately() {
    let (_acc, bus, scheduler) = fixture();
    let mut rx = bus.subscribe_metrics();

    // Long interval: only the t=0 firing can arrive this fast.
    scheduler.set_interval(60.0).unwrap();
    scheduler.start();

    assert!(recv_within(&mut rx, 250).await.is_some());
}

#[tokio::test]
async fn firings_repeat_at_the_configured_interval() {
    let (_acc, bus, scheduler) = fixture();
    let mut rx = bus.subscribe_metrics();

    scheduler.set_interval(0.05).unwrap();
    scheduler.start();

    for _ in 0..3 {
        assert!(recv_within(&mut rx, 500).await.is_some());
    }
    scheduler.stop();
}

#[tokio::test]
async fn stop_suppresses_future_firings() {
    let (_acc, bus, scheduler) = fixture();
    let mut rx = bus.subscribe_metrics();

    scheduler.set_interval(0.05).unwrap();
    scheduler.start();
    assert!(recv_within(&mut rx, 500).await.is_some());

    scheduler.stop();
    assert!(!scheduler.is_running());

    // Let any in-flight firing complete, then drain the buffer.
    tokio::time::sleep(Duration::from_millis(150)).await;
    while rx.try_recv().is_ok() {}

    assert!(recv_within(&mut rx, 200).await.is_none());
}

#[tokio::test]
async fn restart_creates_a_fresh_loop() {
    let (_acc, bus, scheduler) = fixture();

    scheduler.set_interval(60.0).unwrap();
    scheduler.start();
    scheduler.stop();

    let mut rx = bus.subscribe_metrics();
    scheduler.start();
    assert!(scheduler.is_running());
    // Fresh loop fires its own immediate first snapshot.
    assert!(recv_within(&mut rx, 250).await.is_some());
    scheduler.stop();
}

#[tokio::test]
async fn start_while_running_is_a_noop() {
    let (_acc, bus, scheduler) = fixture();
    let mut rx = bus.subscribe_metrics();

    scheduler.set_interval(60.0).unwrap();
    scheduler.start();
    scheduler.start();

    assert!(recv_within(&mut rx, 250).await.is_some());
    // A second loop would produce a second immediate firing.
    assert!(recv_within(&mut rx, 200).await.is_none());
    scheduler.stop();
}

#[tokio::test]
async fn stop_does_not_clear_accumulated_state() {
    let (acc, _bus, scheduler) = fixture();

    scheduler.set_interval(60.0).unwrap();
    scheduler.start();

    acc.ingest_location_batch(&[LocationSample {
        latitude: 1.0,
        longitude: 2.0,
        heading: 3.0,
        speed: 21.0,
        altitude: 4.0,
        epoch_seconds: 5.0,
    }]);

    scheduler.stop();
    let snap = acc.snapshot();
    assert_eq!(snap.location.top_speed, 21.0);
    assert_eq!(snap.location.num_locations, 1);
}

#[test]
fn interval_must_be_positive_and_finite() {
    let (location_tx, _lrx) = mpsc::unbounded_channel();
    let (motion_tx, _mrx) = mpsc::unbounded_channel();
    let (battery_tx, _brx) = mpsc::unbounded_channel();
    let accumulator = Arc::new(StatAccumulator::new(location_tx, motion_tx, battery_tx));
    let scheduler = ReportScheduler::new(accumulator, TelemetryBus::new());

    assert!(scheduler.set_interval(0.0).is_err());
    assert!(scheduler.set_interval(-1.0).is_err());
    assert!(scheduler.set_interval(f64::NAN).is_err());
    assert!(scheduler.set_interval(f64::INFINITY).is_err());

    scheduler.set_interval(2.5).unwrap();
    assert_eq!(scheduler.interval(), Duration::from_millis(2_500));
}
