use std::sync::Arc;

use tokio::sync::mpsc;

use blackbox_core::{BatterySample, LocationSample, MotionSample, StatAccumulator};

type Channels = (
    StatAccumulator,
    mpsc::UnboundedReceiver<LocationSample>,
    mpsc::UnboundedReceiver<MotionSample>,
    mpsc::UnboundedReceiver<BatterySample>,
);

fn accumulator() -> Channels {
    let (location_tx, location_rx) = mpsc::unbounded_channel();
    let (motion_tx, motion_rx) = mpsc::unbounded_channel();
    let (battery_tx, battery_rx) = mpsc::unbounded_channel();
    (
        StatAccumulator::new(location_tx, motion_tx, battery_tx),
        location_rx,
        motion_rx,
        battery_rx,
    )
}

fn location(speed: f64) -> LocationSample {
    LocationSample {
        latitude: 47.6,
        longitude: -122.3,
        heading: 180.0,
        speed,
        altitude: 30.0,
        epoch_seconds: 100.0,
    }
}

#[test]
fn top_speed_is_lifetime_max_and_batch_max_resets() {
    let (acc, _lrx, _mrx, _brx) = accumulator();

    acc.ingest_location_batch(&[location(5.0), location(12.0), location(8.0)]);
    let snap = acc.snapshot();
    assert_eq!(snap.location.top_speed, 12.0);
    assert_eq!(snap.location.top_speed_batch, 12.0);

    acc.ingest_location_batch(&[location(7.0)]);
    let snap = acc.snapshot();
    assert_eq!(snap.location.top_speed, 12.0);
    assert_eq!(snap.location.top_speed_batch, 7.0);
}

#[test]
fn empty_batch_resets_batch_max_but_keeps_lifetime_max() {
    let (acc, _lrx, _mrx, _brx) = accumulator();

    acc.ingest_location_batch(&[location(9.0)]);
    acc.ingest_location_batch(&[]);

    let snap = acc.snapshot();
    assert_eq!(snap.location.top_speed, 9.0);
    assert_eq!(snap.location.top_speed_batch, 0.0);
    assert_eq!(snap.location.num_locations, 1);
}

#[test]
fn num_locations_counts_every_sample_across_batches() {
    let (acc, _lrx, _mrx, _brx) = accumulator();

    acc.ingest_location_batch(&[location(1.0), location(2.0)]);
    acc.ingest_location_batch(&[]);
    acc.ingest_location_batch(&[location(3.0), location(4.0), location(5.0)]);

    assert_eq!(acc.snapshot().location.num_locations, 5);
}

#[test]
fn latest_position_is_last_write_wins_within_batch() {
    let (acc, _lrx, _mrx, _brx) = accumulator();

    let mut first = location(1.0);
    first.latitude = 10.0;
    first.altitude = 100.0;
    let mut second = location(2.0);
    second.latitude = 20.0;
    second.altitude = 200.0;

    acc.ingest_location_batch(&[first, second]);
    let snap = acc.snapshot();
    assert_eq!(snap.location.latest_lat, 20.0);
    assert_eq!(snap.location.latest_altitude, 200.0);
}

#[test]
fn acceleration_peak_tracks_magnitude_maximum() {
    let (acc, _lrx, _mrx, _brx) = accumulator();

    // Sentinel before any motion sample.
    assert_eq!(acc.snapshot().acceleration_peak, -1.0);

    acc.ingest_motion_sample(&MotionSample {
        accel_x: 3.0,
        accel_y: 4.0,
        accel_z: 0.0,
        epoch_seconds: 0.0,
    });
    acc.ingest_motion_sample(&MotionSample {
        accel_x: 1.0,
        accel_y: 1.0,
        accel_z: 1.0,
        epoch_seconds: 0.1,
    });

    let snap = acc.snapshot();
    assert!((snap.acceleration_peak - 5.0).abs() < 1e-12);
    assert_eq!(snap.location.peak_acceleration, snap.acceleration_peak);
}

#[test]
fn battery_state_is_last_write_wins() {
    let (acc, _lrx, _mrx, _brx) = accumulator();

    // Defaults before any reading: sentinel level, assumed unplugged.
    let snap = acc.snapshot();
    assert_eq!(snap.device.battery_level, -1.0);
    assert!(snap.device.unplugged);

    acc.ingest_battery_sample(&BatterySample {
        charge: 0.8,
        unplugged: false,
        epoch_seconds: 1.0,
    });
    acc.ingest_battery_sample(&BatterySample {
        charge: 0.5,
        unplugged: true,
        epoch_seconds: 2.0,
    });

    let snap = acc.snapshot();
    assert_eq!(snap.device.battery_level, 0.5);
    assert!(snap.device.unplugged);
}

#[test]
fn samples_are_forwarded_to_writers_in_submission_order() {
    let (acc, mut lrx, mut mrx, mut brx) = accumulator();

    acc.ingest_location_batch(&[location(1.0), location(2.0)]);
    acc.ingest_motion_sample(&MotionSample {
        accel_x: 0.5,
        accel_y: 0.0,
        accel_z: 0.0,
        epoch_seconds: 3.0,
    });
    acc.ingest_battery_sample(&BatterySample {
        charge: 0.9,
        unplugged: true,
        epoch_seconds: 4.0,
    });

    assert_eq!(lrx.try_recv().unwrap().speed, 1.0);
    assert_eq!(lrx.try_recv().unwrap().speed, 2.0);
    assert_eq!(mrx.try_recv().unwrap().accel_x, 0.5);
    assert_eq!(brx.try_recv().unwrap().charge, 0.9);
}

#[test]
fn snapshot_never_observes_batch_max_above_lifetime_max() {
    let (acc, _lrx, _mrx, _brx) = accumulator();
    let acc = Arc::new(acc);

    let writer = {
        let acc = acc.clone();
        std::thread::spawn(move || {
            for i in 0..2_000u32 {
                let speed = f64::from(i % 97);
                acc.ingest_location_batch(&[location(speed), location(speed / 2.0)]);
                if i % 13 == 0 {
                    acc.ingest_location_batch(&[]);
                }
            }
        })
    };

    while !writer.is_finished() {
        let snap = acc.snapshot();
        assert!(
            snap.location.top_speed >= snap.location.top_speed_batch,
            "torn read: batch max {} exceeds lifetime max {}",
            snap.location.top_speed_batch,
            snap.location.top_speed
        );
    }
    writer.join().unwrap();

    let snap = acc.snapshot();
    assert_eq!(snap.location.top_speed, 96.0);
    assert_eq!(snap.location.num_locations, 4_000);
}
