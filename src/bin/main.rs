//! Telemetry logger binary.
//!
//! Opens the durable store, starts the rollup scheduler, and feeds the
//! pipeline either from a JSON-lines replay file or from a built-in
//! synthetic drive generator. Each published rollup is rendered to the
//! log the way the on-device speech prompt reads it out.

use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use blackbox_core::{
    config::Args, BatterySample, LocationSample, MotionSample, TelemetryConfig, TelemetryPipeline,
};

const METERS_PER_SECOND_TO_MPH: f64 = 2.23694;

/// One line of a replay file.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ReplayRecord {
    Locations {
        samples: Vec<LocationSample>,
    },
    Motion {
        #[serde(flatten)]
        sample: MotionSample,
    },
    Battery {
        #[serde(flatten)]
        sample: BatterySample,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .parse_lossy(args.log_filter.as_deref().unwrap_or("blackbox_core=debug")),
        )
        .with_target(true)
        .init();

    let config = TelemetryConfig::load(&args)?;
    info!(
        store = %config.storage.path.display(),
        device = %config.storage.device_id,
        "telemetry logger starting"
    );

    let pipeline = TelemetryPipeline::new(&config)?;

    // Rollup consumer: the display/speech stand-in.
    let mut metrics_rx = pipeline.bus().subscribe_metrics();
    let reporter = tokio::spawn(async move {
        while let Ok(snapshot) = metrics_rx.recv().await {
            let max_mph = snapshot.location.top_speed * METERS_PER_SECOND_TO_MPH;
            let recent_mph = snapshot.location.top_speed_batch * METERS_PER_SECOND_TO_MPH;
            if snapshot.device.battery_level >= 0.0 {
                info!(
                    "max speed {:.2}. recent speed {:.2}. battery {:.0} percent",
                    max_mph,
                    recent_mph,
                    snapshot.device.battery_level * 100.0
                );
            } else {
                info!(
                    "max speed {:.2}. recent speed {:.2}. battery unknown",
                    max_mph, recent_mph
                );
            }
        }
    });

    pipeline.start_reporting();

    let mut source = {
        let pipeline = pipeline.clone();
        let replay = args.replay.clone();
        let duration_secs = args.duration_secs;
        tokio::spawn(async move {
            let result = match replay {
                Some(path) => replay_file(&pipeline, &path).await,
                None => simulate_drive(&pipeline, duration_secs).await,
            };
            if let Err(e) = result {
                warn!(error = %e, "sample source stopped");
            }
        })
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
        }
        _ = &mut source => {
            info!("sample source finished, shutting down");
        }
    }

    source.abort();
    pipeline.shutdown().await;
    reporter.abort();
    Ok(())
}

/// Feed the pipeline from a JSON-lines replay file, one record per line.
async fn replay_file(
    pipeline: &Arc<TelemetryPipeline>,
    path: &std::path::Path,
) -> anyhow::Result<()> {
    let file = tokio::fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ReplayRecord>(&line) {
            Ok(ReplayRecord::Locations { samples }) => pipeline.deliver_locations(Ok(samples)),
            Ok(ReplayRecord::Motion { sample }) => pipeline.deliver_motion(Ok(sample)),
            Ok(ReplayRecord::Battery { sample }) => pipeline.deliver_battery(Ok(sample)),
            Err(e) => warn!(error = %e, "skipping malformed replay line"),
        }
    }

    info!("replay finished");
    Ok(())
}

/// Generate a deterministic synthetic drive: motion at 50Hz, one
/// location batch per second, a battery reading every ten seconds.
async fn simulate_drive(
    pipeline: &Arc<TelemetryPipeline>,
    duration_secs: u64,
) -> anyhow::Result<()> {
    use std::time::Duration;

    info!(duration_secs, "starting synthetic drive");
    let mut ticker = tokio::time::interval(Duration::from_millis(20));
    let ticks = duration_secs * 50;

    for tick in 0..ticks {
        ticker.tick().await;
        let t = tick as f64 / 50.0;
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;

        pipeline.deliver_motion(Ok(MotionSample {
            accel_x: 0.08 * (t * 1.3).sin(),
            accel_y: 0.05 * (t * 0.7).cos(),
            accel_z: 0.02 * (t * 2.1).sin(),
            epoch_seconds: now,
        }));

        if tick % 50 == 0 {
            let speed = 12.0 + 8.0 * (t * 0.2).sin();
            pipeline.deliver_locations(Ok(vec![LocationSample {
                latitude: 47.6 + t * 1e-4,
                longitude: -122.3 + t * 1e-4,
                heading: 90.0,
                speed: speed.max(0.0),
                altitude: 56.0,
                epoch_seconds: now,
            }]));
        }

        if tick % 500 == 0 {
            pipeline.deliver_battery(Ok(BatterySample {
                charge: (1.0 - t / 36_000.0).clamp(0.0, 1.0),
                unplugged: true,
                epoch_seconds: now,
            }));
        }
    }

    info!("synthetic drive finished");
    Ok(())
}
