//! Core library for continuous telemetry logging.
//!
//! This crate provides the core functionality for:
//! - Durable append-only storage of raw sensor samples
//! - Running statistics over location, motion, and power streams
//! - Periodic metric rollups published to downstream consumers
//! - A typed event bus decoupling producers from consumers

pub mod config;
pub mod error;
pub mod events;
pub mod metrics;
pub mod pipeline;
pub mod samples;
pub mod storage;

pub use config::TelemetryConfig;
pub use error::{Error, Result};
pub use events::{SampleEvent, StatsEvent, TelemetryBus};
pub use metrics::accumulator::StatAccumulator;
pub use metrics::scheduler::ReportScheduler;
pub use metrics::{DeviceStats, LocationStats, MetricsSnapshot};
pub use pipeline::TelemetryPipeline;
pub use samples::{BatterySample, LocationSample, MotionSample};
pub use storage::duckdb::DuckDbBackend;
pub use storage::StorageBackend;
