//! Durable append-only storage for the raw sample streams.
//!
//! The store holds three relations (`locations`, `motion`, `battery`),
//! each row scoped by a device identifier and a floating-point epoch
//! timestamp. Inserts only, with no updates, deletes, or indices. The
//! `duckdb` backend is the only implementation; the trait keeps the
//! pipeline and tests independent of the concrete engine.

pub mod duckdb;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::samples::{BatterySample, LocationSample, MotionSample};

/// Append-only storage backend for sensor samples.
///
/// Appends from different categories may be issued interleaved; there
/// is no cross-stream ordering requirement. Each append is a single
/// durable write with exactly-once semantics relative to the call: a
/// failure is reported to the caller and never retried internally.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Stable, discoverable path of the store file (exportable as an
    /// opaque blob).
    fn path(&self) -> &Path;

    /// Device identity every row is scoped by.
    fn device_id(&self) -> &str;

    async fn append_location(&self, sample: &LocationSample) -> Result<()>;
    async fn append_motion(&self, sample: &MotionSample) -> Result<()>;
    async fn append_battery(&self, sample: &BatterySample) -> Result<()>;

    /// Read back location samples at or after the given timestamp, in
    /// append order.
    async fn locations_since(&self, epoch_seconds: f64) -> Result<Vec<LocationSample>>;
    async fn motion_since(&self, epoch_seconds: f64) -> Result<Vec<MotionSample>>;
    async fn battery_since(&self, epoch_seconds: f64) -> Result<Vec<BatterySample>>;

    async fn location_count(&self) -> Result<u64>;
    async fn motion_count(&self) -> Result<u64>;
    async fn battery_count(&self) -> Result<u64>;
}
